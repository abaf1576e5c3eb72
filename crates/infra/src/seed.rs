//! Fixed demo catalog loaded by `reset`.
//!
//! Identifiers are constant so clients can rely on them after a reset.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use catalog_core::{CategoryId, ImageId, ProductId, SellerId};
use catalog_products::{Category, Product, ProductCategoryLink, ProductImage, StoreResult};

use crate::store::CatalogStore;

const SELLERS: [u128; 2] = [
    0x0190_0000_0000_7000_8000_0000_0000_0001,
    0x0190_0000_0000_7000_8000_0000_0000_0002,
];

/// (seller index, name, description, price in cents, quantity)
const PRODUCTS: [(usize, &str, &str, i64, u32); 5] = [
    (0, "Desk Lamp", "Adjustable LED desk lamp with warm light", 3499, 12),
    (0, "Office Chair", "Ergonomic chair with lumbar support", 18900, 4),
    (1, "Coffee Grinder", "Burr grinder with 18 grind settings", 7450, 0),
    (1, "French Press", "Glass french press, 1 litre", 2999, 25),
    (1, "Floor Lamp", "Arc floor lamp with marble base", 12900, 2),
];

/// (name, index of the product that introduced it)
const CATEGORIES: [(&str, usize); 4] = [
    ("Lighting", 0),
    ("Furniture", 1),
    ("Kitchen", 2),
    ("Home Office", 0),
];

/// (product index, category index)
const LINKS: [(usize, usize); 7] = [(0, 0), (0, 3), (1, 1), (1, 3), (2, 2), (3, 2), (4, 0)];

fn seeded_uuid(kind: u16, n: usize) -> Uuid {
    Uuid::from_u128(0x0190_0000_0000_7000_8000_0000_0000_0000 | (u128::from(kind) << 32) | n as u128)
}

pub fn seller_ids() -> Vec<SellerId> {
    SELLERS
        .iter()
        .map(|raw| SellerId::from_uuid(Uuid::from_u128(*raw)))
        .collect()
}

pub fn product_ids() -> Vec<ProductId> {
    (0..PRODUCTS.len())
        .map(|n| ProductId::from_uuid(seeded_uuid(1, n)))
        .collect()
}

pub fn category_ids() -> Vec<CategoryId> {
    (0..CATEGORIES.len())
        .map(|n| CategoryId::from_uuid(seeded_uuid(2, n)))
        .collect()
}

/// Insert the seed rows. The store is expected to be empty.
pub async fn load(store: &dyn CatalogStore, now: DateTime<Utc>) -> StoreResult<()> {
    let sellers = seller_ids();
    let products = product_ids();
    let categories = category_ids();

    for (n, (seller, name, description, cents, quantity)) in PRODUCTS.iter().enumerate() {
        store
            .insert_product(Product {
                id: products[n],
                seller_id: sellers[*seller],
                name: name.to_string(),
                description: description.to_string(),
                price: Decimal::new(*cents, 2),
                quantity: *quantity,
                created_at: now,
                updated_at: now,
            })
            .await?;
    }

    let images = products
        .iter()
        .enumerate()
        .map(|(n, product_id)| ProductImage {
            id: ImageId::from_uuid(seeded_uuid(3, n)),
            product_id: *product_id,
            url: format!("https://picsum.photos/seed/catalog-{n}/640/480"),
            is_thumbnail: true,
            position: 0,
        })
        .collect();
    store.insert_images(images).await?;

    for (n, (name, origin)) in CATEGORIES.iter().enumerate() {
        store
            .insert_category(Category {
                id: categories[n],
                name: name.to_string(),
                product_id: Some(products[*origin]),
            })
            .await?;
    }

    for (product, category) in LINKS {
        store
            .link_category(ProductCategoryLink::new(products[product], categories[category]))
            .await?;
    }

    tracing::debug!(
        products = PRODUCTS.len(),
        categories = CATEGORIES.len(),
        "seed catalog loaded"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use catalog_products::CategoryStore;

    use super::*;
    use crate::store::{InMemoryCatalogStore, ProductFilter};

    #[test]
    fn seeded_ids_are_distinct() {
        let mut all: Vec<Uuid> = product_ids().into_iter().map(Uuid::from).collect();
        all.extend(category_ids().into_iter().map(Uuid::from));
        all.extend(seller_ids().into_iter().map(Uuid::from));
        let count = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), count);
    }

    #[tokio::test]
    async fn load_fills_an_empty_store() {
        let store = InMemoryCatalogStore::new();
        load(&store, Utc::now()).await.unwrap();

        let products = store.list_products(&ProductFilter::All).await.unwrap();
        assert_eq!(products.len(), PRODUCTS.len());
        assert_eq!(products[0].id, product_ids()[0]);
        assert_eq!(store.list_categories(None).await.unwrap().len(), CATEGORIES.len());
        assert_eq!(
            store.linked_category_ids(product_ids()[0]).await.unwrap(),
            vec![category_ids()[0], category_ids()[3]]
        );
    }
}
