use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use catalog_core::{CategoryId, Entity, ProductId};
use catalog_products::{
    Category, CategoryStore, Product, ProductCategoryLink, ProductImage, SearchQuery, StoreError,
    StoreResult,
};

use super::query::ProductFilter;
use super::r#trait::CatalogStore;

/// Rows keyed by entity id, remembering insertion order.
#[derive(Debug)]
struct Table<E: Entity> {
    rows: HashMap<E::Id, E>,
    order: Vec<E::Id>,
}

impl<E: Entity> Default for Table<E> {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<E: Entity> Table<E> {
    fn insert(&mut self, row: E) -> Result<(), StoreError> {
        let id = *row.id();
        if self.rows.contains_key(&id) {
            return Err(StoreError::Conflict(format!("duplicate primary key {id:?}")));
        }
        self.order.push(id);
        self.rows.insert(id, row);
        Ok(())
    }

    fn get(&self, id: &E::Id) -> Option<&E> {
        self.rows.get(id)
    }

    fn get_mut(&mut self, id: &E::Id) -> Option<&mut E> {
        self.rows.get_mut(id)
    }

    fn remove(&mut self, id: &E::Id) -> Option<E> {
        let row = self.rows.remove(id)?;
        self.order.retain(|other| other != id);
        Some(row)
    }

    fn retain(&mut self, mut keep: impl FnMut(&E) -> bool) -> usize {
        let before = self.rows.len();
        self.rows.retain(|_, row| keep(row));
        let rows = &self.rows;
        self.order.retain(|id| rows.contains_key(id));
        before - self.rows.len()
    }

    /// Rows in insertion order.
    fn iter(&self) -> impl Iterator<Item = &E> {
        self.order.iter().filter_map(|id| self.rows.get(id))
    }

    fn clear(&mut self) {
        self.rows.clear();
        self.order.clear();
    }
}

#[derive(Debug, Default)]
struct Tables {
    products: Table<Product>,
    categories: Table<Category>,
    images: Table<ProductImage>,
    /// Join rows in link order. Unique per (product, category).
    links: Vec<ProductCategoryLink>,
}

/// In-memory catalog store.
///
/// Intended for tests/dev. Each call takes the table lock once, so single
/// operations are atomic but sequences of calls are not.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    tables: RwLock<Tables>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

fn take_limit<T>(rows: impl Iterator<Item = T>, limit: Option<usize>) -> Vec<T> {
    match limit {
        Some(limit) => rows.take(limit).collect(),
        None => rows.collect(),
    }
}

fn sorted_by_name(mut categories: Vec<Category>) -> Vec<Category> {
    categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    categories
}

#[async_trait]
impl CategoryStore for InMemoryCatalogStore {
    async fn find_category(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        Ok(self.read()?.categories.get(&id).cloned())
    }

    async fn insert_category(&self, category: Category) -> StoreResult<()> {
        let mut tables = self.write()?;
        if let Some(origin) = category.product_id {
            if tables.products.get(&origin).is_none() {
                return Err(StoreError::Conflict(format!(
                    "category origin product {origin} does not exist"
                )));
            }
        }
        tables.categories.insert(category)
    }

    async fn link_category(&self, link: ProductCategoryLink) -> StoreResult<bool> {
        let mut tables = self.write()?;
        if tables.products.get(&link.product_id).is_none() {
            return Err(StoreError::Conflict(format!(
                "product {} does not exist",
                link.product_id
            )));
        }
        if tables.categories.get(&link.category_id).is_none() {
            return Err(StoreError::Conflict(format!(
                "category {} does not exist",
                link.category_id
            )));
        }
        if tables.links.contains(&link) {
            return Ok(false);
        }
        tables.links.push(link);
        Ok(true)
    }

    async fn unlink_category(&self, link: ProductCategoryLink) -> StoreResult<bool> {
        let mut tables = self.write()?;
        let before = tables.links.len();
        tables.links.retain(|l| *l != link);
        Ok(tables.links.len() != before)
    }

    async fn linked_category_ids(&self, product_id: ProductId) -> StoreResult<Vec<CategoryId>> {
        Ok(self
            .read()?
            .links
            .iter()
            .filter(|l| l.product_id == product_id)
            .map(|l| l.category_id)
            .collect())
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn insert_product(&self, product: Product) -> StoreResult<()> {
        self.write()?.products.insert(product)
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    async fn update_product(&self, product: &Product) -> StoreResult<()> {
        let mut tables = self.write()?;
        match tables.products.get_mut(&product.id) {
            Some(row) => {
                *row = product.clone();
                Ok(())
            }
            None => Err(StoreError::Backend(format!(
                "update of missing product {}",
                product.id
            ))),
        }
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<bool> {
        let mut tables = self.write()?;
        if tables.products.remove(&id).is_none() {
            return Ok(false);
        }
        tables.links.retain(|l| l.product_id != id);
        tables.images.retain(|img| img.product_id != id);
        for category in tables.categories.rows.values_mut() {
            if category.product_id == Some(id) {
                category.product_id = None;
            }
        }
        Ok(true)
    }

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        Ok(self
            .read()?
            .products
            .iter()
            .filter(|p| filter.matches(p.id, p.seller_id))
            .cloned()
            .collect())
    }

    async fn search_products(&self, query: &SearchQuery) -> StoreResult<Vec<Product>> {
        let tables = self.read()?;
        let hits = tables
            .products
            .iter()
            .filter(|p| query.matches(&p.name) || query.matches(&p.description))
            .cloned();
        Ok(take_limit(hits, query.limit))
    }

    async fn decrement_stock(&self, ids: &[ProductId]) -> StoreResult<Vec<ProductId>> {
        let mut tables = self.write()?;
        let now = Utc::now();
        let mut seen = HashSet::with_capacity(ids.len());
        let mut decremented = Vec::new();

        for id in ids {
            if !seen.insert(*id) {
                continue;
            }
            if let Some(product) = tables.products.get_mut(id) {
                if product.in_stock() {
                    product.quantity -= 1;
                    product.updated_at = now;
                    decremented.push(*id);
                }
            }
        }

        Ok(decremented)
    }

    async fn list_categories(&self, limit: Option<usize>) -> StoreResult<Vec<Category>> {
        let all = self.read()?.categories.iter().cloned().collect();
        Ok(take_limit(sorted_by_name(all).into_iter(), limit))
    }

    async fn search_categories(&self, query: &SearchQuery) -> StoreResult<Vec<Category>> {
        let hits = self
            .read()?
            .categories
            .iter()
            .filter(|c| query.matches(&c.name))
            .cloned()
            .collect();
        Ok(take_limit(sorted_by_name(hits).into_iter(), query.limit))
    }

    async fn rename_category(&self, id: CategoryId, name: &str) -> StoreResult<Option<Category>> {
        let mut tables = self.write()?;
        Ok(tables.categories.get_mut(&id).map(|category| {
            category.name = name.to_string();
            category.clone()
        }))
    }

    async fn delete_category(&self, id: CategoryId) -> StoreResult<bool> {
        let mut tables = self.write()?;
        if tables.categories.remove(&id).is_none() {
            return Ok(false);
        }
        tables.links.retain(|l| l.category_id != id);
        Ok(true)
    }

    async fn categories_for(&self, product_ids: &[ProductId]) -> StoreResult<Vec<(ProductId, Category)>> {
        let tables = self.read()?;
        Ok(tables
            .links
            .iter()
            .filter(|l| product_ids.contains(&l.product_id))
            .filter_map(|l| {
                tables
                    .categories
                    .get(&l.category_id)
                    .map(|c| (l.product_id, c.clone()))
            })
            .collect())
    }

    async fn product_ids_in_categories(&self, ids: &[CategoryId]) -> StoreResult<Vec<ProductId>> {
        let tables = self.read()?;
        let wanted: HashSet<ProductId> = tables
            .links
            .iter()
            .filter(|l| ids.contains(&l.category_id))
            .map(|l| l.product_id)
            .collect();
        Ok(tables
            .products
            .iter()
            .map(|p| p.id)
            .filter(|id| wanted.contains(id))
            .collect())
    }

    async fn insert_images(&self, images: Vec<ProductImage>) -> StoreResult<()> {
        let mut tables = self.write()?;
        for image in images {
            if tables.products.get(&image.product_id).is_none() {
                return Err(StoreError::Conflict(format!(
                    "image owner {} does not exist",
                    image.product_id
                )));
            }
            tables.images.insert(image)?;
        }
        Ok(())
    }

    async fn images_for(&self, product_ids: &[ProductId]) -> StoreResult<Vec<ProductImage>> {
        let mut images: Vec<ProductImage> = self
            .read()?
            .images
            .iter()
            .filter(|img| product_ids.contains(&img.product_id))
            .cloned()
            .collect();
        images.sort_by_key(|img| img.position);
        Ok(images)
    }

    async fn delete_images(&self, product_id: ProductId) -> StoreResult<usize> {
        Ok(self.write()?.images.retain(|img| img.product_id != product_id))
    }

    async fn clear(&self) -> StoreResult<()> {
        let mut tables = self.write()?;
        tables.products.clear();
        tables.categories.clear();
        tables.images.clear();
        tables.links.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use catalog_core::SellerId;
    use catalog_products::{CategoryReference, CategoryResolver, NewProduct};

    use super::*;

    fn product(name: &str, quantity: u32) -> Product {
        NewProduct {
            seller_id: SellerId::new(),
            name: name.to_string(),
            description: format!("{name} description"),
            price: Decimal::new(1000, 2),
            quantity,
        }
        .into_product(Utc::now())
        .unwrap()
    }

    async fn store_with(products: &[&Product]) -> InMemoryCatalogStore {
        let store = InMemoryCatalogStore::new();
        for p in products {
            store.insert_product((*p).clone()).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn link_is_unique_per_pair() {
        let p = product("Lamp", 1);
        let store = store_with(&[&p]).await;
        let category = Category::new("Lighting", None);
        store.insert_category(category.clone()).await.unwrap();
        let link = ProductCategoryLink::new(p.id, category.id);

        assert!(store.link_category(link).await.unwrap());
        assert!(!store.link_category(link).await.unwrap());
        assert_eq!(store.linked_category_ids(p.id).await.unwrap(), vec![category.id]);
    }

    #[tokio::test]
    async fn link_to_unknown_category_is_a_conflict() {
        let p = product("Lamp", 1);
        let store = store_with(&[&p]).await;

        let err = store
            .link_category(ProductCategoryLink::new(p.id, CategoryId::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn resolver_attach_deduplicates_through_store() {
        let p = product("Lamp", 1);
        let store = store_with(&[&p]).await;
        let category = Category::new("Lighting", None);
        store.insert_category(category.clone()).await.unwrap();

        let refs = vec![
            CategoryReference::from(category.id),
            CategoryReference::from(category.id),
        ];
        CategoryResolver::new(&store)
            .attach_on_create(p.id, &refs)
            .await
            .unwrap();

        assert_eq!(store.linked_category_ids(p.id).await.unwrap(), vec![category.id]);
    }

    #[tokio::test]
    async fn deleting_product_cascades_links_and_images() {
        let p = product("Lamp", 1);
        let store = store_with(&[&p]).await;
        let category = Category::new("Lighting", Some(p.id));
        store.insert_category(category.clone()).await.unwrap();
        store
            .link_category(ProductCategoryLink::new(p.id, category.id))
            .await
            .unwrap();
        store
            .insert_images(vec![ProductImage {
                id: catalog_core::ImageId::new(),
                product_id: p.id,
                url: "/storage/x/image_0.png".to_string(),
                is_thumbnail: true,
                position: 0,
            }])
            .await
            .unwrap();

        assert!(store.delete_product(p.id).await.unwrap());
        assert!(!store.delete_product(p.id).await.unwrap());
        assert!(store.linked_category_ids(p.id).await.unwrap().is_empty());
        assert!(store.images_for(&[p.id]).await.unwrap().is_empty());

        let orphan = store.find_category(category.id).await.unwrap().unwrap();
        assert_eq!(orphan.product_id, None);
    }

    #[tokio::test]
    async fn decrement_stock_never_goes_negative() {
        let stocked = product("Lamp", 1);
        let empty = product("Chair", 0);
        let store = store_with(&[&stocked, &empty]).await;

        let sold = store
            .decrement_stock(&[stocked.id, stocked.id, empty.id])
            .await
            .unwrap();
        assert_eq!(sold, vec![stocked.id]);
        assert_eq!(store.get_product(stocked.id).await.unwrap().unwrap().quantity, 0);
        assert_eq!(store.get_product(empty.id).await.unwrap().unwrap().quantity, 0);

        assert!(store.decrement_stock(&[stocked.id]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_filters_keep_creation_order() {
        let a = product("A", 1);
        let mut b = product("B", 1);
        b.seller_id = a.seller_id;
        let c = product("C", 1);
        let store = store_with(&[&a, &b, &c]).await;

        let all = store.list_products(&ProductFilter::All).await.unwrap();
        assert_eq!(all.iter().map(|p| p.id).collect::<Vec<_>>(), vec![a.id, b.id, c.id]);

        let by_ids = store
            .list_products(&ProductFilter::Ids(vec![c.id, a.id, ProductId::new()]))
            .await
            .unwrap();
        assert_eq!(by_ids.iter().map(|p| p.id).collect::<Vec<_>>(), vec![a.id, c.id]);

        let by_seller = store
            .list_products(&ProductFilter::Seller(a.seller_id))
            .await
            .unwrap();
        assert_eq!(by_seller.len(), 2);
    }

    #[tokio::test]
    async fn search_applies_limit_per_kind() {
        let store = store_with(&[&product("Desk lamp", 1), &product("Floor lamp", 1)]).await;
        store.insert_category(Category::new("Lamps", None)).await.unwrap();
        store.insert_category(Category::new("Chairs", None)).await.unwrap();

        let mut query = SearchQuery::new("LAMP");
        query.limit = Some(1);

        assert_eq!(store.search_products(&query).await.unwrap().len(), 1);
        let categories = store.search_categories(&query).await.unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name, "Lamps");
    }

    #[tokio::test]
    async fn clear_empties_every_table() {
        let p = product("Lamp", 1);
        let store = store_with(&[&p]).await;
        store.insert_category(Category::new("Lighting", None)).await.unwrap();

        store.clear().await.unwrap();

        assert!(store.list_products(&ProductFilter::All).await.unwrap().is_empty());
        assert!(store.list_categories(None).await.unwrap().is_empty());
    }
}
