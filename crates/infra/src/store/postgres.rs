//! Postgres-backed catalog store.
//!
//! Schema lives in `migrations/0001_catalog.sql` and is applied by
//! [`PostgresCatalogStore::migrate`]. Link uniqueness and the cascades on
//! product/category deletion are enforced by the schema itself.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `Conflict` |
//! | Database (check constraint violation) | `23514` | `Conflict` |
//! | PoolClosed / PoolTimedOut / Io | N/A | `Unavailable` |
//! | anything else | Any other | `Backend` |

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use catalog_core::{CategoryId, ImageId, ProductId, SellerId};
use catalog_products::{
    Category, CategoryStore, Product, ProductCategoryLink, ProductImage, SearchQuery, StoreError,
    StoreResult,
};

use super::query::ProductFilter;
use super::r#trait::CatalogStore;

const SCHEMA: &str = include_str!("../../migrations/0001_catalog.sql");

const PRODUCT_COLUMNS: &str =
    "id, seller_id, name, description, price, quantity, created_at, updated_at";

/// Postgres-backed catalog store.
///
/// Every method is a single statement (or a single transaction for image
/// batches); nothing spans calls.
#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: Arc<PgPool>,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a connection pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn fetch_products(&self, sql: &str, operation: &str) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query(sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        rows_to_products(&rows)
    }
}

#[async_trait]
impl CategoryStore for PostgresCatalogStore {
    async fn find_category(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        let row = sqlx::query("SELECT id, name, product_id FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_category", e))?;

        row.map(|r| CategoryRow::from_row(&r).map(Category::from))
            .transpose()
            .map_err(|e| map_sqlx_error("find_category", e))
    }

    async fn insert_category(&self, category: Category) -> StoreResult<()> {
        sqlx::query("INSERT INTO categories (id, name, product_id) VALUES ($1, $2, $3)")
            .bind(category.id.as_uuid())
            .bind(&category.name)
            .bind(category.product_id.map(Uuid::from))
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_category", e))?;
        Ok(())
    }

    async fn link_category(&self, link: ProductCategoryLink) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO product_category (product_id, category_id)
            VALUES ($1, $2)
            ON CONFLICT (product_id, category_id) DO NOTHING
            "#,
        )
        .bind(link.product_id.as_uuid())
        .bind(link.category_id.as_uuid())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("link_category", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn unlink_category(&self, link: ProductCategoryLink) -> StoreResult<bool> {
        let result =
            sqlx::query("DELETE FROM product_category WHERE product_id = $1 AND category_id = $2")
                .bind(link.product_id.as_uuid())
                .bind(link.category_id.as_uuid())
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("unlink_category", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn linked_category_ids(&self, product_id: ProductId) -> StoreResult<Vec<CategoryId>> {
        let rows = sqlx::query(
            "SELECT category_id FROM product_category WHERE product_id = $1 ORDER BY link_seq",
        )
        .bind(product_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("linked_category_ids", e))?;

        rows.iter()
            .map(|r| r.try_get::<Uuid, _>("category_id").map(CategoryId::from_uuid))
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error("linked_category_ids", e))
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    #[instrument(skip_all, fields(product_id = %product.id), err)]
    async fn insert_product(&self, product: Product) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (
                id, seller_id, name, description, price, quantity, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(product.seller_id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(i64::from(product.quantity))
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;

        match row {
            Some(row) => Ok(Some(row_to_product(&row)?)),
            None => Ok(None),
        }
    }

    async fn update_product(&self, product: &Product) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = $2, description = $3, price = $4, quantity = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(i64::from(product.quantity))
        .bind(product.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Backend(format!(
                "update of missing product {}",
                product.id
            )));
        }
        Ok(())
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        let order = "ORDER BY created_at, id";
        match filter {
            ProductFilter::All => {
                self.fetch_products(
                    &format!("SELECT {PRODUCT_COLUMNS} FROM products {order}"),
                    "list_products",
                )
                .await
            }
            ProductFilter::Ids(ids) => {
                let ids: Vec<Uuid> = ids.iter().copied().map(Uuid::from).collect();
                let rows = sqlx::query(&format!(
                    "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1) {order}"
                ))
                .bind(&ids)
                .fetch_all(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("list_products_by_ids", e))?;
                rows_to_products(&rows)
            }
            ProductFilter::Seller(seller_id) => {
                let rows = sqlx::query(&format!(
                    "SELECT {PRODUCT_COLUMNS} FROM products WHERE seller_id = $1 {order}"
                ))
                .bind(seller_id.as_uuid())
                .fetch_all(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("list_products_by_seller", e))?;
                rows_to_products(&rows)
            }
        }
    }

    async fn search_products(&self, query: &SearchQuery) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products
            WHERE name ILIKE $1 OR description ILIKE $1
            ORDER BY created_at, id
            LIMIT $2
            "#
        ))
        .bind(like_pattern(&query.term))
        .bind(sql_limit(query.limit))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("search_products", e))?;
        rows_to_products(&rows)
    }

    #[instrument(skip_all, fields(requested = ids.len()), err)]
    async fn decrement_stock(&self, ids: &[ProductId]) -> StoreResult<Vec<ProductId>> {
        let uuids: Vec<Uuid> = ids.iter().copied().map(Uuid::from).collect();
        let rows = sqlx::query(
            r#"
            UPDATE products
            SET quantity = quantity - 1, updated_at = $2
            WHERE id = ANY($1) AND quantity > 0
            RETURNING id
            "#,
        )
        .bind(&uuids)
        .bind(Utc::now())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("decrement_stock", e))?;

        let updated: HashSet<ProductId> = rows
            .iter()
            .map(|r| r.try_get::<Uuid, _>("id").map(ProductId::from_uuid))
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error("decrement_stock", e))?;

        // Report in request order, once per product.
        let mut seen = HashSet::with_capacity(updated.len());
        Ok(ids
            .iter()
            .copied()
            .filter(|id| updated.contains(id) && seen.insert(*id))
            .collect())
    }

    async fn list_categories(&self, limit: Option<usize>) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query("SELECT id, name, product_id FROM categories ORDER BY name, id LIMIT $1")
            .bind(sql_limit(limit))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_categories", e))?;
        rows_to_categories(&rows, "list_categories")
    }

    async fn search_categories(&self, query: &SearchQuery) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, product_id FROM categories
            WHERE name ILIKE $1
            ORDER BY name, id
            LIMIT $2
            "#,
        )
        .bind(like_pattern(&query.term))
        .bind(sql_limit(query.limit))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("search_categories", e))?;
        rows_to_categories(&rows, "search_categories")
    }

    async fn rename_category(&self, id: CategoryId, name: &str) -> StoreResult<Option<Category>> {
        let row = sqlx::query(
            "UPDATE categories SET name = $2 WHERE id = $1 RETURNING id, name, product_id",
        )
        .bind(id.as_uuid())
        .bind(name)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("rename_category", e))?;

        row.map(|r| CategoryRow::from_row(&r).map(Category::from))
            .transpose()
            .map_err(|e| map_sqlx_error("rename_category", e))
    }

    async fn delete_category(&self, id: CategoryId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn categories_for(&self, product_ids: &[ProductId]) -> StoreResult<Vec<(ProductId, Category)>> {
        let uuids: Vec<Uuid> = product_ids.iter().copied().map(Uuid::from).collect();
        let rows = sqlx::query(
            r#"
            SELECT pc.product_id AS linked_product_id, c.id, c.name, c.product_id
            FROM product_category pc
            JOIN categories c ON c.id = pc.category_id
            WHERE pc.product_id = ANY($1)
            ORDER BY pc.link_seq
            "#,
        )
        .bind(&uuids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("categories_for", e))?;

        rows.iter()
            .map(|r| {
                let linked: Uuid = r.try_get("linked_product_id")?;
                let category = CategoryRow::from_row(r)?;
                Ok((ProductId::from_uuid(linked), Category::from(category)))
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(|e| map_sqlx_error("categories_for", e))
    }

    async fn product_ids_in_categories(&self, ids: &[CategoryId]) -> StoreResult<Vec<ProductId>> {
        let uuids: Vec<Uuid> = ids.iter().copied().map(Uuid::from).collect();
        let rows = sqlx::query(
            r#"
            SELECT p.id FROM products p
            WHERE EXISTS (
                SELECT 1 FROM product_category pc
                WHERE pc.product_id = p.id AND pc.category_id = ANY($1)
            )
            ORDER BY p.created_at, p.id
            "#,
        )
        .bind(&uuids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("product_ids_in_categories", e))?;

        rows.iter()
            .map(|r| r.try_get::<Uuid, _>("id").map(ProductId::from_uuid))
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error("product_ids_in_categories", e))
    }

    async fn insert_images(&self, images: Vec<ProductImage>) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("insert_images", e))?;

        for image in &images {
            sqlx::query(
                r#"
                INSERT INTO product_images (id, product_id, url, is_thumbnail, position)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(image.id.as_uuid())
            .bind(image.product_id.as_uuid())
            .bind(&image.url)
            .bind(image.is_thumbnail)
            .bind(image.position as i32)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_images", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("insert_images", e))
    }

    async fn images_for(&self, product_ids: &[ProductId]) -> StoreResult<Vec<ProductImage>> {
        let uuids: Vec<Uuid> = product_ids.iter().copied().map(Uuid::from).collect();
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, url, is_thumbnail, position
            FROM product_images
            WHERE product_id = ANY($1)
            ORDER BY position, id
            "#,
        )
        .bind(&uuids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("images_for", e))?;

        rows.iter()
            .map(|r| ImageRow::from_row(r).map(ProductImage::from))
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error("images_for", e))
    }

    async fn delete_images(&self, product_id: ProductId) -> StoreResult<usize> {
        let result = sqlx::query("DELETE FROM product_images WHERE product_id = $1")
            .bind(product_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_images", e))?;
        Ok(result.rows_affected() as usize)
    }

    #[instrument(skip_all, err)]
    async fn clear(&self) -> StoreResult<()> {
        sqlx::query("TRUNCATE product_category, product_images, categories, products")
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("clear", e))?;
        Ok(())
    }
}

/// `LIMIT` bind value. Limits beyond `i64::MAX` mean no practical limit.
fn sql_limit(limit: Option<usize>) -> Option<i64> {
    limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX))
}

/// Escape LIKE metacharacters and wrap the term for a substring match.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.trim().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

struct ProductRow {
    id: Uuid,
    seller_id: Uuid,
    name: String,
    description: String,
    price: Decimal,
    quantity: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            seller_id: row.try_get("seller_id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            quantity: row.try_get("quantity")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            StoreError::Backend(format!("product {} has invalid quantity {}", row.id, row.quantity))
        })?;
        Ok(Product {
            id: ProductId::from_uuid(row.id),
            seller_id: SellerId::from_uuid(row.seller_id),
            name: row.name,
            description: row.description,
            price: row.price,
            quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

struct CategoryRow {
    id: Uuid,
    name: String,
    product_id: Option<Uuid>,
}

impl<'r> FromRow<'r, PgRow> for CategoryRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CategoryRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            product_id: row.try_get("product_id")?,
        })
    }
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: CategoryId::from_uuid(row.id),
            name: row.name,
            product_id: row.product_id.map(ProductId::from_uuid),
        }
    }
}

struct ImageRow {
    id: Uuid,
    product_id: Uuid,
    url: String,
    is_thumbnail: bool,
    position: i32,
}

impl<'r> FromRow<'r, PgRow> for ImageRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ImageRow {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            url: row.try_get("url")?,
            is_thumbnail: row.try_get("is_thumbnail")?,
            position: row.try_get("position")?,
        })
    }
}

impl From<ImageRow> for ProductImage {
    fn from(row: ImageRow) -> Self {
        ProductImage {
            id: ImageId::from_uuid(row.id),
            product_id: ProductId::from_uuid(row.product_id),
            url: row.url,
            is_thumbnail: row.is_thumbnail,
            position: row.position.max(0) as u32,
        }
    }
}

fn row_to_product(row: &PgRow) -> StoreResult<Product> {
    let parsed = ProductRow::from_row(row).map_err(|e| map_sqlx_error("decode_product", e))?;
    Product::try_from(parsed)
}

fn rows_to_products(rows: &[PgRow]) -> StoreResult<Vec<Product>> {
    rows.iter().map(row_to_product).collect()
}

fn rows_to_categories(rows: &[PgRow], operation: &str) -> StoreResult<Vec<Category>> {
    rows.iter()
        .map(|r| CategoryRow::from_row(r).map(Category::from))
        .collect::<Result<_, _>>()
        .map_err(|e| map_sqlx_error(operation, e))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23503") | Some("23514") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool unavailable in {}", operation))
        }
        sqlx::Error::Io(e) => StoreError::Unavailable(format!("io error in {}: {}", operation, e)),
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern(" lamp "), "%lamp%");
    }

    #[test]
    fn sql_limit_saturates_instead_of_wrapping() {
        assert_eq!(sql_limit(None), None);
        assert_eq!(sql_limit(Some(5)), Some(5));
        assert_eq!(sql_limit(Some(usize::MAX)), Some(i64::MAX));
    }

    /// Runs only when `DATABASE_URL` points at a scratch database.
    #[tokio::test]
    async fn link_uniqueness_is_enforced_by_schema() {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            return;
        };
        let store = PostgresCatalogStore::connect(&url, 2).await.unwrap();
        store.migrate().await.unwrap();

        let product = catalog_products::NewProduct {
            seller_id: SellerId::new(),
            name: "Lamp".to_string(),
            description: "Desk lamp".to_string(),
            price: Decimal::new(1999, 2),
            quantity: 1,
        }
        .into_product(Utc::now())
        .unwrap();
        store.insert_product(product.clone()).await.unwrap();
        let category = Category::new("Lighting", Some(product.id));
        store.insert_category(category.clone()).await.unwrap();

        let link = ProductCategoryLink::new(product.id, category.id);
        assert!(store.link_category(link).await.unwrap());
        assert!(!store.link_category(link).await.unwrap());
        assert_eq!(
            store.linked_category_ids(product.id).await.unwrap(),
            vec![category.id]
        );

        assert!(store.delete_product(product.id).await.unwrap());
        let orphan = store.find_category(category.id).await.unwrap().unwrap();
        assert_eq!(orphan.product_id, None);
        store.delete_category(category.id).await.unwrap();
    }
}
