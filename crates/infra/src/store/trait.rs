use async_trait::async_trait;

use catalog_core::{CategoryId, ProductId};
use catalog_products::{Category, CategoryStore, Product, ProductImage, SearchQuery, StoreResult};

use super::query::ProductFilter;

/// Full catalog persistence.
///
/// Extends the resolver's [`CategoryStore`] port with product, image and
/// bulk operations. Implementations must:
/// - keep at most one link per (product, category) pair
/// - remove a product's links and image rows when the product is deleted
/// - remove a category's links when the category is deleted
/// - never let a product quantity drop below zero
#[async_trait]
pub trait CatalogStore: CategoryStore {
    async fn insert_product(&self, product: Product) -> StoreResult<()>;

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>>;

    /// Overwrite the stored attributes of an existing product.
    async fn update_product(&self, product: &Product) -> StoreResult<()>;

    /// Returns `false` when no such product existed.
    async fn delete_product(&self, id: ProductId) -> StoreResult<bool>;

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>>;

    async fn search_products(&self, query: &SearchQuery) -> StoreResult<Vec<Product>>;

    /// Take one unit from each listed product that has stock. Returns the ids
    /// that were decremented; each product is decremented at most once.
    async fn decrement_stock(&self, ids: &[ProductId]) -> StoreResult<Vec<ProductId>>;

    /// Categories ordered by name.
    async fn list_categories(&self, limit: Option<usize>) -> StoreResult<Vec<Category>>;

    async fn search_categories(&self, query: &SearchQuery) -> StoreResult<Vec<Category>>;

    /// Returns the renamed category, or `None` when it does not exist.
    async fn rename_category(&self, id: CategoryId, name: &str) -> StoreResult<Option<Category>>;

    async fn delete_category(&self, id: CategoryId) -> StoreResult<bool>;

    /// Categories linked to each of the products, in link order.
    async fn categories_for(&self, product_ids: &[ProductId]) -> StoreResult<Vec<(ProductId, Category)>>;

    /// Distinct products linked to any of the categories.
    async fn product_ids_in_categories(&self, ids: &[CategoryId]) -> StoreResult<Vec<ProductId>>;

    async fn insert_images(&self, images: Vec<ProductImage>) -> StoreResult<()>;

    /// Images of each product, ordered by position.
    async fn images_for(&self, product_ids: &[ProductId]) -> StoreResult<Vec<ProductImage>>;

    /// Returns the number of image rows removed.
    async fn delete_images(&self, product_id: ProductId) -> StoreResult<usize>;

    /// Remove every product, category, link and image row.
    async fn clear(&self) -> StoreResult<()>;
}
