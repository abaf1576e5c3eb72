//! Persistence port used by the category resolver.

use async_trait::async_trait;
use thiserror::Error;

use catalog_core::{CategoryId, ProductId};

use crate::category::{Category, ProductCategoryLink};

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure raised by a store backend. Callers propagate it unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness or integrity constraint rejected the write.
    #[error("store conflict: {0}")]
    Conflict(String),

    /// The backend could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store failure: {0}")]
    Backend(String),
}

/// Category and link persistence, as seen by [`crate::CategoryResolver`].
#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn find_category(&self, id: CategoryId) -> StoreResult<Option<Category>>;

    async fn insert_category(&self, category: Category) -> StoreResult<()>;

    /// Create a link. Returns `false` when the pair was already linked.
    async fn link_category(&self, link: ProductCategoryLink) -> StoreResult<bool>;

    /// Remove a link. Returns `false` when the pair was not linked.
    async fn unlink_category(&self, link: ProductCategoryLink) -> StoreResult<bool>;

    /// Category ids currently linked to the product.
    async fn linked_category_ids(&self, product_id: ProductId) -> StoreResult<Vec<CategoryId>>;
}
