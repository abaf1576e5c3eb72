//! Image file storage.
//!
//! The catalog only keeps image URLs; the bytes live behind [`ImageStorage`].
//! [`LocalImageStorage`] writes them to a directory that the API serves
//! statically.

mod local;

use async_trait::async_trait;
use thiserror::Error;

use catalog_core::ProductId;
use catalog_products::ImageUpload;

pub use local::LocalImageStorage;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid upload: {0}")]
    InvalidUpload(String),
}

/// Where one stored upload ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub url: String,
    pub is_thumbnail: bool,
    pub position: u32,
}

#[async_trait]
pub trait ImageStorage: Send + Sync {
    /// Persist an upload batch for a product. The first upload becomes the
    /// thumbnail; positions follow upload order.
    async fn store_images(
        &self,
        product_id: ProductId,
        uploads: &[ImageUpload],
    ) -> Result<Vec<StoredImage>, StorageError>;

    /// Remove every stored file of a product. Missing files are not an error.
    async fn delete_product_images(&self, product_id: ProductId) -> Result<(), StorageError>;

    /// Remove every stored file.
    async fn clear(&self) -> Result<(), StorageError>;
}
