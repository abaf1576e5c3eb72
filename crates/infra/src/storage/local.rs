use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use catalog_core::ProductId;
use catalog_products::ImageUpload;

use super::{ImageStorage, StorageError, StoredImage};

/// Filesystem-backed image storage.
///
/// Files are written as `<root>/<product_id>/image_<n>.<ext>` and exposed as
/// `<public_base_url>/<product_id>/image_<n>.<ext>`.
#[derive(Debug, Clone)]
pub struct LocalImageStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalImageStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        let public_base_url = public_base_url.into().trim_end_matches('/').to_string();
        Self {
            root: root.into(),
            public_base_url,
        }
    }

    fn product_dir(&self, product_id: ProductId) -> PathBuf {
        self.root.join(product_id.to_string())
    }
}

async fn remove_dir_if_exists(path: &Path) -> Result<(), StorageError> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl ImageStorage for LocalImageStorage {
    async fn store_images(
        &self,
        product_id: ProductId,
        uploads: &[ImageUpload],
    ) -> Result<Vec<StoredImage>, StorageError> {
        let dir = self.product_dir(product_id);
        fs::create_dir_all(&dir).await?;

        let mut stored = Vec::with_capacity(uploads.len());
        for (position, upload) in uploads.iter().enumerate() {
            let ext = upload.extension().ok_or_else(|| {
                StorageError::InvalidUpload(format!("{} has no extension", upload.file_name))
            })?;
            let file_name = format!("image_{position}.{ext}");
            fs::write(dir.join(&file_name), &upload.bytes).await?;

            stored.push(StoredImage {
                url: format!("{}/{}/{}", self.public_base_url, product_id, file_name),
                is_thumbnail: position == 0,
                position: position as u32,
            });
        }

        tracing::debug!(%product_id, count = stored.len(), "stored product images");
        Ok(stored)
    }

    async fn delete_product_images(&self, product_id: ProductId) -> Result<(), StorageError> {
        remove_dir_if_exists(&self.product_dir(product_id)).await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        remove_dir_if_exists(&self.root).await?;
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }
}
