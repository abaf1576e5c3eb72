use std::path::Path;

use serde::{Deserialize, Serialize};

use catalog_core::{DomainError, DomainResult, Entity, ImageId, ProductId};

/// Largest accepted upload, in bytes (2048 KiB).
pub const MAX_IMAGE_BYTES: usize = 2048 * 1024;

/// Accepted file extensions (lowercase).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpeg", "png", "jpg", "gif", "svg"];

/// Stored image of a product. The first image of an upload batch is the thumbnail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: ImageId,
    pub product_id: ProductId,
    pub url: String,
    pub is_thumbnail: bool,
    pub position: u32,
}

impl Entity for ProductImage {
    type Id = ImageId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// An uploaded image file, not yet stored.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl core::fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Lowercased file extension, if the name has one.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }

    pub fn validate(&self, idx: usize) -> DomainResult<()> {
        if self.bytes.is_empty() {
            return Err(DomainError::validation(format!("images.{idx} is empty")));
        }
        if self.bytes.len() > MAX_IMAGE_BYTES {
            return Err(DomainError::validation(format!(
                "images.{idx} exceeds {} KiB",
                MAX_IMAGE_BYTES / 1024
            )));
        }
        match self.extension() {
            Some(ext) if IMAGE_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
            _ => Err(DomainError::validation(format!(
                "images.{idx} must be one of: {}",
                IMAGE_EXTENSIONS.join(", ")
            ))),
        }
    }
}

/// Validate an upload batch. `required` rejects an empty batch.
pub fn validate_uploads(uploads: &[ImageUpload], required: bool) -> DomainResult<()> {
    if required && uploads.is_empty() {
        return Err(DomainError::validation("images is required"));
    }
    uploads
        .iter()
        .enumerate()
        .try_for_each(|(idx, upload)| upload.validate(idx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_lowercased() {
        let upload = ImageUpload::new("Front.PNG", vec![1u8]);
        assert_eq!(upload.extension().as_deref(), Some("png"));
    }

    #[test]
    fn rejects_unknown_extension() {
        let upload = ImageUpload::new("notes.txt", vec![1u8]);
        assert!(matches!(upload.validate(0), Err(DomainError::Validation(_))));
    }

    #[test]
    fn rejects_oversized_file() {
        let upload = ImageUpload::new("big.jpg", vec![0u8; MAX_IMAGE_BYTES + 1]);
        match upload.validate(3).unwrap_err() {
            DomainError::Validation(msg) => assert!(msg.starts_with("images.3")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn batch_is_required_on_create() {
        assert!(validate_uploads(&[], true).is_err());
        assert!(validate_uploads(&[], false).is_ok());
    }
}
