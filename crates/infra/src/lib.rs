//! Infrastructure layer: persistence, image storage, configuration and the
//! catalog service that ties them to the domain rules.

pub mod catalog;
pub mod config;
pub mod seed;
pub mod storage;
pub mod store;

#[cfg(test)]
mod integration_tests;

pub use catalog::{CatalogError, CatalogService, PurchaseOutcome, SearchResults, UpdateProduct};
pub use config::{AppConfig, ConfigError, LogFormat, StorageConfig};
pub use storage::{ImageStorage, LocalImageStorage, StorageError, StoredImage};
pub use store::{CatalogStore, InMemoryCatalogStore, PostgresCatalogStore, ProductFilter};
