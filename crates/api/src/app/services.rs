//! Service wiring: picks the store backend from configuration.

use std::sync::Arc;

use catalog_infra::{
    AppConfig, CatalogService, CatalogStore, InMemoryCatalogStore, LocalImageStorage,
    PostgresCatalogStore, StorageConfig,
};

const PG_MAX_CONNECTIONS: u32 = 5;

/// Shared state handed to every handler through `Extension`.
#[derive(Debug, Clone)]
pub struct AppServices {
    pub catalog: CatalogService,
    pub storage: StorageConfig,
}

impl AppServices {
    pub fn new(catalog: CatalogService, storage: StorageConfig) -> Self {
        Self { catalog, storage }
    }
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let store: Arc<dyn CatalogStore> = match &config.database_url {
        Some(url) => {
            let store = PostgresCatalogStore::connect(url, PG_MAX_CONNECTIONS).await?;
            store.migrate().await?;
            tracing::info!("using postgres catalog store");
            Arc::new(store)
        }
        None => {
            tracing::info!("using in-memory catalog store");
            Arc::new(InMemoryCatalogStore::new())
        }
    };

    tokio::fs::create_dir_all(&config.storage.dir).await?;
    let images = Arc::new(LocalImageStorage::new(
        &config.storage.dir,
        &config.storage.public_url,
    ));

    let catalog = CatalogService::new(store, images);
    if config.seed_on_start {
        catalog.reset().await?;
    }

    Ok(AppServices::new(catalog, config.storage.clone()))
}
