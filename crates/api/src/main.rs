use std::sync::Arc;

use catalog_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    catalog_observability::init(config.log_format);

    let services = Arc::new(catalog_api::app::services::build_services(&config).await?);
    let app = catalog_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
