//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store/storage selection and the shared catalog service
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request DTOs, multipart form parsing and id helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Router,
};
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Upper bound for a request body; a product form carries several images.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: Arc<AppServices>) -> Router {
    let mut app = Router::new()
        .route("/health", get(routes::system::health))
        .route("/reset", post(routes::system::reset))
        .merge(routes::router());

    // Stored images are only served here when their URLs are local paths.
    let public_url = services.storage.public_url.trim_end_matches('/');
    if public_url.starts_with('/') && public_url.len() > 1 {
        app = app.nest_service(public_url, ServeDir::new(&services.storage.dir));
    }

    app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
            .layer(Extension(services)),
    )
}
