use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::app::errors;
use crate::app::services::AppServices;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Wipe the catalog and load the seed data.
pub async fn reset(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.catalog.reset().await {
        Ok(()) => Json(json!({ "message": "Success" })).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}
