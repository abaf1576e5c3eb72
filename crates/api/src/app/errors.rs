use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use catalog_core::DomainError;
use catalog_infra::{CatalogError, StorageError};
use catalog_products::StoreError;

pub fn catalog_error_to_response(err: CatalogError) -> axum::response::Response {
    match err {
        CatalogError::Domain(e) => domain_error_to_response(e),
        CatalogError::NotFound(what) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
        }
        CatalogError::Store(StoreError::Conflict(msg)) => {
            tracing::warn!(error = %msg, "store conflict");
            json_error(StatusCode::CONFLICT, "conflict", "request conflicts with stored data")
        }
        CatalogError::Store(e) => {
            tracing::error!(error = %e, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "internal storage failure")
        }
        CatalogError::Storage(StorageError::InvalidUpload(msg)) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        CatalogError::Storage(e) => {
            tracing::error!(error = %e, "image storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", "internal storage failure")
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
    }
}

pub fn validation_error(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", message)
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_catalog_errors_to_status_codes() {
        let cases = [
            (CatalogError::Domain(DomainError::validation("name cannot be empty")), StatusCode::BAD_REQUEST),
            (CatalogError::Domain(DomainError::invalid_id("ProductId: bad")), StatusCode::BAD_REQUEST),
            (CatalogError::NotFound("product"), StatusCode::NOT_FOUND),
            (CatalogError::Store(StoreError::Conflict("dup".to_string())), StatusCode::CONFLICT),
            (
                CatalogError::Store(StoreError::Unavailable("pool closed".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                CatalogError::Storage(StorageError::InvalidUpload("no extension".to_string())),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(catalog_error_to_response(err).status(), status);
        }
    }
}
