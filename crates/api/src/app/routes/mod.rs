use axum::{routing::get, Router};

pub mod categories;
pub mod products;
pub mod system;

/// Router for all catalog endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/user/:id/products", get(products::seller_products))
        .nest("/products", products::router())
        .nest("/categories", categories::router())
}
