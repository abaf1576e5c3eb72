use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use catalog_core::CategoryId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_categories))
        .route("/products", post(category_products))
        .route(
            "/:id",
            get(get_category).put(rename_category).delete(delete_category),
        )
}

pub async fn list_categories(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ListCategoriesQuery>,
) -> axum::response::Response {
    match services.catalog.list_categories(query.limit).await {
        Ok(categories) => Json(json!({
            "message": "Success",
            "categories": categories,
        }))
        .into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn get_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CategoryId = match dto::parse_id(&id, "category") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.catalog.get_category(id).await {
        Ok(category) => Json(json!({
            "message": "Success",
            "category": category,
        }))
        .into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn rename_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::RenameCategoryRequest>,
) -> axum::response::Response {
    let id: CategoryId = match dto::parse_id(&id, "category") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.catalog.rename_category(id, &body.name).await {
        Ok(category) => Json(json!({
            "message": format!("Updated category id: {id}"),
            "category": category,
        }))
        .into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn delete_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CategoryId = match dto::parse_id(&id, "category") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.catalog.delete_category(id).await {
        Ok(()) => Json(json!({ "message": "Category deleted" })).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn category_products(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::IdsRequest>,
) -> axum::response::Response {
    let ids: Vec<CategoryId> = match dto::parse_ids(&body.ids) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.catalog.category_products(ids).await {
        Ok(products) => Json(json!({ "products": products })).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}
