use std::sync::Arc;

use axum::{
    extract::{Extension, Multipart, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use catalog_core::{ProductId, SellerId};
use catalog_infra::config::parse_flag;
use catalog_products::SearchQuery;

use crate::app::dto::{self, ProductForm};
use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/ids", post(products_by_ids))
        .route("/purchase", post(purchase_products))
        .route("/search/:query", get(search))
        .route("/search/:query/:products", get(search))
        .route("/search/:query/:products/:categories", get(search))
        .route("/search/:query/:products/:categories/:limit", get(search))
        .route(
            "/:id",
            get(get_product)
                .put(update_product_form)
                .patch(update_product_json)
                .delete(delete_product),
        )
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.catalog.list_products().await {
        Ok(products) => Json(json!({
            "message": "Success",
            "products": products,
        }))
        .into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    multipart: Multipart,
) -> axum::response::Response {
    let (new, categories, images) = match ProductForm::read(multipart)
        .await
        .and_then(ProductForm::into_create)
    {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.catalog.create_product(new, categories, images).await {
        Ok(product) => (
            StatusCode::CREATED,
            Json(json!({
                "message": "Success",
                "product": product,
            })),
        )
            .into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match dto::parse_id(&id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.catalog.get_product(id).await {
        Ok(product) => Json(json!({
            "message": "Success",
            "product": product,
        }))
        .into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

/// `PUT` with a multipart form (attributes, `categories[]`, `images[]`).
pub async fn update_product_form(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> axum::response::Response {
    let id: ProductId = match dto::parse_id(&id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let update = match ProductForm::read(multipart)
        .await
        .and_then(ProductForm::into_update)
    {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    updated_response(&services, id, update).await
}

/// `PATCH` with a JSON body; cannot replace images.
pub async fn update_product_json(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::PatchProductRequest>,
) -> axum::response::Response {
    let id: ProductId = match dto::parse_id(&id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    updated_response(&services, id, body.into()).await
}

async fn updated_response(
    services: &AppServices,
    id: ProductId,
    update: catalog_infra::UpdateProduct,
) -> axum::response::Response {
    match services.catalog.update_product(id, update).await {
        Ok(product) => Json(json!({
            "message": format!("Updated product id: {id}"),
            "product": product,
        }))
        .into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match dto::parse_id(&id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.catalog.delete_product(id).await {
        Ok(()) => Json(json!({ "message": "Product deleted" })).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn products_by_ids(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::IdsRequest>,
) -> axum::response::Response {
    let ids: Vec<ProductId> = match dto::parse_ids(&body.ids) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.catalog.products_by_ids(ids).await {
        Ok(products) => Json(json!({ "products": products })).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn purchase_products(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::IdsRequest>,
) -> axum::response::Response {
    let ids: Vec<ProductId> = match dto::parse_ids(&body.ids) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.catalog.purchase(ids).await {
        Ok(outcome) => Json(json!({
            "message": "Success",
            "purchased": outcome.purchased,
            "out_of_stock": outcome.out_of_stock,
        }))
        .into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn seller_products(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let seller_id: SellerId = match dto::parse_id(&id, "seller") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.catalog.seller_products(seller_id).await {
        Ok(products) => Json(json!({
            "message": format!("Returning {} products", products.len()),
            "products": products,
        }))
        .into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

fn search_flag(raw: Option<&str>, name: &str) -> Result<bool, axum::response::Response> {
    match raw {
        None => Ok(true),
        Some(raw) => parse_flag(raw)
            .ok_or_else(|| errors::validation_error(format!("{name} must be one of 1, 0, true, false"))),
    }
}

fn search_query(path: dto::SearchPath) -> Result<SearchQuery, axum::response::Response> {
    let mut query = SearchQuery::new(path.query);
    query.include_products = search_flag(path.products.as_deref(), "products")?;
    query.include_categories = search_flag(path.categories.as_deref(), "categories")?;
    query.limit = match path.limit {
        Some(raw) => Some(
            raw.parse()
                .map_err(|_| errors::validation_error("limit must be a non-negative integer"))?,
        ),
        None => None,
    };
    Ok(query)
}

/// `GET /products/search/:query[/:products[/:categories[/:limit]]]`
pub async fn search(
    Extension(services): Extension<Arc<AppServices>>,
    Path(path): Path<dto::SearchPath>,
) -> axum::response::Response {
    let query = match search_query(path) {
        Ok(q) => q,
        Err(resp) => return resp,
    };

    match services.catalog.search(query).await {
        Ok(results) => {
            let mut body = json!({ "message": "Returning search results" });
            if let Some(products) = results.products {
                body["products"] = json!(products);
            }
            if let Some(categories) = results.categories {
                body["categories"] = json!(categories);
            }
            Json(body).into_response()
        }
        Err(e) => errors::catalog_error_to_response(e),
    }
}
