use std::collections::HashMap;
use std::str::FromStr;

use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use rust_decimal::Decimal;
use serde::Deserialize;

use catalog_core::SellerId;
use catalog_infra::UpdateProduct;
use catalog_products::{ImageUpload, NewProduct, ProductPatch};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct IdsRequest {
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenameCategoryRequest {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListCategoriesQuery {
    pub limit: Option<usize>,
}

/// JSON partial update. An absent `categories` leaves links untouched; an
/// empty array clears them.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PatchProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<u32>,
    pub categories: Option<Vec<String>>,
}

impl From<PatchProductRequest> for UpdateProduct {
    fn from(body: PatchProductRequest) -> Self {
        UpdateProduct {
            patch: ProductPatch {
                name: body.name,
                description: body.description,
                price: body.price,
                quantity: body.quantity,
            },
            categories: body.categories,
            images: None,
        }
    }
}

/// Optional path segments of `/products/search/...`, still unparsed.
#[derive(Debug, Deserialize)]
pub struct SearchPath {
    pub query: String,
    pub products: Option<String>,
    pub categories: Option<String>,
    pub limit: Option<String>,
}

// -------------------------
// Multipart product form
// -------------------------

/// A product create/update form.
///
/// List fields accept `name`, `name[]` and `name[<n>]` keys. A bare
/// `categories` field with an empty value marks the list as supplied but
/// empty, which clears a product's categories on update.
#[derive(Debug, Default)]
pub struct ProductForm {
    fields: HashMap<String, String>,
    pub categories: Option<Vec<String>>,
    pub images: Vec<ImageUpload>,
}

fn is_list_field(name: &str, list: &str) -> bool {
    match name.strip_prefix(list) {
        Some("") => true,
        Some(rest) => rest.starts_with('[') && rest.ends_with(']'),
        None => false,
    }
}

fn bad_multipart(err: MultipartError) -> axum::response::Response {
    errors::validation_error(format!("invalid multipart request: {err}"))
}

impl ProductForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, axum::response::Response> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
            let name = field.name().unwrap_or_default().to_string();

            if let Some(file_name) = field.file_name().map(str::to_string) {
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                // Browsers send an unnamed empty part for an untouched file input.
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                if is_list_field(&name, "images") {
                    form.images.push(ImageUpload::new(file_name, bytes.to_vec()));
                }
                continue;
            }

            let value = field.text().await.map_err(bad_multipart)?;
            if name == "categories" && value.is_empty() {
                form.categories.get_or_insert_with(Vec::new);
            } else if is_list_field(&name, "categories") {
                form.categories.get_or_insert_with(Vec::new).push(value);
            } else {
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    fn optional<T: FromStr>(
        &mut self,
        key: &'static str,
        expected: &str,
    ) -> Result<Option<T>, axum::response::Response> {
        match self.fields.remove(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| errors::validation_error(format!("{key} must be {expected}"))),
            None => Ok(None),
        }
    }

    fn required<T: FromStr>(
        &mut self,
        key: &'static str,
        expected: &str,
    ) -> Result<T, axum::response::Response> {
        self.optional(key, expected)?
            .ok_or_else(|| errors::validation_error(format!("{key} is required")))
    }

    /// Split a create form into the product attributes, category references
    /// and uploads.
    pub fn into_create(
        mut self,
    ) -> Result<(NewProduct, Vec<String>, Vec<ImageUpload>), axum::response::Response> {
        let new = NewProduct {
            seller_id: self.required::<SellerId>("seller_id", "a valid id")?,
            name: self.required("name", "a string")?,
            description: self.required("description", "a string")?,
            price: self.required("price", "a number")?,
            quantity: self.required("quantity", "a non-negative integer")?,
        };
        Ok((new, self.categories.unwrap_or_default(), self.images))
    }

    /// Turn an update form into an [`UpdateProduct`]. Images are replaced only
    /// when the form carries files.
    pub fn into_update(mut self) -> Result<UpdateProduct, axum::response::Response> {
        let patch = ProductPatch {
            name: self.optional("name", "a string")?,
            description: self.optional("description", "a string")?,
            price: self.optional("price", "a number")?,
            quantity: self.optional("quantity", "a non-negative integer")?,
        };
        let images = (!self.images.is_empty()).then_some(self.images);
        Ok(UpdateProduct {
            patch,
            categories: self.categories,
            images,
        })
    }
}

// -------------------------
// Path and id helpers
// -------------------------

pub fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, axum::response::Response> {
    raw.parse().map_err(|_| {
        errors::json_error(
            axum::http::StatusCode::BAD_REQUEST,
            "invalid_id",
            format!("invalid {what} id"),
        )
    })
}

pub fn parse_ids<T: FromStr>(raw: &[String]) -> Result<Vec<T>, axum::response::Response> {
    raw.iter()
        .enumerate()
        .map(|(idx, id)| {
            id.parse()
                .map_err(|_| errors::validation_error(format!("ids.{idx} is not a valid id")))
        })
        .collect()
}
