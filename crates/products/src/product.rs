use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use catalog_core::{DomainError, DomainResult, Entity, ProductId, SellerId};

use crate::category::Category;
use crate::image::ProductImage;

/// A sellable catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub seller_id: SellerId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Product {
    pub fn in_stock(&self) -> bool {
        self.quantity > 0
    }
}

/// A product together with its images and categories, as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductDetails {
    #[serde(flatten)]
    pub product: Product,
    pub images: Vec<ProductImage>,
    pub categories: Vec<Category>,
}

/// Attributes of a product about to be created.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewProduct {
    pub seller_id: SellerId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub quantity: u32,
}

impl NewProduct {
    pub fn validate(&self) -> DomainResult<()> {
        validate_text("name", &self.name)?;
        validate_text("description", &self.description)?;
        validate_price(self.price)
    }

    /// Validate and build the product row, assigning a fresh identifier.
    pub fn into_product(self, now: DateTime<Utc>) -> DomainResult<Product> {
        self.validate()?;
        Ok(Product {
            id: ProductId::new(),
            seller_id: self.seller_id,
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            price: self.price,
            quantity: self.quantity,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial attribute update. `None` leaves the attribute untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<u32>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.quantity.is_none()
    }

    pub fn validate(&self) -> DomainResult<()> {
        if let Some(name) = &self.name {
            validate_text("name", name)?;
        }
        if let Some(description) = &self.description {
            validate_text("description", description)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        Ok(())
    }

    /// Apply the patch in place. Returns whether any attribute changed.
    pub fn apply(&self, product: &mut Product, now: DateTime<Utc>) -> DomainResult<bool> {
        self.validate()?;

        let mut changed = false;
        if let Some(name) = &self.name {
            changed |= replace(&mut product.name, name.trim().to_string());
        }
        if let Some(description) = &self.description {
            changed |= replace(&mut product.description, description.trim().to_string());
        }
        if let Some(price) = self.price {
            changed |= replace(&mut product.price, price);
        }
        if let Some(quantity) = self.quantity {
            changed |= replace(&mut product.quantity, quantity);
        }

        if changed {
            product.updated_at = now;
        }
        Ok(changed)
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

fn validate_text(field: &str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

fn validate_price(price: Decimal) -> DomainResult<()> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(DomainError::validation("price cannot be negative"));
    }
    Ok(())
}
