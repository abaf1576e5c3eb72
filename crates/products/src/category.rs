use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use catalog_core::{CategoryId, DomainError, DomainResult, Entity, ProductId};

/// A shared product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// Product whose create/update request introduced this category, if any.
    pub product_id: Option<ProductId>,
}

impl Category {
    pub fn new(name: impl Into<String>, origin: Option<ProductId>) -> Self {
        Self {
            id: CategoryId::new(),
            name: name.into(),
            product_id: origin,
        }
    }
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Many-to-many association between a product and a category.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductCategoryLink {
    pub product_id: ProductId,
    pub category_id: CategoryId,
}

impl ProductCategoryLink {
    pub fn new(product_id: ProductId, category_id: CategoryId) -> Self {
        Self {
            product_id,
            category_id,
        }
    }
}

/// A caller-supplied category reference.
///
/// Callers send plain strings. A string that parses as a category identifier
/// becomes [`CategoryReference::Identifier`], but that is only a hint: the
/// resolver still looks the identifier up and, when it does not exist, falls
/// back to creating a category named with the raw text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CategoryReference {
    Identifier { id: CategoryId, raw: String },
    Name(String),
}

impl CategoryReference {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse::<CategoryId>() {
            Ok(id) => Self::Identifier {
                id,
                raw: raw.to_string(),
            },
            Err(_) => Self::Name(raw.to_string()),
        }
    }

    /// Identifier to try before treating the reference as a name.
    pub fn candidate_id(&self) -> Option<CategoryId> {
        match self {
            Self::Identifier { id, .. } => Some(*id),
            Self::Name(_) => None,
        }
    }

    /// Text used as the category name when the reference does not resolve.
    pub fn raw(&self) -> &str {
        match self {
            Self::Identifier { raw, .. } => raw,
            Self::Name(name) => name,
        }
    }
}

impl From<CategoryId> for CategoryReference {
    fn from(id: CategoryId) -> Self {
        Self::Identifier {
            id,
            raw: id.to_string(),
        }
    }
}

impl From<&str> for CategoryReference {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

/// Validate raw request strings and turn them into references.
///
/// Every entry must be non-blank and the entries must be pairwise distinct
/// (after trimming).
pub fn parse_category_refs<S: AsRef<str>>(raw: &[S]) -> DomainResult<Vec<CategoryReference>> {
    let mut seen = HashSet::with_capacity(raw.len());
    let mut refs = Vec::with_capacity(raw.len());

    for (idx, entry) in raw.iter().enumerate() {
        let entry = entry.as_ref().trim();
        if entry.is_empty() {
            return Err(DomainError::validation(format!(
                "categories.{idx} cannot be empty"
            )));
        }
        if !seen.insert(entry) {
            return Err(DomainError::validation(format!(
                "categories.{idx} has a duplicate value"
            )));
        }
        refs.push(CategoryReference::parse(entry));
    }

    Ok(refs)
}

/// Validate a category name supplied for a rename.
pub fn validate_category_name(name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    Ok(())
}
