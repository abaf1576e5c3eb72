use catalog_core::{DomainError, DomainResult};

/// Free-text catalog search.
///
/// Products match on name or description, categories on name. Matching is a
/// case-insensitive substring test. `limit` caps each result kind separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub term: String,
    pub include_products: bool,
    pub include_categories: bool,
    pub limit: Option<usize>,
}

impl SearchQuery {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            include_products: true,
            include_categories: true,
            limit: None,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if !self.include_products && !self.include_categories {
            return Err(DomainError::validation(
                "must include either categories or products",
            ));
        }
        if self.term.trim().is_empty() {
            return Err(DomainError::validation("search term cannot be empty"));
        }
        Ok(())
    }

    pub fn matches(&self, text: &str) -> bool {
        text.to_lowercase().contains(&self.term.trim().to_lowercase())
    }
}
