//! Category resolution and reconciliation.
//!
//! Callers describe a product's categories as a list of references, each
//! either the identifier of an existing category or the name of a new one.
//! [`CategoryResolver`] turns those references into category identifiers and
//! applies them as the product's links.
//!
//! ## Resolution rule
//!
//! A reference is first looked up as an existing category identifier. If a
//! category with that identifier exists, its identifier is used as-is and no
//! name comparison happens. Otherwise the raw reference text becomes the name
//! of a freshly created category, tagged with the product being resolved.
//! Names are never deduplicated: resolving `"Shoes"` twice creates two
//! categories called `"Shoes"`.
//!
//! ## Create vs update
//!
//! - [`CategoryResolver::attach_on_create`] links every resolved identifier in
//!   input order, without deduplicating. Repeated links are left to the store,
//!   whose `link_category` is a no-op for an existing pair.
//! - [`CategoryResolver::reconcile_on_update`] resolves into a *set* and makes
//!   the product's links equal to it: stale links are removed, missing links
//!   are added and links already present are left alone.
//!
//! ## Failure model
//!
//! Store calls are awaited one after another with no transaction around them.
//! A [`StoreError`] aborts the operation and is returned unchanged; work done
//! before the failure (created categories, added or removed links) stays.

use std::collections::HashSet;

use catalog_core::{CategoryId, ProductId};

use crate::category::{Category, CategoryReference, ProductCategoryLink};
use crate::store::{CategoryStore, StoreError};

/// Changes made by [`CategoryResolver::reconcile_on_update`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Categories created while resolving name references.
    pub created: Vec<CategoryId>,
    /// Links added (category ids), in reference order.
    pub added: Vec<CategoryId>,
    /// Links removed (category ids), in previous link order.
    pub removed: Vec<CategoryId>,
    /// Links that were already present and are still wanted.
    pub kept: Vec<CategoryId>,
}

impl ReconcileOutcome {
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.added.is_empty() && self.removed.is_empty()
    }
}

/// Resolves category references against a borrowed store.
#[derive(Debug)]
pub struct CategoryResolver<'a, S: ?Sized> {
    store: &'a S,
}

impl<S: ?Sized> Clone for CategoryResolver<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: ?Sized> Copy for CategoryResolver<'_, S> {}

impl<'a, S> CategoryResolver<'a, S>
where
    S: CategoryStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Resolve one reference to a category identifier, creating a category
    /// named after the reference when it is not an existing identifier.
    pub async fn resolve_reference(
        &self,
        product_id: ProductId,
        reference: &CategoryReference,
    ) -> Result<CategoryId, StoreError> {
        Ok(self.resolve(product_id, reference).await?.0)
    }

    /// Link every reference to a freshly created product.
    ///
    /// Returns the resolved identifiers in input order (duplicates included).
    pub async fn attach_on_create(
        &self,
        product_id: ProductId,
        refs: &[CategoryReference],
    ) -> Result<Vec<CategoryId>, StoreError> {
        let mut resolved = Vec::with_capacity(refs.len());

        for reference in refs {
            let (category_id, _) = self.resolve(product_id, reference).await?;
            let inserted = self
                .store
                .link_category(ProductCategoryLink::new(product_id, category_id))
                .await?;
            if !inserted {
                tracing::debug!(%product_id, %category_id, "category already linked");
            }
            resolved.push(category_id);
        }

        Ok(resolved)
    }

    /// Make the product's links exactly match the resolved references.
    ///
    /// An empty `refs` clears every link. Callers that want to leave links
    /// untouched must not call this at all.
    pub async fn reconcile_on_update(
        &self,
        product_id: ProductId,
        refs: &[CategoryReference],
    ) -> Result<ReconcileOutcome, StoreError> {
        let mut outcome = ReconcileOutcome::default();

        let mut target = Vec::with_capacity(refs.len());
        let mut target_set = HashSet::with_capacity(refs.len());
        for reference in refs {
            let (category_id, created) = self.resolve(product_id, reference).await?;
            if created {
                outcome.created.push(category_id);
            }
            if target_set.insert(category_id) {
                target.push(category_id);
            }
        }

        let current = self.store.linked_category_ids(product_id).await?;
        let current_set: HashSet<CategoryId> = current.iter().copied().collect();

        for category_id in current {
            if target_set.contains(&category_id) {
                outcome.kept.push(category_id);
                continue;
            }
            self.store
                .unlink_category(ProductCategoryLink::new(product_id, category_id))
                .await?;
            outcome.removed.push(category_id);
        }

        for category_id in target {
            if current_set.contains(&category_id) {
                continue;
            }
            self.store
                .link_category(ProductCategoryLink::new(product_id, category_id))
                .await?;
            outcome.added.push(category_id);
        }

        tracing::debug!(
            %product_id,
            created = outcome.created.len(),
            added = outcome.added.len(),
            removed = outcome.removed.len(),
            kept = outcome.kept.len(),
            "reconciled product categories"
        );

        Ok(outcome)
    }

    /// Returns the identifier and whether a category had to be created.
    async fn resolve(
        &self,
        product_id: ProductId,
        reference: &CategoryReference,
    ) -> Result<(CategoryId, bool), StoreError> {
        if let Some(candidate) = reference.candidate_id() {
            if let Some(existing) = self.store.find_category(candidate).await? {
                return Ok((existing.id, false));
            }
        }

        let category = Category::new(reference.raw(), Some(product_id));
        let category_id = category.id;
        self.store.insert_category(category).await?;
        tracing::debug!(%product_id, %category_id, name = reference.raw(), "created category");

        Ok((category_id, true))
    }
}
