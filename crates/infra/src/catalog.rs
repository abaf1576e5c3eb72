//! Catalog service: the product/category use cases.
//!
//! [`CatalogService`] validates requests with the domain rules, persists
//! through a [`CatalogStore`], writes image files through an
//! [`ImageStorage`] and delegates category handling to
//! [`CategoryResolver`]. Steps of one operation run one after another with no
//! surrounding transaction; a failure returns early and keeps earlier writes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};

use catalog_core::{CategoryId, DomainError, ImageId, ProductId, SellerId};
use catalog_products::{
    Category, CategoryResolver, ImageUpload, NewProduct, Product, ProductDetails, ProductImage,
    ProductPatch, SearchQuery, StoreError, parse_category_refs, validate_category_name,
    validate_uploads,
};

use crate::seed;
use crate::storage::{ImageStorage, StorageError, StoredImage};
use crate::store::{CatalogStore, ProductFilter};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("{0} not found")]
    NotFound(&'static str),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Update request for an existing product.
///
/// `categories: None` leaves the links untouched while `Some(vec![])` clears
/// them. `images: Some(..)` replaces every stored image.
#[derive(Debug, Clone, Default)]
pub struct UpdateProduct {
    pub patch: ProductPatch,
    pub categories: Option<Vec<String>>,
    pub images: Option<Vec<ImageUpload>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PurchaseOutcome {
    /// Products that had stock and were decremented by one.
    pub purchased: Vec<ProductId>,
    /// Requested products that were not decremented (no stock or unknown id).
    pub out_of_stock: Vec<ProductId>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<ProductDetails>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<Category>>,
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    images: Arc<dyn ImageStorage>,
}

impl std::fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogService").finish_non_exhaustive()
    }
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>, images: Arc<dyn ImageStorage>) -> Self {
        Self { store, images }
    }

    fn resolver(&self) -> CategoryResolver<'_, dyn CatalogStore> {
        CategoryResolver::new(&*self.store)
    }

    pub async fn list_products(&self) -> CatalogResult<Vec<ProductDetails>> {
        let products = self.store.list_products(&ProductFilter::All).await?;
        self.details(products).await
    }

    pub async fn get_product(&self, id: ProductId) -> CatalogResult<ProductDetails> {
        let product = self
            .store
            .get_product(id)
            .await?
            .ok_or(CatalogError::NotFound("product"))?;
        self.single_details(product).await
    }

    /// Products whose id is listed; unknown ids are skipped.
    pub async fn products_by_ids(&self, ids: Vec<ProductId>) -> CatalogResult<Vec<ProductDetails>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let products = self.store.list_products(&ProductFilter::Ids(ids)).await?;
        self.details(products).await
    }

    pub async fn seller_products(&self, seller_id: SellerId) -> CatalogResult<Vec<ProductDetails>> {
        let products = self
            .store
            .list_products(&ProductFilter::Seller(seller_id))
            .await?;
        self.details(products).await
    }

    /// Validate and persist a new product, then store its images and attach
    /// its categories.
    #[instrument(skip_all, fields(seller_id = %new.seller_id), err)]
    pub async fn create_product(
        &self,
        new: NewProduct,
        categories: Vec<String>,
        images: Vec<ImageUpload>,
    ) -> CatalogResult<ProductDetails> {
        let refs = parse_category_refs(categories.as_slice())?;
        validate_uploads(&images, true)?;
        let product = new.into_product(Utc::now())?;

        self.store.insert_product(product.clone()).await?;
        self.save_images(product.id, &images).await?;
        let linked = self.resolver().attach_on_create(product.id, &refs).await?;

        info!(
            product_id = %product.id,
            images = images.len(),
            categories = linked.len(),
            "product created"
        );
        self.single_details(product).await
    }

    #[instrument(skip_all, fields(product_id = %id), err)]
    pub async fn update_product(
        &self,
        id: ProductId,
        update: UpdateProduct,
    ) -> CatalogResult<ProductDetails> {
        let mut product = self
            .store
            .get_product(id)
            .await?
            .ok_or(CatalogError::NotFound("product"))?;

        let refs = match &update.categories {
            Some(raw) => Some(parse_category_refs(raw.as_slice())?),
            None => None,
        };
        if let Some(uploads) = &update.images {
            validate_uploads(uploads, true)?;
        }

        if update.patch.apply(&mut product, Utc::now())? {
            self.store.update_product(&product).await?;
        }

        if let Some(refs) = refs {
            let outcome = self.resolver().reconcile_on_update(id, &refs).await?;
            info!(
                product_id = %id,
                created = outcome.created.len(),
                added = outcome.added.len(),
                removed = outcome.removed.len(),
                "product categories reconciled"
            );
        }

        if let Some(uploads) = &update.images {
            self.images.delete_product_images(id).await?;
            self.store.delete_images(id).await?;
            self.save_images(id, uploads).await?;
        }

        info!(product_id = %id, "product updated");
        self.single_details(product).await
    }

    /// Delete a product with its links, image rows and stored files.
    /// Unknown ids succeed without effect.
    #[instrument(skip(self), err)]
    pub async fn delete_product(&self, id: ProductId) -> CatalogResult<()> {
        let existed = self.store.delete_product(id).await?;
        self.images.delete_product_images(id).await?;
        if existed {
            info!(product_id = %id, "product deleted");
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    pub async fn search(&self, query: SearchQuery) -> CatalogResult<SearchResults> {
        query.validate()?;

        let mut results = SearchResults::default();
        if query.include_products {
            let products = self.store.search_products(&query).await?;
            results.products = Some(self.details(products).await?);
        }
        if query.include_categories {
            results.categories = Some(self.store.search_categories(&query).await?);
        }
        Ok(results)
    }

    #[instrument(skip_all, fields(requested = ids.len()), err)]
    pub async fn purchase(&self, ids: Vec<ProductId>) -> CatalogResult<PurchaseOutcome> {
        let purchased = self.store.decrement_stock(&ids).await?;

        let done: HashSet<ProductId> = purchased.iter().copied().collect();
        let mut seen = HashSet::with_capacity(ids.len());
        let out_of_stock = ids
            .into_iter()
            .filter(|id| !done.contains(id) && seen.insert(*id))
            .collect();

        let outcome = PurchaseOutcome {
            purchased,
            out_of_stock,
        };
        info!(
            purchased = outcome.purchased.len(),
            out_of_stock = outcome.out_of_stock.len(),
            "purchase processed"
        );
        Ok(outcome)
    }

    pub async fn list_categories(&self, limit: Option<usize>) -> CatalogResult<Vec<Category>> {
        Ok(self.store.list_categories(limit).await?)
    }

    pub async fn get_category(&self, id: CategoryId) -> CatalogResult<Category> {
        self.store
            .find_category(id)
            .await?
            .ok_or(CatalogError::NotFound("category"))
    }

    #[instrument(skip(self), err)]
    pub async fn rename_category(&self, id: CategoryId, name: &str) -> CatalogResult<Category> {
        validate_category_name(name)?;
        let category = self
            .store
            .rename_category(id, name.trim())
            .await?
            .ok_or(CatalogError::NotFound("category"))?;
        info!(category_id = %id, "category renamed");
        Ok(category)
    }

    #[instrument(skip(self), err)]
    pub async fn delete_category(&self, id: CategoryId) -> CatalogResult<()> {
        if !self.store.delete_category(id).await? {
            return Err(CatalogError::NotFound("category"));
        }
        info!(category_id = %id, "category deleted");
        Ok(())
    }

    /// Distinct products linked to any of the categories.
    pub async fn category_products(&self, ids: Vec<CategoryId>) -> CatalogResult<Vec<ProductDetails>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let product_ids = self.store.product_ids_in_categories(&ids).await?;
        self.products_by_ids(product_ids).await
    }

    /// Drop every product, category, link and stored image, then load the
    /// seed catalog.
    #[instrument(skip(self), err)]
    pub async fn reset(&self) -> CatalogResult<()> {
        self.store.clear().await?;
        self.images.clear().await?;
        seed::load(&*self.store, Utc::now()).await?;
        info!("catalog reset to seed data");
        Ok(())
    }

    async fn save_images(&self, product_id: ProductId, uploads: &[ImageUpload]) -> CatalogResult<()> {
        if uploads.is_empty() {
            return Ok(());
        }
        let stored = self.images.store_images(product_id, uploads).await?;
        let rows = stored
            .into_iter()
            .map(|StoredImage { url, is_thumbnail, position }| ProductImage {
                id: ImageId::new(),
                product_id,
                url,
                is_thumbnail,
                position,
            })
            .collect();
        self.store.insert_images(rows).await?;
        Ok(())
    }

    async fn single_details(&self, product: Product) -> CatalogResult<ProductDetails> {
        let id = product.id;
        self.details(vec![product])
            .await?
            .pop()
            .ok_or_else(|| CatalogError::Store(StoreError::Backend(format!("details of {id} missing"))))
    }

    /// Attach images and categories to each product, keeping product order.
    async fn details(&self, products: Vec<Product>) -> CatalogResult<Vec<ProductDetails>> {
        if products.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<ProductId> = products.iter().map(|p| p.id).collect();

        let mut images: HashMap<ProductId, Vec<ProductImage>> = HashMap::new();
        for image in self.store.images_for(&ids).await? {
            images.entry(image.product_id).or_default().push(image);
        }

        let mut categories: HashMap<ProductId, Vec<Category>> = HashMap::new();
        for (product_id, category) in self.store.categories_for(&ids).await? {
            categories.entry(product_id).or_default().push(category);
        }

        Ok(products
            .into_iter()
            .map(|product| ProductDetails {
                images: images.remove(&product.id).unwrap_or_default(),
                categories: categories.remove(&product.id).unwrap_or_default(),
                product,
            })
            .collect())
    }
}
