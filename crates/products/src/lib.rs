//! Products domain module.
//!
//! Products, their images and categories, plus the rules that turn a caller's
//! category references into category links. Persistence is reached only
//! through the [`store::CategoryStore`] port; this crate performs no IO itself.

pub mod category;
pub mod image;
pub mod product;
pub mod resolver;
pub mod search;
pub mod store;

pub use category::{
    Category, CategoryReference, ProductCategoryLink, parse_category_refs, validate_category_name,
};
pub use image::{ImageUpload, ProductImage, validate_uploads};
pub use product::{NewProduct, Product, ProductDetails, ProductPatch};
pub use resolver::{CategoryResolver, ReconcileOutcome};
pub use search::SearchQuery;
pub use store::{CategoryStore, StoreError, StoreResult};
