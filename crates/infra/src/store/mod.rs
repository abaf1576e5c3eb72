//! Catalog persistence: the store trait plus in-memory and Postgres backends.

pub mod in_memory;
pub mod postgres;
pub mod query;
pub mod r#trait;

pub use in_memory::InMemoryCatalogStore;
pub use postgres::PostgresCatalogStore;
pub use query::ProductFilter;
pub use r#trait::CatalogStore;
