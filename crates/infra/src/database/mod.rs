//! SQLite persistence

pub mod manager;
pub mod pipeline_repository;
pub mod product_repository;

pub use manager::*;
pub use pipeline_repository::SqlitePipelineStore;
pub use product_repository::SqliteProductCatalog;
