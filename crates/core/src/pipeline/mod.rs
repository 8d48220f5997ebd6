//! Persistence boundary of the pipeline engine

pub mod ports;

pub use ports::{PipelineStore, ProductCatalog};
