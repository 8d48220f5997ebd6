//! # DealDesk Infrastructure
//!
//! Infrastructure implementations of core pipeline ports.
//!
//! This crate contains:
//! - SQLite pipeline store and product catalog (r2d2 pool over rusqlite)
//! - PostgREST pipeline store over a shared reqwest client
//! - Configuration loading and tracing subscriber setup
//! - Conversions from driver errors into `DealDeskError`
//!
//! ## Architecture
//! - Implements traits defined in `dealdesk-core`
//! - Contains all "impure" code (I/O, network, process environment)

pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod observability;
pub mod rest;

// Re-export commonly used items
pub use database::{DbManager, SqlitePipelineStore, SqliteProductCatalog};
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use observability::init_tracing;
pub use rest::RestPipelineStore;
