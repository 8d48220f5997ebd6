//! Infrastructure error conversions

pub mod conversions;

pub use conversions::{map_join_error, map_pool_error, map_sql_error, status_error, InfraError};
