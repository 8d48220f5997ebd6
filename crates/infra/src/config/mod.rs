//! Configuration loading
//!
//! Builds a [`dealdesk_domain::Config`] from environment variables or a
//! JSON/TOML file.

pub mod loader;

// Re-export commonly used items
pub use loader::{load, load_from_env, load_from_file, search_config_paths};
