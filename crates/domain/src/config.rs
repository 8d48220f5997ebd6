//! Configuration structures
//!
//! Loaded by `dealdesk-infra::config` from environment variables or a JSON /
//! TOML file. Only plain data lives here.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DB_PATH, DEFAULT_DB_POOL_SIZE, DEFAULT_LOG_LEVEL, DEFAULT_REMOTE_MAX_ATTEMPTS,
    DEFAULT_REMOTE_TIMEOUT_SECS,
};
use crate::impl_domain_status_conversions;

/// Which persistence adapter backs the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Local SQLite database.
    #[default]
    Sqlite,
    /// Hosted PostgREST-compatible service.
    Rest,
}

impl_domain_status_conversions!(BackendKind {
    Sqlite => "sqlite",
    Rest => "rest",
});

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Local SQLite settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: DEFAULT_DB_PATH.to_string(), pool_size: DEFAULT_DB_POOL_SIZE }
    }
}

/// Hosted service settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Project URL without the `/rest/v1` suffix.
    pub base_url: String,
    /// Public (anon) API key sent as `apikey`.
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Total attempts per request; 1 disables transport retries.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
}

/// Tracing subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: DEFAULT_LOG_LEVEL.to_string(), json: false }
    }
}

fn default_pool_size() -> u32 {
    DEFAULT_DB_POOL_SIZE
}

fn default_timeout_secs() -> u64 {
    DEFAULT_REMOTE_TIMEOUT_SECS
}

fn default_max_attempts() -> usize {
    DEFAULT_REMOTE_MAX_ATTEMPTS
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
