//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `DEALDESK_BACKEND` is unset or a value is invalid, falls back to a file
//! 3. Searches multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `DEALDESK_BACKEND`: `sqlite` or `rest` (required for env loading)
//! - `DEALDESK_DB_PATH`: Database file path (required for `sqlite`)
//! - `DEALDESK_DB_POOL_SIZE`: Connection pool size
//! - `DEALDESK_REMOTE_URL`: Hosted project URL (required for `rest`)
//! - `DEALDESK_REMOTE_API_KEY`: Hosted project API key (required for `rest`)
//! - `DEALDESK_REMOTE_TIMEOUT_SECS`: Per-request timeout in seconds
//! - `DEALDESK_REMOTE_MAX_ATTEMPTS`: Total attempts per request
//! - `DEALDESK_LOG_LEVEL`: Default tracing level (`RUST_LOG` still wins)
//! - `DEALDESK_LOG_JSON`: Emit JSON log lines (true/false)
//!
//! ## File Locations
//! The loader searches the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./dealdesk.json` or `./dealdesk.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use dealdesk_domain::constants::{
    DEFAULT_DB_POOL_SIZE, DEFAULT_LOG_LEVEL, DEFAULT_REMOTE_MAX_ATTEMPTS, DEFAULT_REMOTE_TIMEOUT_SECS,
};
use dealdesk_domain::{
    BackendKind, Config, DatabaseConfig, DealDeskError, LoggingConfig, RemoteConfig, Result,
};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the backend is not
/// selected there, or a value is invalid, falls back to a config file.
///
/// # Errors
/// Returns `DealDeskError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing for the selected backend
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!(backend = %config.backend, "Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `DealDeskError::Config` if required variables are missing
/// or have invalid values.
pub fn load_from_env() -> Result<Config> {
    let backend = env_var("DEALDESK_BACKEND").and_then(|s| {
        BackendKind::from_str(&s).map_err(|e| DealDeskError::Config(format!("Invalid backend: {}", e)))
    })?;

    let database = match backend {
        BackendKind::Sqlite => DatabaseConfig {
            path: env_var("DEALDESK_DB_PATH")?,
            pool_size: env_parse("DEALDESK_DB_POOL_SIZE", DEFAULT_DB_POOL_SIZE)?,
        },
        BackendKind::Rest => DatabaseConfig::default(),
    };

    let remote = match backend {
        BackendKind::Rest => Some(RemoteConfig {
            base_url: env_var("DEALDESK_REMOTE_URL")?,
            api_key: env_var("DEALDESK_REMOTE_API_KEY")?,
            timeout_secs: env_parse("DEALDESK_REMOTE_TIMEOUT_SECS", DEFAULT_REMOTE_TIMEOUT_SECS)?,
            max_attempts: env_parse("DEALDESK_REMOTE_MAX_ATTEMPTS", DEFAULT_REMOTE_MAX_ATTEMPTS)?,
        }),
        BackendKind::Sqlite => None,
    };

    let logging = LoggingConfig {
        level: std::env::var("DEALDESK_LOG_LEVEL").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string()),
        json: env_bool("DEALDESK_LOG_JSON", false),
    };

    validate(Config { backend, database, remote, logging })
}

/// Load configuration from a file
///
/// If `path` is `None`, searches multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `DealDeskError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(DealDeskError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => search_config_paths().ok_or_else(|| {
            DealDeskError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| DealDeskError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path).and_then(validate)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => {
            toml::from_str(contents).map_err(|e| DealDeskError::Config(format!("Invalid TOML format: {}", e)))
        }
        "json" => serde_json::from_str(contents)
            .map_err(|e| DealDeskError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(DealDeskError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Check cross-field requirements that serde defaults cannot express.
fn validate(config: Config) -> Result<Config> {
    match (&config.backend, &config.remote) {
        (BackendKind::Rest, None) => {
            return Err(DealDeskError::Config("backend \"rest\" requires a [remote] section".into()));
        }
        (BackendKind::Rest, Some(remote)) if remote.base_url.trim().is_empty() || remote.api_key.trim().is_empty() => {
            return Err(DealDeskError::Config("remote base_url and api_key must not be empty".into()));
        }
        (BackendKind::Sqlite, _) if config.database.path.trim().is_empty() => {
            return Err(DealDeskError::Config("database path must not be empty".into()));
        }
        _ => {}
    }

    if config.database.pool_size == 0 {
        return Err(DealDeskError::Config("database pool_size must be at least 1".into()));
    }

    Ok(config)
}

/// Search multiple paths for configuration files
///
/// Searches for config files in the following locations (in order):
/// 1. Current working directory (`./config.{json,toml}`,
///    `./dealdesk.{json,toml}`)
/// 2. Parent directories (up to 2 levels)
/// 3. Relative to executable location
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn search_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_in(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_in(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidates_in(dir: &Path) -> Vec<PathBuf> {
    vec![
        dir.join("config.json"),
        dir.join("config.toml"),
        dir.join("dealdesk.json"),
        dir.join("dealdesk.toml"),
        dir.join("../config.json"),
        dir.join("../config.toml"),
        dir.join("../../config.json"),
        dir.join("../../config.toml"),
    ]
}

/// Get required environment variable
///
/// # Errors
/// Returns `DealDeskError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| DealDeskError::Config(format!("Missing required environment variable: {}", key)))
}

/// Parse an optional environment variable, falling back to `default` when unset.
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|e| DealDeskError::Config(format!("Invalid {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
