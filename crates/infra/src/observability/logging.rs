//! Process-wide tracing subscriber.
//!
//! `RUST_LOG` takes precedence over the configured level so a single run can
//! be made more verbose without touching the config file.

use dealdesk_domain::{DealDeskError, LoggingConfig, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter from `RUST_LOG`, else from the configured level.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .map_err(|e| DealDeskError::Config(format!("Invalid log level {:?}: {}", config.level, e)))
}

/// Install the global subscriber (plain or JSON lines).
///
/// # Errors
/// Returns `DealDeskError::Config` for an unparsable level and
/// `DealDeskError::Internal` when a global subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(config)?;

    let installed = if config.json {
        tracing_subscriber::registry().with(filter).with(fmt::layer().json()).try_init()
    } else {
        tracing_subscriber::registry().with(filter).with(fmt::layer()).try_init()
    };

    installed.map_err(|e| DealDeskError::Internal(format!("Failed to install tracing subscriber: {}", e)))
}
