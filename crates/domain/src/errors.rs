//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for DealDesk
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum DealDeskError {
    /// A draft failed its save-time check. Shown inline, never as a notice.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A persistence adapter call failed at the board boundary.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The action collides with an action still in flight.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DealDeskError {
    /// Wrap an adapter failure for `operation` as a persistence error.
    ///
    /// Errors that are already persistence errors keep their message.
    pub fn persistence(operation: &str, source: Self) -> Self {
        match source {
            Self::Persistence(message) => Self::Persistence(message),
            other => Self::Persistence(format!("{operation} failed: {other}")),
        }
    }

    /// Returns true for errors produced by the save-time draft check.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result type alias for DealDesk operations
pub type Result<T> = std::result::Result<T, DealDeskError>;
