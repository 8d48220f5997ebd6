use std::time::Duration;

use dealdesk_domain::DealDeskError;
use tracing::{info, warn};

/// Log the outcome of a command execution with structured fields.
///
/// # Parameters
/// * `command` - Logical command identifier (e.g. `"board::move_opportunity"`).
/// * `elapsed` - Duration the command execution took.
/// * `error` - Stable error label when the command failed.
///
/// Callers must avoid forwarding sensitive values in `command`.
#[inline]
pub fn log_command_execution(command: &str, elapsed: Duration, error: Option<&'static str>) {
    let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

    match error {
        None => info!(command, duration_ms, "command_execution_success"),
        Some(error_label) => warn!(command, duration_ms, error_label, "command_execution_failure"),
    }
}

/// Convert a `DealDeskError` into a stable label suitable for logging.
#[inline]
pub fn error_label(error: &DealDeskError) -> &'static str {
    match error {
        DealDeskError::Validation(_) => "validation",
        DealDeskError::Persistence(_) => "persistence",
        DealDeskError::Conflict(_) => "conflict",
        DealDeskError::Database(_) => "database",
        DealDeskError::Network(_) => "network",
        DealDeskError::Auth(_) => "auth",
        DealDeskError::Config(_) => "config",
        DealDeskError::NotFound(_) => "not_found",
        DealDeskError::InvalidInput(_) => "invalid_input",
        DealDeskError::Internal(_) => "internal",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable_snake_case() {
        assert_eq!(error_label(&DealDeskError::Validation("title".into())), "validation");
        assert_eq!(error_label(&DealDeskError::NotFound("opp".into())), "not_found");
        assert_eq!(error_label(&DealDeskError::InvalidInput("stage".into())), "invalid_input");
    }
}
