//! Command execution helpers
//!
//! Every command runs through [`execute_logged`] so timing and outcome are
//! logged the same way everywhere.

use std::future::Future;
use std::time::Instant;

use dealdesk_domain::Result as DomainResult;

use crate::utils::logging::{error_label, log_command_execution};

/// Execute a command with automatic timing and outcome logging.
///
/// # Example
///
/// ```rust,ignore
/// pub async fn list_stages(ctx: &AppContext) -> DomainResult<Vec<Stage>> {
///     execute_logged("stages::list_stages", || async {
///         Ok(ctx.board().await.stages().to_vec())
///     })
///     .await
/// }
/// ```
pub async fn execute_logged<F, Fut, T>(command_name: &str, command_fn: F) -> DomainResult<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = DomainResult<T>>,
{
    let start = Instant::now();

    let result = command_fn().await;

    let error = result.as_ref().err().map(error_label);
    log_command_execution(command_name, start.elapsed(), error);

    result
}
