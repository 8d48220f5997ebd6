//! Conversions from external infrastructure errors into domain errors.

use dealdesk_domain::DealDeskError;
use reqwest::{Error as HttpError, StatusCode};
use rusqlite::Error as SqlError;
use tokio::task::JoinError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub DealDeskError);

impl From<InfraError> for DealDeskError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<DealDeskError> for InfraError {
    fn from(value: DealDeskError) -> Self {
        InfraError(value)
    }
}

trait IntoDealDeskError {
    fn into_dealdesk(self) -> DealDeskError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → DealDeskError */
/* -------------------------------------------------------------------------- */

impl IntoDealDeskError for SqlError {
    fn into_dealdesk(self) -> DealDeskError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => DealDeskError::Database("database is busy".into()),
                    (ErrorCode::DatabaseLocked, _) => {
                        DealDeskError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067) => {
                        DealDeskError::Database(format!("unique constraint violation: {message}"))
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        DealDeskError::Database(format!("foreign key constraint violation: {message}"))
                    }
                    (ErrorCode::ConstraintViolation, _) => {
                        DealDeskError::Database(format!("constraint violation: {message}"))
                    }
                    _ => DealDeskError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => DealDeskError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                DealDeskError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, name, ty) => {
                DealDeskError::Database(format!("invalid column type for {name}: {ty}"))
            }
            RE::InvalidPath(path) => {
                DealDeskError::Database(format!("invalid database path: {}", path.to_string_lossy()))
            }
            other => DealDeskError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_dealdesk())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → DealDeskError */
/* -------------------------------------------------------------------------- */

impl IntoDealDeskError for r2d2::Error {
    fn into_dealdesk(self) -> DealDeskError {
        DealDeskError::Database(format!("failed to acquire database connection: {self}"))
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(value.into_dealdesk())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → DealDeskError */
/* -------------------------------------------------------------------------- */

impl IntoDealDeskError for HttpError {
    fn into_dealdesk(self) -> DealDeskError {
        if self.is_timeout() {
            return DealDeskError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return DealDeskError::Network("HTTP connection failure".into());
        }

        if self.is_decode() {
            return DealDeskError::Network(format!("invalid response body: {self}"));
        }

        if let Some(status) = self.status() {
            return status_error(status, None);
        }

        DealDeskError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_dealdesk())
    }
}

/* -------------------------------------------------------------------------- */
/* HTTP status → DealDeskError */
/* -------------------------------------------------------------------------- */

/// Map a non-success HTTP status (plus an optional server message) onto the
/// domain error.
pub fn status_error(status: StatusCode, detail: Option<&str>) -> DealDeskError {
    let code = status.as_u16();
    let mut message = format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));
    if let Some(detail) = detail.map(str::trim).filter(|d| !d.is_empty()) {
        message.push_str(": ");
        message.push_str(detail);
    }

    match code {
        401 | 403 => DealDeskError::Auth(message),
        404 => DealDeskError::NotFound(message),
        429 => DealDeskError::Network(message),
        400..=499 => DealDeskError::InvalidInput(message),
        _ => DealDeskError::Network(message),
    }
}

/// Shorthand for `rusqlite::Error` → domain error at call sites.
pub fn map_sql_error(err: SqlError) -> DealDeskError {
    InfraError::from(err).into()
}

pub fn map_pool_error(err: r2d2::Error) -> DealDeskError {
    InfraError::from(err).into()
}

/// Convert a failed `spawn_blocking` join into the domain error.
pub fn map_join_error(err: JoinError) -> DealDeskError {
    if err.is_cancelled() {
        DealDeskError::Internal("blocking database task was cancelled".into())
    } else {
        DealDeskError::Internal(format!("blocking database task panicked: {err}"))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
