//! Domain error taxonomy
//!
//! Every fallible domain operation returns `Result<T>`. Variants map to the
//! kinds the catalog store, download lifecycle, and capability clients
//! raise; the facade (`gatherarr-api`) maps these onto HTTP status codes.

use thiserror::Error;

#[cfg(feature = "postgres")]
use sqlx;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("not found: {resource}")]
    NotFound { resource: String },

    #[error("duplicate: {resource}")]
    Duplicate { resource: String },

    #[error("constraint violation: {message}")]
    Constraint { message: String },

    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("download not found on client: {client_id}")]
    DownloadNotFound { client_id: String },

    #[error("download client unavailable: {service} - {message}")]
    ClientUnavailable { service: String, message: String },

    #[error("invalid API key")]
    InvalidApiKey,

    #[error("validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("external service error: {service} - {error}")]
    ExternalServiceError { service: String, error: String },

    #[error("network error calling {service}: {message}")]
    NetworkError { service: String, message: String },

    #[error("timeout during {operation}")]
    Timeout { operation: String },

    #[error("temporary error: {message}")]
    TemporaryError { message: String },

    #[error("circuit breaker open for {service}")]
    CircuitBreakerOpen { service: String },

    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetryExhausted {
        operation: String,
        attempts: u32,
        #[source]
        last_error: Box<CoreError>,
    },

    #[error("database error: {message}")]
    Database { message: String },

    #[error("configuration error: {field} - {message}")]
    Configuration { field: String, message: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => CoreError::NotFound {
                resource: "row".to_string(),
            },
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    CoreError::Duplicate {
                        resource: db_err.message().to_string(),
                    }
                } else if db_err.is_foreign_key_violation() || db_err.is_check_violation() {
                    CoreError::Constraint {
                        message: db_err.message().to_string(),
                    }
                } else {
                    CoreError::Database {
                        message: err.to_string(),
                    }
                }
            }
            _ => CoreError::Database {
                message: err.to_string(),
            },
        }
    }
}

impl CoreError {
    /// Whether this error is the capability-side "task is gone" signal the
    /// reconciler treats as orphan detection.
    pub fn is_download_not_found(&self) -> bool {
        matches!(self, CoreError::DownloadNotFound { .. })
    }
}
