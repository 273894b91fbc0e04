//! Infrastructure error handling
//!
//! Converts storage-layer failures into the domain's own error taxonomy so
//! callers above this crate never see `sqlx`/`serde_json` types directly.

use gatherarr_core::error::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InfrastructureError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("UUID parsing error: {0}")]
    UuidParsing(#[from] uuid::Error),
}

impl From<InfrastructureError> for CoreError {
    fn from(err: InfrastructureError) -> Self {
        match err {
            InfrastructureError::Database(sqlx_err) => sqlx_err.into(),
            InfrastructureError::Pool(msg) => CoreError::Database { message: msg },
            InfrastructureError::Migration(msg) => CoreError::Configuration {
                field: "database_migration".to_string(),
                message: msg,
            },
            InfrastructureError::Serialization(err) => CoreError::Validation {
                field: "json_data".to_string(),
                message: err.to_string(),
            },
            InfrastructureError::UuidParsing(err) => CoreError::Validation {
                field: "uuid".to_string(),
                message: err.to_string(),
            },
        }
    }
}
