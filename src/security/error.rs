use thiserror::Error;

use crate::database::DatabaseError;
use crate::security::gate::GateError;

/// Errors raised by the security-level core
#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("{0}")]
    MissingData(String),

    #[error("{0}")]
    InvalidData(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("Permission check failed: {0}")]
    PermissionService(#[from] GateError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl SecurityError {
    pub fn missing(field: &str) -> Self {
        SecurityError::MissingData(format!("Missing {}", field))
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        SecurityError::InvalidData(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        SecurityError::NotFound(message.into())
    }
}
