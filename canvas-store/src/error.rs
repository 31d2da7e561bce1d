//! Canvas Store Error Types

use canvas_core::CanvasError;
use thiserror::Error;

/// Canvas Store Result type
pub type StoreResult<T> = Result<T, StoreError>;

/// Canvas Store Error
#[derive(Debug, Error)]
pub enum StoreError {
    /// Domain rule violation (validation, not found, reveal gating)
    #[error(transparent)]
    Domain(#[from] CanvasError),

    /// Database is locked by another writer
    #[error("Database busy: {0}")]
    Busy(String),

    /// Operation exceeded the configured timeout
    #[error("Operation timed out after {millis}ms")]
    Timeout { millis: u64 },

    /// Constraint violation not covered by a domain rule
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Serialization / row mapping error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the caller may retry the same request unchanged.
    ///
    /// Domain errors are decisions, not faults, and are never retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Domain(err) => err.is_retryable(),
            Self::Busy(_) | Self::Timeout { .. } | Self::Database(_) | Self::Connection(_) => true,
            Self::Constraint(_) | Self::Serialization(_) | Self::Internal(_) => false,
        }
    }

    /// Domain error, if this is one
    pub fn as_domain(&self) -> Option<&CanvasError> {
        match self {
            Self::Domain(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        match &err {
            rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => Self::Busy(err.to_string()),
                ErrorCode::ConstraintViolation => Self::Constraint(err.to_string()),
                ErrorCode::CannotOpen => Self::Connection(err.to_string()),
                _ => Self::Database(err.to_string()),
            },
            rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::IntegralValueOutOfRange(..) => Self::Serialization(err.to_string()),
            _ => Self::Database(err.to_string()),
        }
    }
}

impl From<StoreError> for CanvasError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Domain(inner) => inner,
            StoreError::Timeout { millis } => CanvasError::StorageTimeout { millis },
            other => CanvasError::storage(other.to_string()),
        }
    }
}
