//! CLI Error Types

use canvas_client::ClientError;
use thiserror::Error;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Gateway client error
    #[error(transparent)]
    Client(#[from] ClientError),

    /// JSON formatting error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Server error
    #[error("Server error: {message}")]
    ServerError { message: String },

    /// Database error
    #[error("Database error: {message}")]
    DatabaseError { message: String },
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        CliError::ConfigError {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_arg(message: impl Into<String>) -> Self {
        CliError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a server error
    pub fn server(message: impl Into<String>) -> Self {
        CliError::ServerError {
            message: message.into(),
        }
    }

    /// Create a database error
    pub fn database(message: impl Into<String>) -> Self {
        CliError::DatabaseError {
            message: message.into(),
        }
    }

    /// Get exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::ConfigError { .. } => 1,
            CliError::InvalidArgument { .. } => 2,
            CliError::Client(e) => e.exit_code(),
            CliError::JsonError(_) => 6,
            CliError::ServerError { .. } => 30,
            CliError::DatabaseError { .. } => 31,
        }
    }
}
