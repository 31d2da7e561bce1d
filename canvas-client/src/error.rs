//! Client Error Types

use canvas_core::{LedgerSnapshot, Phase};
use thiserror::Error;

use crate::api::PlacedMark;

/// Client-side errors
#[derive(Error, Debug)]
pub enum ClientError {
    /// Could not reach the gateway
    #[error("API connection error: {message}")]
    ConnectionError { message: String },

    /// HTTP client error
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Gateway reported a retryable storage fault
    #[error("Service unavailable: {message}")]
    Unavailable { message: String },

    /// Any other non-success response
    #[error("API request failed: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Participant unknown; the stored identity must be discarded
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// Request rejected before reaching the ledger
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Free quota exhausted
    #[error("Free quota exhausted")]
    QuotaExhausted {
        snapshot: Box<LedgerSnapshot>,
        accepted: Vec<PlacedMark>,
    },

    /// No spendable credits
    #[error("Insufficient credits")]
    InsufficientCredits {
        snapshot: Box<LedgerSnapshot>,
        accepted: Vec<PlacedMark>,
    },

    /// Explicit reveal below quota
    #[error("Free quota not yet met ({consumed}/{limit})")]
    QuotaNotMet { consumed: u32, limit: u32 },

    /// Canvas read before reveal
    #[error("Canvas is not revealed for this participant")]
    NotRevealed,

    /// Local estimate says there is nothing left to spend
    #[error("No {phase} capacity left")]
    NoCapacity { phase: Phase },

    /// Operation not allowed in the current session state
    #[error("Invalid session state: {state}")]
    InvalidState { state: String },
}

/// Client result type
pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        ClientError::ConnectionError {
            message: message.into(),
        }
    }

    /// Create an API error
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        ClientError::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        ClientError::Validation {
            message: message.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(state: impl std::fmt::Debug) -> Self {
        ClientError::InvalidState {
            state: format!("{:?}", state),
        }
    }

    /// Transport-level failures that may be retried with the same idempotency key
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::ConnectionError { .. } | ClientError::Unavailable { .. } => true,
            ClientError::HttpError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ClientError::ApiError { status, .. } => *status >= 500 || *status == 408,
            _ => false,
        }
    }

    /// Exit code for command-line use
    pub fn exit_code(&self) -> i32 {
        match self {
            ClientError::ConnectionError { .. } | ClientError::HttpError(_) => 3,
            ClientError::ApiError { .. } | ClientError::Unavailable { .. } => 4,
            ClientError::JsonError(_) => 6,
            ClientError::NotFound { .. } => 21,
            ClientError::Validation { .. } => 2,
            ClientError::QuotaExhausted { .. }
            | ClientError::InsufficientCredits { .. }
            | ClientError::NoCapacity { .. } => 40,
            ClientError::QuotaNotMet { .. } | ClientError::NotRevealed => 41,
            ClientError::InvalidState { .. } => 1,
        }
    }
}
