//! API Error Types
//!
//! Maps engine decisions and store faults onto HTTP statuses. Quota
//! rejections carry the authoritative snapshot in `details`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use canvas_core::{CanvasError, LedgerSnapshot};
use canvas_store::StoreError;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::dto::PlacementDto;

/// API-specific errors
#[derive(Error, Debug)]
pub enum ApiError {
    /// Validation error
    #[error("Validation error: {message}")]
    ValidationError { message: String },

    /// Resource not found
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    /// Unauthorized access
    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: String },

    /// Reveal-gated read by a blind participant
    #[error("Participant {participant_id} has not been revealed")]
    NotRevealed { participant_id: String },

    /// No free capacity left
    #[error("Free quota exhausted")]
    QuotaExhausted {
        snapshot: Box<LedgerSnapshot>,
        accepted: Vec<PlacementDto>,
    },

    /// No spendable credits
    #[error("Insufficient credits")]
    InsufficientCredits {
        snapshot: Box<LedgerSnapshot>,
        accepted: Vec<PlacementDto>,
    },

    /// Explicit reveal below quota
    #[error("Free quota not yet met ({consumed}/{limit})")]
    QuotaNotMet { consumed: u32, limit: u32 },

    /// No colors left for a label
    #[error("Color pool {label} is exhausted")]
    ColorPoolExhausted { label: String },

    /// Retryable storage fault
    #[error("Service unavailable: {reason}")]
    ServiceUnavailable { reason: String },

    /// Internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code
    pub code: String,
    /// Error message
    pub message: String,
    /// Optional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::NotRevealed { .. } => StatusCode::FORBIDDEN,
            ApiError::QuotaExhausted { .. } => StatusCode::CONFLICT,
            ApiError::InsufficientCredits { .. } => StatusCode::PAYMENT_REQUIRED,
            ApiError::QuotaNotMet { .. } => StatusCode::CONFLICT,
            ApiError::ColorPoolExhausted { .. } => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::NotFound { .. } => "NOT_FOUND",
            ApiError::Unauthorized { .. } => "UNAUTHORIZED",
            ApiError::NotRevealed { .. } => "NOT_REVEALED",
            ApiError::QuotaExhausted { .. } => "QUOTA_EXHAUSTED",
            ApiError::InsufficientCredits { .. } => "INSUFFICIENT_CREDITS",
            ApiError::QuotaNotMet { .. } => "QUOTA_NOT_MET",
            ApiError::ColorPoolExhausted { .. } => "COLOR_POOL_EXHAUSTED",
            ApiError::ServiceUnavailable { .. } => "STORE_UNAVAILABLE",
            ApiError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Structured details for the response body
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            ApiError::QuotaExhausted { snapshot, accepted }
            | ApiError::InsufficientCredits { snapshot, accepted } => {
                Some(json!({ "snapshot": snapshot, "accepted": accepted }))
            }
            ApiError::QuotaNotMet { consumed, limit } => {
                Some(json!({ "consumed": consumed, "limit": limit }))
            }
            ApiError::ServiceUnavailable { .. } => Some(json!({ "retryable": true })),
            _ => None,
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        ApiError::NotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal {
            message: message.into(),
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        ApiError::Unauthorized {
            reason: reason.into(),
        }
    }

    /// Quota rejection with the snapshot and any items applied before it
    pub fn quota_exhausted(snapshot: LedgerSnapshot, accepted: Vec<PlacementDto>) -> Self {
        ApiError::QuotaExhausted {
            snapshot: Box::new(snapshot),
            accepted,
        }
    }

    /// Credit rejection with the snapshot and any items applied before it
    pub fn insufficient_credits(snapshot: LedgerSnapshot, accepted: Vec<PlacementDto>) -> Self {
        ApiError::InsufficientCredits {
            snapshot: Box::new(snapshot),
            accepted,
        }
    }
}

impl From<CanvasError> for ApiError {
    fn from(err: CanvasError) -> Self {
        match err {
            CanvasError::ParticipantNotFound { participant_id } => {
                ApiError::not_found("Participant", participant_id)
            }
            CanvasError::ColorPoolExhausted { label } => ApiError::ColorPoolExhausted { label },
            CanvasError::QuotaNotMet { consumed, limit } => ApiError::QuotaNotMet { consumed, limit },
            CanvasError::NotRevealed { participant_id } => ApiError::NotRevealed { participant_id },
            err if err.is_retryable() => ApiError::ServiceUnavailable {
                reason: err.to_string(),
            },
            err => ApiError::validation(err.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Domain(domain) => domain.into(),
            err if err.is_retryable() => {
                tracing::warn!(error = %err, "Store fault surfaced as retryable");
                ApiError::ServiceUnavailable {
                    reason: err.to_string(),
                }
            }
            err => {
                tracing::error!(error = %err, "Store failure");
                ApiError::internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        crate::metrics::record_error(self.error_code());

        let error_response = ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        };

        (status, Json(error_response)).into_response()
    }
}
