//! Canvas Error Codes Registry
//!
//! Error code format: CANVAS-{area}-{sequence}
//! - CANVAS-VAL: Validation failures (rejected before any ledger access)
//! - CANVAS-PART: Participant lookup and registration
//! - CANVAS-REVEAL: Reveal transition and reveal-gated reads
//! - CANVAS-CREDIT: Credit grants
//! - CANVAS-INFRA: Storage faults (retryable)
//!
//! Quota exhaustion and insufficient credits are deliberately absent: they are
//! business outcomes carried by [`crate::PlacementDecision`], not errors.

use thiserror::Error;

/// Canvas Result type
pub type CanvasResult<T> = Result<T, CanvasError>;

/// Canvas Error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CanvasError {
    // ============================================================
    // Validation Errors (CANVAS-VAL-*)
    // ============================================================
    /// [CANVAS-VAL-001] Coordinate outside the unit interval or not finite
    #[error("[CANVAS-VAL-001] Coordinate {axis} = {value} is outside [0, 1]")]
    CoordinateOutOfRange { axis: &'static str, value: String },

    /// [CANVAS-VAL-002] Unknown color label
    #[error("[CANVAS-VAL-002] Unknown color label {label}")]
    UnknownColorLabel { label: String },

    /// [CANVAS-VAL-003] Malformed idempotency key
    #[error("[CANVAS-VAL-003] Invalid idempotency key: {reason}")]
    InvalidIdempotencyKey { reason: String },

    /// [CANVAS-VAL-004] Batch is empty or too large
    #[error("[CANVAS-VAL-004] Invalid batch size {size} (allowed 1..={max})")]
    InvalidBatchSize { size: usize, max: usize },

    /// [CANVAS-VAL-005] Generic validation failure
    #[error("[CANVAS-VAL-005] Validation failed: {reason}")]
    Validation { reason: String },

    // ============================================================
    // Participant Errors (CANVAS-PART-*)
    // ============================================================
    /// [CANVAS-PART-001] Participant not found
    #[error("[CANVAS-PART-001] Participant {participant_id} not found")]
    ParticipantNotFound { participant_id: String },

    /// [CANVAS-PART-002] Color pool for a label has no free values
    #[error("[CANVAS-PART-002] Color pool {label} is exhausted")]
    ColorPoolExhausted { label: String },

    // ============================================================
    // Reveal Errors (CANVAS-REVEAL-*)
    // ============================================================
    /// [CANVAS-REVEAL-001] Explicit reveal requested before the free quota is used up
    #[error("[CANVAS-REVEAL-001] Free quota not yet met ({consumed}/{limit})")]
    QuotaNotMet { consumed: u32, limit: u32 },

    /// [CANVAS-REVEAL-002] Reveal-gated read by a blind participant
    #[error("[CANVAS-REVEAL-002] Participant {participant_id} has not been revealed")]
    NotRevealed { participant_id: String },

    // ============================================================
    // Credit Errors (CANVAS-CREDIT-*)
    // ============================================================
    /// [CANVAS-CREDIT-001] Grant amount must be positive
    #[error("[CANVAS-CREDIT-001] Invalid credit grant amount {amount}")]
    InvalidGrantAmount { amount: i64 },

    /// [CANVAS-CREDIT-002] Grant would push the balance past its maximum
    #[error("[CANVAS-CREDIT-002] Granting {amount} credits overflows balance {balance}")]
    CreditBalanceOverflow { balance: i64, amount: u32 },

    // ============================================================
    // Infrastructure Errors (CANVAS-INFRA-*)
    // ============================================================
    /// [CANVAS-INFRA-001] Storage fault, safe to retry
    #[error("[CANVAS-INFRA-001] Storage unavailable: {reason}")]
    StorageUnavailable { reason: String },

    /// [CANVAS-INFRA-002] Storage operation timed out, safe to retry
    #[error("[CANVAS-INFRA-002] Storage operation timed out after {millis}ms")]
    StorageTimeout { millis: u64 },
}

impl CanvasError {
    /// Create a generic validation error
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Create a participant not found error
    pub fn participant_not_found(participant_id: impl Into<String>) -> Self {
        Self::ParticipantNotFound {
            participant_id: participant_id.into(),
        }
    }

    /// Create a storage unavailable error
    pub fn storage(reason: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            reason: reason.into(),
        }
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::CoordinateOutOfRange { .. } => "CANVAS-VAL-001",
            Self::UnknownColorLabel { .. } => "CANVAS-VAL-002",
            Self::InvalidIdempotencyKey { .. } => "CANVAS-VAL-003",
            Self::InvalidBatchSize { .. } => "CANVAS-VAL-004",
            Self::Validation { .. } => "CANVAS-VAL-005",
            Self::ParticipantNotFound { .. } => "CANVAS-PART-001",
            Self::ColorPoolExhausted { .. } => "CANVAS-PART-002",
            Self::QuotaNotMet { .. } => "CANVAS-REVEAL-001",
            Self::NotRevealed { .. } => "CANVAS-REVEAL-002",
            Self::InvalidGrantAmount { .. } => "CANVAS-CREDIT-001",
            Self::CreditBalanceOverflow { .. } => "CANVAS-CREDIT-002",
            Self::StorageUnavailable { .. } => "CANVAS-INFRA-001",
            Self::StorageTimeout { .. } => "CANVAS-INFRA-002",
        }
    }

    /// Whether this error rejects the request before touching the ledger
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::CoordinateOutOfRange { .. }
                | Self::UnknownColorLabel { .. }
                | Self::InvalidIdempotencyKey { .. }
                | Self::InvalidBatchSize { .. }
                | Self::Validation { .. }
                | Self::InvalidGrantAmount { .. }
        )
    }

    /// Whether the caller may retry the same request unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StorageUnavailable { .. } | Self::StorageTimeout { .. }
        )
    }
}
