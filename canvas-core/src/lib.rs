//! Canvas Core - Blind Canvas Ledger Domain
//!
//! Anonymous participants each claim a unique color and place a fixed quota of
//! free marks on a shared canvas before it is revealed to them. After reveal,
//! further marks are paid for with purchased credits.
//!
//! # Ledger Invariants
//!
//! | Invariant | Requirement |
//! |-----------|-------------|
//! | **Quota cap** | `free_quota_consumed` never exceeds the free quota limit |
//! | **Free count** | free placements stored for a participant == `free_quota_consumed` |
//! | **One-way reveal** | `revealed` flips false → true once and never reverts |
//! | **Credit conservation** | balance == grants − paid placements, never negative |
//! | **At-most-once** | one stored placement per `(participant, idempotency key)` |
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ canvas-client (optimistic render, batching)  │
//! ├──────────────────────────────────────────────┤
//! │ canvas-api    (Placement Gateway, axum)      │
//! ├──────────────────────────────────────────────┤
//! │ canvas-store  (Consumption Engine, SQLite)   │
//! ├──────────────────────────────────────────────┤
//! │ canvas-core   (types, quota rules, palette)  │
//! └──────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod palette;
pub mod quota;
pub mod types;

pub use error::{CanvasError, CanvasResult};
pub use quota::{Admission, QuotaPolicy, RevealCheck, DEFAULT_MAX_BATCH_SIZE, FREE_QUOTA_LIMIT};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_quota_limit() {
        assert_eq!(FREE_QUOTA_LIMIT, 10);
        assert_eq!(QuotaPolicy::default().free_quota_limit, FREE_QUOTA_LIMIT);
    }
}
