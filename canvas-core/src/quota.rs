//! Quota Rules
//!
//! Pure admission rules for the participant ledger. The store applies the
//! same predicates as conditional updates; this module decides which update
//! to attempt and how to label the outcome.

use serde::{Deserialize, Serialize};

use crate::error::{CanvasError, CanvasResult};
use crate::types::{LedgerSnapshot, Phase};

/// Free placements allowed before reveal
pub const FREE_QUOTA_LIMIT: u32 = 10;

/// Default upper bound on items in one batch request
pub const DEFAULT_MAX_BATCH_SIZE: usize = 50;

/// Quota policy
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaPolicy {
    /// Free placements per participant
    pub free_quota_limit: u32,
    /// Max items accepted in one batch request
    pub max_batch_size: usize,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            free_quota_limit: FREE_QUOTA_LIMIT,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

/// What the ledger should do with one proposed placement
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Debit one unit of free quota. The conditional update decides whether
    /// this unit also flips the reveal flag.
    DebitFree,
    /// Debit one credit
    DebitCredit,
    /// Reject: no free capacity
    RejectQuotaExhausted,
    /// Reject: no spendable credits
    RejectInsufficientCredits,
}

/// Result of an explicit reveal check
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevealCheck {
    /// Already revealed; the request is a no-op
    AlreadyRevealed,
    /// Quota met, the transition may be applied
    Eligible,
}

impl QuotaPolicy {
    /// Phase a request is evaluated under
    pub fn effective_phase(&self, snapshot: &LedgerSnapshot, hint: Option<Phase>) -> Phase {
        hint.unwrap_or_else(|| Phase::for_revealed(snapshot.revealed))
    }

    /// Decide admission for one placement against a ledger snapshot.
    ///
    /// A free request against a revealed ledger is exhausted, never silently
    /// charged a credit. Credits are only spendable once revealed.
    pub fn admit(&self, snapshot: &LedgerSnapshot, hint: Option<Phase>) -> Admission {
        match self.effective_phase(snapshot, hint) {
            Phase::Free => {
                if snapshot.revealed || snapshot.free_quota_consumed >= self.free_quota_limit {
                    Admission::RejectQuotaExhausted
                } else {
                    Admission::DebitFree
                }
            }
            Phase::Paid => {
                if snapshot.revealed && snapshot.credit_balance > 0 {
                    Admission::DebitCredit
                } else {
                    Admission::RejectInsufficientCredits
                }
            }
        }
    }

    /// Check whether an explicit reveal may proceed
    pub fn check_reveal(&self, snapshot: &LedgerSnapshot) -> CanvasResult<RevealCheck> {
        if snapshot.revealed {
            return Ok(RevealCheck::AlreadyRevealed);
        }
        if snapshot.free_quota_consumed >= self.free_quota_limit {
            Ok(RevealCheck::Eligible)
        } else {
            Err(CanvasError::QuotaNotMet {
                consumed: snapshot.free_quota_consumed,
                limit: self.free_quota_limit,
            })
        }
    }

    /// Validate the number of items in a batch
    pub fn validate_batch_size(&self, size: usize) -> CanvasResult<()> {
        if size == 0 || size > self.max_batch_size {
            return Err(CanvasError::InvalidBatchSize {
                size,
                max: self.max_batch_size,
            });
        }
        Ok(())
    }
}
