//! Placement types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::common::{IdempotencyKey, ParticipantId, PlacementId};
use super::participant::{ColorValue, LedgerSnapshot};
use crate::error::{CanvasError, CanvasResult};

/// Canvas position, both coordinates in the closed unit interval
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Create a validated position. Out-of-range values are rejected, never clamped.
    pub fn new(x: f64, y: f64) -> CanvasResult<Self> {
        let position = Self { x, y };
        position.validate()?;
        Ok(position)
    }

    /// Check both coordinates
    pub fn validate(&self) -> CanvasResult<()> {
        check_coordinate("x", self.x)?;
        check_coordinate("y", self.y)
    }
}

fn check_coordinate(axis: &'static str, value: f64) -> CanvasResult<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(CanvasError::CoordinateOutOfRange {
            axis,
            value: value.to_string(),
        })
    }
}

/// Which ledger field paid for a placement
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Debited from the free quota
    Free,
    /// Debited from the credit balance
    Paid,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Paid => "paid",
        }
    }

    /// Phase implied by a participant's reveal state
    pub fn for_revealed(revealed: bool) -> Self {
        if revealed {
            Self::Paid
        } else {
            Self::Free
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = CanvasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Self::Free),
            "paid" => Ok(Self::Paid),
            other => Err(CanvasError::validation(format!("unknown phase {}", other))),
        }
    }
}

/// Accepted mark on the canvas
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Placement ID
    pub id: PlacementId,
    /// Owning participant
    pub participant_id: ParticipantId,
    /// Position on the canvas
    #[serde(flatten)]
    pub position: Position,
    /// Color copied from the participant at insertion time
    pub color_value: ColorValue,
    /// Which ledger field was debited
    pub phase: Phase,
    /// Client-supplied idempotency key
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub idempotency_key: Option<IdempotencyKey>,
    /// Insertion timestamp
    pub created_at: DateTime<Utc>,
}

/// One proposed placement, as handed to the consumption engine
#[derive(Clone, Debug, PartialEq)]
pub struct PlacementRequest {
    /// Proposed position (validated by the engine before any ledger access)
    pub position: Position,
    /// Optional idempotency key
    pub idempotency_key: Option<IdempotencyKey>,
    /// Phase the caller expects to be charged; `None` follows the ledger state
    pub phase_hint: Option<Phase>,
}

impl PlacementRequest {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            idempotency_key: None,
            phase_hint: None,
        }
    }

    pub fn with_key(mut self, key: IdempotencyKey) -> Self {
        self.idempotency_key = Some(key);
        self
    }

    pub fn with_phase_hint(mut self, phase: Phase) -> Self {
        self.phase_hint = Some(phase);
        self
    }
}

/// Outcome label of a consumption attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementOutcome {
    Accepted,
    Replayed,
    QuotaExhausted,
    InsufficientCredits,
}

impl PlacementOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Replayed => "replayed",
            Self::QuotaExhausted => "quota_exhausted",
            Self::InsufficientCredits => "insufficient_credits",
        }
    }
}

/// Decision of the quota consumption engine for a single placement
///
/// Every variant carries the authoritative ledger snapshot taken inside the
/// deciding transaction.
#[derive(Clone, Debug, PartialEq)]
pub enum PlacementDecision {
    /// Newly accepted; the ledger was debited
    Accepted {
        placement: Placement,
        snapshot: LedgerSnapshot,
    },
    /// The idempotency key was already applied; nothing was debited
    Replayed {
        placement: Placement,
        snapshot: LedgerSnapshot,
    },
    /// No free capacity left
    QuotaExhausted { snapshot: LedgerSnapshot },
    /// No credits left
    InsufficientCredits { snapshot: LedgerSnapshot },
}

impl PlacementDecision {
    pub fn snapshot(&self) -> &LedgerSnapshot {
        match self {
            Self::Accepted { snapshot, .. }
            | Self::Replayed { snapshot, .. }
            | Self::QuotaExhausted { snapshot }
            | Self::InsufficientCredits { snapshot } => snapshot,
        }
    }

    pub fn placement(&self) -> Option<&Placement> {
        match self {
            Self::Accepted { placement, .. } | Self::Replayed { placement, .. } => Some(placement),
            Self::QuotaExhausted { .. } | Self::InsufficientCredits { .. } => None,
        }
    }

    /// Accepted now or previously
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Accepted { .. } | Self::Replayed { .. })
    }

    pub fn outcome(&self) -> PlacementOutcome {
        match self {
            Self::Accepted { .. } => PlacementOutcome::Accepted,
            Self::Replayed { .. } => PlacementOutcome::Replayed,
            Self::QuotaExhausted { .. } => PlacementOutcome::QuotaExhausted,
            Self::InsufficientCredits { .. } => PlacementOutcome::InsufficientCredits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_bounds_are_inclusive() {
        assert!(Position::new(0.0, 0.0).is_ok());
        assert!(Position::new(1.0, 1.0).is_ok());
        assert!(Position::new(0.5, 0.25).is_ok());
    }

    #[test]
    fn test_position_rejects_out_of_range() {
        let err = Position::new(1.5, 0.5).unwrap_err();
        assert!(matches!(err, CanvasError::CoordinateOutOfRange { axis: "x", .. }));

        let err = Position::new(0.5, -0.01).unwrap_err();
        assert!(matches!(err, CanvasError::CoordinateOutOfRange { axis: "y", .. }));
    }

    #[test]
    fn test_position_rejects_non_finite() {
        assert!(Position::new(f64::NAN, 0.5).is_err());
        assert!(Position::new(0.5, f64::INFINITY).is_err());
    }

    #[test]
    fn test_phase_round_trip_names() {
        assert_eq!("free".parse::<Phase>().unwrap(), Phase::Free);
        assert_eq!(Phase::Paid.to_string(), "paid");
        assert!("gratis".parse::<Phase>().is_err());
        assert_eq!(Phase::for_revealed(true), Phase::Paid);
    }

    #[test]
    fn test_placement_json_flattens_position() {
        let placement = Placement {
            id: PlacementId::new("pl1"),
            participant_id: ParticipantId::new("p1"),
            position: Position { x: 0.25, y: 0.75 },
            color_value: ColorValue::new("#112233"),
            phase: Phase::Free,
            idempotency_key: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&placement).unwrap();
        assert_eq!(json["x"], 0.25);
        assert_eq!(json["y"], 0.75);
        assert_eq!(json["phase"], "free");
        assert!(json.get("idempotency_key").is_none());
    }
}
