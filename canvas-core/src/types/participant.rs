//! Participant ledger types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::common::ParticipantId;
use crate::error::CanvasError;

/// Color category chosen at session start
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorLabel {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
    Pink,
    Brown,
}

impl ColorLabel {
    /// All labels, in display order
    pub const ALL: [ColorLabel; 8] = [
        ColorLabel::Red,
        ColorLabel::Orange,
        ColorLabel::Yellow,
        ColorLabel::Green,
        ColorLabel::Blue,
        ColorLabel::Purple,
        ColorLabel::Pink,
        ColorLabel::Brown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Orange => "orange",
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Purple => "purple",
            Self::Pink => "pink",
            Self::Brown => "brown",
        }
    }
}

impl fmt::Display for ColorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorLabel {
    type Err = CanvasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|label| label.as_str() == normalized)
            .ok_or(CanvasError::UnknownColorLabel {
                label: s.to_string(),
            })
    }
}

/// Concrete color drawn from a label's pool, formatted `#rrggbb`
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorValue(pub String);

impl ColorValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self(format!("#{:02x}{:02x}{:02x}", r, g, b))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Authoritative participant state returned by every mutating call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Participant ID
    pub id: ParticipantId,
    /// Chosen color label
    pub color_label: ColorLabel,
    /// Assigned color value
    pub color_value: ColorValue,
    /// Free placements consumed so far
    pub free_quota_consumed: u32,
    /// Whether the canvas has been revealed to this participant
    pub revealed: bool,
    /// Purchased credits remaining
    pub credit_balance: u32,
}

impl LedgerSnapshot {
    /// Free placements left under the given limit
    pub fn free_quota_remaining(&self, limit: u32) -> u32 {
        limit.saturating_sub(self.free_quota_consumed)
    }

    /// Whether the free quota is used up
    pub fn free_quota_exhausted(&self, limit: u32) -> bool {
        self.free_quota_consumed >= limit
    }
}
