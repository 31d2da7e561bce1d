//! Participant Entity

use canvas_core::{ColorLabel, ColorValue, LedgerSnapshot, ParticipantId};
use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Column list matching [`ParticipantEntity::from_row`]
pub const PARTICIPANT_COLUMNS: &str = "id, color_label, color_value, free_quota_consumed, \
     revealed, credit_balance, created_at, revealed_at";

/// Participant ledger row
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParticipantEntity {
    /// Participant ID
    pub id: String,
    /// Color label as stored
    pub color_label: String,
    /// Allocated color value
    pub color_value: String,
    /// Free placements consumed
    pub free_quota_consumed: i64,
    /// Reveal flag
    pub revealed: bool,
    /// Spendable credits
    pub credit_balance: i64,
    /// Created at
    pub created_at: DateTime<Utc>,
    /// Set once by the reveal transition
    pub revealed_at: Option<DateTime<Utc>>,
}

impl ParticipantEntity {
    /// Create a fresh, blind participant
    pub fn new(id: ParticipantId, label: ColorLabel, color_value: ColorValue) -> Self {
        Self {
            id: id.0,
            color_label: label.as_str().to_string(),
            color_value: color_value.0,
            free_quota_consumed: 0,
            revealed: false,
            credit_balance: 0,
            created_at: Utc::now(),
            revealed_at: None,
        }
    }

    /// Map a row selected with [`PARTICIPANT_COLUMNS`]
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            color_label: row.get(1)?,
            color_value: row.get(2)?,
            free_quota_consumed: row.get(3)?,
            revealed: row.get(4)?,
            credit_balance: row.get(5)?,
            created_at: row.get(6)?,
            revealed_at: row.get(7)?,
        })
    }

    /// Convert to the public ledger snapshot
    pub fn to_snapshot(&self) -> StoreResult<LedgerSnapshot> {
        let color_label = self
            .color_label
            .parse::<ColorLabel>()
            .map_err(|e| StoreError::serialization(e.to_string()))?;

        Ok(LedgerSnapshot {
            id: ParticipantId::new(self.id.clone()),
            color_label,
            color_value: ColorValue::new(self.color_value.clone()),
            free_quota_consumed: to_counter("free_quota_consumed", self.free_quota_consumed)?,
            revealed: self.revealed,
            credit_balance: to_counter("credit_balance", self.credit_balance)?,
        })
    }
}

fn to_counter(field: &str, value: i64) -> StoreResult<u32> {
    u32::try_from(value)
        .map_err(|_| StoreError::serialization(format!("{} out of range: {}", field, value)))
}
