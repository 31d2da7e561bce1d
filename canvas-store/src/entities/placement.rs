//! Placement Entity

use canvas_core::{
    ColorValue, IdempotencyKey, ParticipantId, Phase, Placement, PlacementId, Position,
};
use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Column list matching [`PlacementEntity::from_row`]
pub const PLACEMENT_COLUMNS: &str =
    "seq, id, participant_id, x, y, color_value, phase, idempotency_key, created_at";

/// Placement row
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacementEntity {
    /// Insertion sequence, assigned by the store
    pub seq: i64,
    /// Placement ID
    pub id: String,
    /// Owning participant
    pub participant_id: String,
    pub x: f64,
    pub y: f64,
    /// Color copied from the participant
    pub color_value: String,
    /// `free` or `paid`
    pub phase: String,
    /// Client idempotency key
    pub idempotency_key: Option<String>,
    /// Created at
    pub created_at: DateTime<Utc>,
}

impl PlacementEntity {
    /// Create an unsaved placement row
    pub fn new(
        participant_id: &ParticipantId,
        position: Position,
        color_value: &str,
        phase: Phase,
        idempotency_key: Option<&IdempotencyKey>,
    ) -> Self {
        Self {
            seq: 0,
            id: PlacementId::generate().0,
            participant_id: participant_id.as_str().to_string(),
            x: position.x,
            y: position.y,
            color_value: color_value.to_string(),
            phase: phase.as_str().to_string(),
            idempotency_key: idempotency_key.map(|k| k.as_str().to_string()),
            created_at: Utc::now(),
        }
    }

    /// Map a row selected with [`PLACEMENT_COLUMNS`]
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            seq: row.get(0)?,
            id: row.get(1)?,
            participant_id: row.get(2)?,
            x: row.get(3)?,
            y: row.get(4)?,
            color_value: row.get(5)?,
            phase: row.get(6)?,
            idempotency_key: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    /// Whether this row was stored at the given position
    pub fn is_at(&self, position: &Position) -> bool {
        self.x == position.x && self.y == position.y
    }

    /// Convert to the domain placement
    pub fn into_placement(self) -> StoreResult<Placement> {
        let phase = self
            .phase
            .parse::<Phase>()
            .map_err(|e| StoreError::serialization(e.to_string()))?;

        Ok(Placement {
            id: PlacementId::new(self.id),
            participant_id: ParticipantId::new(self.participant_id),
            position: Position {
                x: self.x,
                y: self.y,
            },
            color_value: ColorValue::new(self.color_value),
            phase,
            idempotency_key: self.idempotency_key.map(IdempotencyKey::new),
            created_at: self.created_at,
        })
    }
}
