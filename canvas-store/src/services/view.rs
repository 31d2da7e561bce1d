//! Canvas View Service
//!
//! Reads of the placement store. The full canvas is gated on the requesting
//! participant's reveal flag; own placements are always readable.

use canvas_core::{CanvasError, LedgerSnapshot, ParticipantId, Placement};
use std::sync::Arc;

use crate::datastore::SqliteDatastore;
use crate::entities::PlacementEntity;
use crate::error::StoreResult;
use crate::sql;

/// Canvas view service
pub struct CanvasViewService {
    datastore: Arc<SqliteDatastore>,
}

impl CanvasViewService {
    /// Create a new service
    pub fn new(datastore: Arc<SqliteDatastore>) -> Self {
        Self { datastore }
    }

    /// Current ledger snapshot
    pub async fn snapshot(&self, participant_id: &ParticipantId) -> StoreResult<LedgerSnapshot> {
        let pid = participant_id.clone();
        self.datastore
            .run(move |conn| sql::load_participant(conn, &pid))
            .await?
            .to_snapshot()
    }

    /// Placements owned by the participant
    pub async fn list_own(&self, participant_id: &ParticipantId) -> StoreResult<Vec<Placement>> {
        let pid = participant_id.clone();
        let rows = self
            .datastore
            .run(move |conn| {
                sql::load_participant(conn, &pid)?;
                sql::list_for_participant(conn, &pid)
            })
            .await?;
        into_placements(rows)
    }

    /// Every placement on the canvas; `NotRevealed` for a blind requester
    pub async fn list_all(&self, participant_id: &ParticipantId) -> StoreResult<Vec<Placement>> {
        let pid = participant_id.clone();
        let rows = self
            .datastore
            .run(move |conn| {
                let requester = sql::load_participant(conn, &pid)?;
                if !requester.revealed {
                    return Err(CanvasError::NotRevealed {
                        participant_id: requester.id,
                    }
                    .into());
                }
                sql::list_all(conn)
            })
            .await?;
        into_placements(rows)
    }
}

fn into_placements(rows: Vec<PlacementEntity>) -> StoreResult<Vec<Placement>> {
    rows.into_iter().map(PlacementEntity::into_placement).collect()
}
