//! SQLite Placement Repository Implementation

use async_trait::async_trait;
use canvas_core::{IdempotencyKey, ParticipantId, Phase};
use std::sync::Arc;

use crate::datastore::SqliteDatastore;
use crate::entities::PlacementEntity;
use crate::error::StoreResult;
use crate::repos::PlacementRepository;
use crate::sql;

/// SQLite implementation of PlacementRepository
pub struct SqlitePlacementRepository {
    datastore: Arc<SqliteDatastore>,
}

impl SqlitePlacementRepository {
    /// Create a new repository
    pub fn new(datastore: Arc<SqliteDatastore>) -> Self {
        Self { datastore }
    }
}

#[async_trait]
impl PlacementRepository for SqlitePlacementRepository {
    async fn list_for_participant(
        &self,
        participant_id: &ParticipantId,
    ) -> StoreResult<Vec<PlacementEntity>> {
        let participant_id = participant_id.clone();
        self.datastore
            .run(move |conn| sql::list_for_participant(conn, &participant_id))
            .await
    }

    async fn list_all(&self) -> StoreResult<Vec<PlacementEntity>> {
        self.datastore.run(|conn| sql::list_all(conn)).await
    }

    async fn find_by_key(
        &self,
        participant_id: &ParticipantId,
        key: &IdempotencyKey,
    ) -> StoreResult<Option<PlacementEntity>> {
        let participant_id = participant_id.clone();
        let key = key.clone();
        self.datastore
            .run(move |conn| sql::find_placement_by_key(conn, &participant_id, &key))
            .await
    }

    async fn count(&self, phase: Option<Phase>) -> StoreResult<u64> {
        self.datastore
            .run(move |conn| sql::count_placements(conn, phase))
            .await
    }
}
