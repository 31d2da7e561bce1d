//! SQLite Participant Repository Implementation

use async_trait::async_trait;
use canvas_core::{ColorLabel, ParticipantId};
use std::sync::Arc;

use crate::datastore::SqliteDatastore;
use crate::entities::ParticipantEntity;
use crate::error::StoreResult;
use crate::repos::ParticipantRepository;
use crate::sql;

/// SQLite implementation of ParticipantRepository
pub struct SqliteParticipantRepository {
    datastore: Arc<SqliteDatastore>,
}

impl SqliteParticipantRepository {
    /// Create a new repository
    pub fn new(datastore: Arc<SqliteDatastore>) -> Self {
        Self { datastore }
    }
}

#[async_trait]
impl ParticipantRepository for SqliteParticipantRepository {
    async fn get(&self, id: &ParticipantId) -> StoreResult<Option<ParticipantEntity>> {
        let id = id.clone();
        self.datastore
            .run(move |conn| sql::find_participant(conn, &id))
            .await
    }

    async fn count(&self) -> StoreResult<u64> {
        self.datastore
            .run(|conn| sql::count_participants(conn, false))
            .await
    }

    async fn count_revealed(&self) -> StoreResult<u64> {
        self.datastore
            .run(|conn| sql::count_participants(conn, true))
            .await
    }

    async fn used_colors(&self, label: ColorLabel) -> StoreResult<Vec<String>> {
        self.datastore
            .run(move |conn| sql::used_colors(conn, label))
            .await
    }

    async fn count_by_label(&self) -> StoreResult<Vec<(String, u64)>> {
        self.datastore.run(|conn| sql::count_by_label(conn)).await
    }
}
