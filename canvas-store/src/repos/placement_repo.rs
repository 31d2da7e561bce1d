//! Placement Repository

use async_trait::async_trait;
use canvas_core::{IdempotencyKey, ParticipantId, Phase};

use crate::entities::PlacementEntity;
use crate::error::StoreResult;

/// Placement store repository trait (append-only, so read methods only)
#[async_trait]
pub trait PlacementRepository: Send + Sync {
    /// Placements owned by one participant, oldest first
    async fn list_for_participant(
        &self,
        participant_id: &ParticipantId,
    ) -> StoreResult<Vec<PlacementEntity>>;

    /// All placements on the canvas, oldest first
    async fn list_all(&self) -> StoreResult<Vec<PlacementEntity>>;

    /// Look up an accepted placement by idempotency key
    async fn find_by_key(
        &self,
        participant_id: &ParticipantId,
        key: &IdempotencyKey,
    ) -> StoreResult<Option<PlacementEntity>>;

    /// Placement count, optionally for one phase
    async fn count(&self, phase: Option<Phase>) -> StoreResult<u64>;
}
