//! Participant Repository

use async_trait::async_trait;
use canvas_core::{ColorLabel, ParticipantId};

use crate::entities::ParticipantEntity;
use crate::error::StoreResult;

/// Participant ledger repository trait
#[async_trait]
pub trait ParticipantRepository: Send + Sync {
    /// Get a participant by ID
    async fn get(&self, id: &ParticipantId) -> StoreResult<Option<ParticipantEntity>>;

    /// Total participants
    async fn count(&self) -> StoreResult<u64>;

    /// Participants that have been revealed
    async fn count_revealed(&self) -> StoreResult<u64>;

    /// Color values already taken within a label
    async fn used_colors(&self, label: ColorLabel) -> StoreResult<Vec<String>>;

    /// Allocated participants per label
    async fn count_by_label(&self) -> StoreResult<Vec<(String, u64)>>;
}
