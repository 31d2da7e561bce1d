//! Transport seam between the reconciler and the gateway

use async_trait::async_trait;
use canvas_core::{ColorLabel, LedgerSnapshot, ParticipantId};

use crate::api::{CanvasClient, PlacedMark, PlacementItem, RevealInfo, Submission};
use crate::error::ClientResult;

/// Operations the reconciliation layer needs from the ledger
#[async_trait]
pub trait PlacementTransport: Send + Sync {
    /// Create a participant for a palette label
    async fn create_participant(&self, label: ColorLabel) -> ClientResult<LedgerSnapshot>;

    /// Fetch the authoritative snapshot
    async fn get_participant(&self, id: &ParticipantId) -> ClientResult<LedgerSnapshot>;

    /// Submit an ordered batch of placements
    async fn submit(&self, id: &ParticipantId, items: &[PlacementItem])
        -> ClientResult<Submission>;

    /// Request the explicit reveal
    async fn reveal(&self, id: &ParticipantId) -> ClientResult<RevealInfo>;

    /// Fetch the full canvas
    async fn canvas(&self, id: &ParticipantId) -> ClientResult<Vec<PlacedMark>>;
}

#[async_trait]
impl PlacementTransport for CanvasClient {
    async fn create_participant(&self, label: ColorLabel) -> ClientResult<LedgerSnapshot> {
        CanvasClient::create_participant(self, label).await
    }

    async fn get_participant(&self, id: &ParticipantId) -> ClientResult<LedgerSnapshot> {
        CanvasClient::get_participant(self, id).await
    }

    async fn submit(
        &self,
        id: &ParticipantId,
        items: &[PlacementItem],
    ) -> ClientResult<Submission> {
        CanvasClient::submit(self, id, items).await
    }

    async fn reveal(&self, id: &ParticipantId) -> ClientResult<RevealInfo> {
        CanvasClient::reveal(self, id).await
    }

    async fn canvas(&self, id: &ParticipantId) -> ClientResult<Vec<PlacedMark>> {
        CanvasClient::canvas(self, id).await
    }
}
