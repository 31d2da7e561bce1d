//! Reconciler facade
//!
//! Owns the session, the submission queue and the transport. All ledger
//! responses are applied on the caller's task through [`Reconciler::next_events`],
//! so session state has a single writer.

use canvas_core::{ColorLabel, IdempotencyKey, ParticipantId, FREE_QUOTA_LIMIT};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::api::StatsInfo;
use crate::error::{ClientError, ClientResult};
use crate::queue::{BatchResult, SubmissionPolicy, SubmissionQueue};
use crate::retry::RetryPolicy;
use crate::session::{ReconcileEvent, Session};
use crate::transport::PlacementTransport;

/// Reconciler settings
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub free_quota_limit: u32,
    pub submission: SubmissionPolicy,
    pub retry: RetryPolicy,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            free_quota_limit: FREE_QUOTA_LIMIT,
            submission: SubmissionPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ReconcilerConfig {
    /// Adopt the gateway's quota limit and batch cap
    pub fn with_server_policy(mut self, stats: &StatsInfo) -> Self {
        self.free_quota_limit = stats.free_quota_limit;
        self.submission.max_batch = self.submission.max_batch.min(stats.max_batch_size.max(1));
        self
    }
}

/// Client reconciliation layer for one participant session
pub struct Reconciler {
    transport: Arc<dyn PlacementTransport>,
    config: ReconcilerConfig,
    session: Session,
    queue: Option<SubmissionQueue>,
    results: Option<mpsc::UnboundedReceiver<BatchResult>>,
}

impl Reconciler {
    pub fn new(transport: Arc<dyn PlacementTransport>, config: ReconcilerConfig) -> Self {
        let session = Session::new(config.free_quota_limit);
        Self {
            transport,
            config,
            session,
            queue: None,
            results: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// First load, optionally restoring a stored identity
    ///
    /// An identity the ledger no longer knows is discarded and the session
    /// asks for a new one.
    pub async fn start(
        &mut self,
        stored: Option<ParticipantId>,
    ) -> ClientResult<Vec<ReconcileEvent>> {
        let Some(id) = stored else {
            return self.session.begin(None);
        };

        match self.transport.get_participant(&id).await {
            Ok(snapshot) => {
                let mut events = self.session.begin(Some(snapshot))?;
                self.open_queue()?;
                events.extend(self.load_canvas_if_needed().await);
                Ok(events)
            }
            Err(ClientError::NotFound { .. }) => {
                info!(participant_id = %id, "Stored identity unknown, selecting a new one");
                self.session.begin(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Create a participant for the chosen color
    pub async fn join(&mut self, label: ColorLabel) -> ClientResult<Vec<ReconcileEvent>> {
        let snapshot = self.transport.create_participant(label).await?;
        let mut events = self.session.assign_identity(snapshot)?;
        self.open_queue()?;
        events.extend(self.load_canvas_if_needed().await);
        Ok(events)
    }

    /// Render a provisional mark and queue it for submission
    pub fn place(&mut self, x: f64, y: f64) -> ClientResult<IdempotencyKey> {
        let queue = self
            .queue
            .as_ref()
            .ok_or_else(|| ClientError::invalid_state(self.session.state()))?;
        let item = self.session.propose(x, y)?;
        let key = IdempotencyKey::new(item.idempotency_key.clone());

        if let Err(e) = queue.enqueue(item) {
            self.session.fail(std::slice::from_ref(&key), &e);
            return Err(e);
        }
        Ok(key)
    }

    /// Wait for the next resolved batch and apply it
    ///
    /// Returns `None` when nothing is queued and the queue has been closed.
    pub async fn next_events(&mut self) -> Option<Vec<ReconcileEvent>> {
        let result = self.results.as_mut()?.recv().await?;
        Some(self.apply(result).await)
    }

    /// Flush the queue, apply every outstanding result, then reopen the queue
    pub async fn settle(&mut self) -> ClientResult<Vec<ReconcileEvent>> {
        if let Some(queue) = self.queue.take() {
            queue.close().await;
        }

        let mut events = Vec::new();
        while let Some(batch) = self.next_events().await {
            events.extend(batch);
        }
        self.results = None;
        if self.session.participant_id().is_some() {
            self.open_queue()?;
        }
        Ok(events)
    }

    /// Explicit reveal once the user believes the quota is used up
    pub async fn reveal(&mut self) -> ClientResult<Vec<ReconcileEvent>> {
        let id = self.participant_id()?;
        let info = match self.transport.reveal(&id).await {
            Ok(info) => info,
            Err(ClientError::NotFound { .. }) => return Ok(self.discard_identity().await),
            Err(e) => return Err(e),
        };
        let mut events = self.session.adopt(info.snapshot);
        events.extend(self.load_canvas_if_needed().await);
        Ok(events)
    }

    /// Re-read the ledger snapshot, e.g. after a credit purchase
    pub async fn refresh(&mut self) -> ClientResult<Vec<ReconcileEvent>> {
        let id = self.participant_id()?;
        let snapshot = match self.transport.get_participant(&id).await {
            Ok(snapshot) => snapshot,
            Err(ClientError::NotFound { .. }) => return Ok(self.discard_identity().await),
            Err(e) => return Err(e),
        };
        let mut events = self.session.adopt(snapshot);
        events.extend(self.load_canvas_if_needed().await);
        Ok(events)
    }

    /// Stop submitting for an identity the ledger no longer knows.
    ///
    /// Results still queued for it are dropped; the session rolls back their
    /// marks and asks for a new identity.
    async fn discard_identity(&mut self) -> Vec<ReconcileEvent> {
        if let Some(queue) = self.queue.take() {
            queue.close().await;
        }
        self.results = None;
        self.session.reset_identity()
    }

    fn participant_id(&self) -> ClientResult<ParticipantId> {
        self.session
            .participant_id()
            .cloned()
            .ok_or_else(|| ClientError::invalid_state(self.session.state()))
    }

    fn open_queue(&mut self) -> ClientResult<()> {
        if self.queue.is_some() {
            return Ok(());
        }
        let id = self.participant_id()?;
        let (queue, results) = SubmissionQueue::spawn(
            Arc::clone(&self.transport),
            id,
            self.config.submission.clone(),
            self.config.retry.clone(),
        );
        self.queue = Some(queue);
        self.results = Some(results);
        Ok(())
    }

    async fn apply(&mut self, result: BatchResult) -> Vec<ReconcileEvent> {
        let mut events = match result.outcome {
            Ok(submission) => self.session.resolve(&result.keys, submission),
            Err(ClientError::NotFound { message }) => {
                warn!(
                    items = result.keys.len(),
                    "Participant unknown to the ledger: {}",
                    message
                );
                return self.discard_identity().await;
            }
            Err(e) => {
                warn!(
                    attempts = result.attempts,
                    items = result.keys.len(),
                    "Placement batch failed: {}",
                    e
                );
                self.session.fail(&result.keys, &e)
            }
        };
        events.extend(self.load_canvas_if_needed().await);
        events
    }

    async fn load_canvas_if_needed(&mut self) -> Vec<ReconcileEvent> {
        if !self.session.needs_canvas() {
            return Vec::new();
        }
        let Ok(id) = self.participant_id() else {
            return Vec::new();
        };

        self.session.mark_canvas_requested();
        match self.transport.canvas(&id).await {
            Ok(marks) => self.session.apply_canvas(marks),
            Err(e) => {
                warn!(participant_id = %id, "Canvas fetch failed: {}", e);
                self.session.canvas_fetch_failed();
                Vec::new()
            }
        }
    }
}
