//! Buffered placement submission
//!
//! Items are appended to a buffer that is flushed as one batch when it
//! reaches `max_batch` items or when no new item arrives for `idle_flush`,
//! whichever comes first. Each flushed batch is handed to a worker; at most
//! `max_in_flight` workers run at once and the dispatcher waits for a free
//! slot before flushing again. Batches are dispatched in enqueue order.

use canvas_core::{IdempotencyKey, ParticipantId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::{PlacementItem, Submission};
use crate::error::{ClientError, ClientResult};
use crate::retry::RetryPolicy;
use crate::transport::PlacementTransport;

/// Flush and concurrency limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionPolicy {
    /// Flush once this many items are buffered
    pub max_batch: usize,
    /// Flush after this long without a new item
    pub idle_flush: Duration,
    /// Concurrent requests
    pub max_in_flight: usize,
}

impl Default for SubmissionPolicy {
    fn default() -> Self {
        Self {
            max_batch: 5,
            idle_flush: Duration::from_millis(150),
            max_in_flight: 3,
        }
    }
}

impl SubmissionPolicy {
    /// One request per item, sent as soon as a slot is free
    pub fn unbuffered(max_in_flight: usize) -> Self {
        Self {
            max_batch: 1,
            idle_flush: Duration::ZERO,
            max_in_flight,
        }
    }
}

/// Result of one flushed batch
#[derive(Debug)]
pub struct BatchResult {
    /// Keys of the submitted items, in order
    pub keys: Vec<IdempotencyKey>,
    pub outcome: ClientResult<Submission>,
    pub attempts: u32,
}

/// Handle to a running submission queue
pub struct SubmissionQueue {
    sender: mpsc::UnboundedSender<PlacementItem>,
    dispatcher: JoinHandle<()>,
}

impl SubmissionQueue {
    /// Start the dispatcher. Results arrive on the returned receiver, which
    /// closes after [`SubmissionQueue::close`] once every batch has resolved.
    pub fn spawn(
        transport: Arc<dyn PlacementTransport>,
        participant_id: ParticipantId,
        policy: SubmissionPolicy,
        retry: RetryPolicy,
    ) -> (Self, mpsc::UnboundedReceiver<BatchResult>) {
        let (sender, items) = mpsc::unbounded_channel();
        let (results_tx, results_rx) = mpsc::unbounded_channel();

        let dispatcher = Dispatcher {
            transport,
            participant_id,
            policy,
            retry,
            results: results_tx,
        };
        let dispatcher = tokio::spawn(dispatcher.run(items));

        (Self { sender, dispatcher }, results_rx)
    }

    /// Append an item to the buffer
    pub fn enqueue(&self, item: PlacementItem) -> ClientResult<()> {
        self.sender
            .send(item)
            .map_err(|_| ClientError::invalid_state("submission queue closed"))
    }

    /// Flush what is buffered and wait until every batch has resolved
    pub async fn close(self) {
        drop(self.sender);
        if let Err(e) = self.dispatcher.await {
            warn!("Submission dispatcher ended abnormally: {}", e);
        }
    }
}

struct Dispatcher {
    transport: Arc<dyn PlacementTransport>,
    participant_id: ParticipantId,
    policy: SubmissionPolicy,
    retry: RetryPolicy,
    results: mpsc::UnboundedSender<BatchResult>,
}

impl Dispatcher {
    async fn run(self, mut items: mpsc::UnboundedReceiver<PlacementItem>) {
        let max_batch = self.policy.max_batch.max(1);
        let max_in_flight = self.policy.max_in_flight.max(1);
        let slots = Arc::new(Semaphore::new(max_in_flight));
        let mut buffer: Vec<PlacementItem> = Vec::with_capacity(max_batch);

        loop {
            let next = if buffer.is_empty() {
                items.recv().await
            } else {
                match tokio::time::timeout(self.policy.idle_flush, items.recv()).await {
                    Ok(next) => next,
                    Err(_) => {
                        self.flush(&mut buffer, &slots).await;
                        continue;
                    }
                }
            };

            match next {
                Some(item) => {
                    buffer.push(item);
                    if buffer.len() >= max_batch {
                        self.flush(&mut buffer, &slots).await;
                    }
                }
                None => {
                    if !buffer.is_empty() {
                        self.flush(&mut buffer, &slots).await;
                    }
                    break;
                }
            }
        }

        // Wait for the last workers.
        let _ = slots.acquire_many(max_in_flight as u32).await;
    }

    async fn flush(&self, buffer: &mut Vec<PlacementItem>, slots: &Arc<Semaphore>) {
        let batch = std::mem::take(buffer);
        let permit = match slots.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return,
        };

        debug!(size = batch.len(), "Flushing placement batch");
        let transport = Arc::clone(&self.transport);
        let participant_id = self.participant_id.clone();
        let retry = self.retry.clone();
        let results = self.results.clone();

        tokio::spawn(async move {
            let result = submit_with_retry(transport.as_ref(), &participant_id, batch, &retry).await;
            // Receiver gone means the session was dropped; the ledger outcome still stands.
            let _ = results.send(result);
            drop(permit);
        });
    }
}

/// Submit one batch, retrying transport failures with the same keys
pub async fn submit_with_retry(
    transport: &dyn PlacementTransport,
    participant_id: &ParticipantId,
    items: Vec<PlacementItem>,
    retry: &RetryPolicy,
) -> BatchResult {
    let keys: Vec<IdempotencyKey> = items
        .iter()
        .map(|item| IdempotencyKey::new(item.idempotency_key.clone()))
        .collect();

    let mut attempt = 0;
    loop {
        attempt += 1;
        match transport.submit(participant_id, &items).await {
            Ok(submission) => {
                return BatchResult {
                    keys,
                    outcome: Ok(submission),
                    attempts: attempt,
                }
            }
            Err(e) if e.is_retryable() && retry.should_retry(attempt) => {
                let delay = retry.strategy.delay_for_attempt(attempt);
                warn!(attempt, delay_ms = delay.as_millis() as u64, "Placement submit failed, retrying: {}", e);
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                return BatchResult {
                    keys,
                    outcome: Err(e),
                    attempts: attempt,
                }
            }
        }
    }
}
