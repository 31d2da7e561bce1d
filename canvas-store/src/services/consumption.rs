//! Quota Consumption Engine
//!
//! Decides one placement at a time inside an IMMEDIATE transaction, so the
//! replay lookup, the conditional ledger debit and the placement insert are a
//! single atomic unit per participant.

use canvas_core::{
    Admission, LedgerSnapshot, ParticipantId, Phase, Placement, PlacementDecision,
    PlacementOutcome, PlacementRequest, QuotaPolicy,
};
use chrono::Utc;
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::datastore::SqliteDatastore;
use crate::entities::{ParticipantEntity, PlacementEntity};
use crate::error::{StoreError, StoreResult};
use crate::sql;

/// Where a batch stopped
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchRejection {
    /// `quota_exhausted` or `insufficient_credits`
    pub outcome: PlacementOutcome,
    /// Index of the rejected item
    pub index: usize,
    /// Items after the rejected one that were never attempted
    pub not_attempted: usize,
}

/// Result of a batch
#[derive(Clone, Debug, PartialEq)]
pub struct BatchDecision {
    /// Items applied, in submission order (replays included)
    pub accepted: Vec<Placement>,
    /// Ledger snapshot after the last attempted item
    pub snapshot: LedgerSnapshot,
    /// Set when the batch short-circuited on a quota or credit rejection
    pub rejection: Option<BatchRejection>,
    /// Whether an item in this batch flipped the reveal flag
    pub revealed_now: bool,
}

/// Quota consumption service
pub struct ConsumptionService {
    datastore: Arc<SqliteDatastore>,
    policy: QuotaPolicy,
}

impl ConsumptionService {
    /// Create a new service
    pub fn new(datastore: Arc<SqliteDatastore>, policy: QuotaPolicy) -> Self {
        Self { datastore, policy }
    }

    /// Active quota policy
    pub fn policy(&self) -> &QuotaPolicy {
        &self.policy
    }

    /// Decide one placement.
    ///
    /// Coordinates are validated before the ledger is touched.
    pub async fn place(
        &self,
        participant_id: &ParticipantId,
        request: PlacementRequest,
    ) -> StoreResult<PlacementDecision> {
        request.position.validate()?;

        let policy = self.policy.clone();
        let pid = participant_id.clone();
        let (decision, revealed_now) = self
            .datastore
            .run(move |conn| consume_in_transaction(conn, &policy, &pid, &request))
            .await?;

        log_decision(participant_id, &decision, revealed_now);
        Ok(decision)
    }

    /// Decide an ordered batch, stopping at the first quota or credit rejection.
    ///
    /// Every item is validated up front; one bad item fails the whole batch
    /// without touching the ledger. Items without a phase hint inherit the
    /// phase of the participant at the start of the batch.
    pub async fn place_batch(
        &self,
        participant_id: &ParticipantId,
        requests: Vec<PlacementRequest>,
    ) -> StoreResult<BatchDecision> {
        self.policy.validate_batch_size(requests.len())?;
        for request in &requests {
            request.position.validate()?;
        }

        let policy = self.policy.clone();
        let pid = participant_id.clone();
        let initial = self
            .datastore
            .run(move |conn| sql::load_participant(conn, &pid))
            .await?
            .to_snapshot()?;
        let batch_phase = Phase::for_revealed(initial.revealed);

        let total = requests.len();
        let mut accepted = Vec::with_capacity(total);
        let mut snapshot = initial;
        let mut revealed_now = false;

        for (index, mut request) in requests.into_iter().enumerate() {
            request.phase_hint.get_or_insert(batch_phase);

            let policy = policy.clone();
            let pid = participant_id.clone();
            let (decision, revealed) = self
                .datastore
                .run(move |conn| consume_in_transaction(conn, &policy, &pid, &request))
                .await?;
            log_decision(participant_id, &decision, revealed);
            revealed_now |= revealed;

            match decision {
                PlacementDecision::Accepted {
                    placement,
                    snapshot: after,
                }
                | PlacementDecision::Replayed {
                    placement,
                    snapshot: after,
                } => {
                    accepted.push(placement);
                    snapshot = after;
                }
                rejected => {
                    let outcome = rejected.outcome();
                    snapshot = rejected.snapshot().clone();
                    return Ok(BatchDecision {
                        accepted,
                        snapshot,
                        rejection: Some(BatchRejection {
                            outcome,
                            index,
                            not_attempted: total - index - 1,
                        }),
                        revealed_now,
                    });
                }
            }
        }

        Ok(BatchDecision {
            accepted,
            snapshot,
            rejection: None,
            revealed_now,
        })
    }
}

fn consume_in_transaction(
    conn: &mut Connection,
    policy: &QuotaPolicy,
    participant_id: &ParticipantId,
    request: &PlacementRequest,
) -> StoreResult<(PlacementDecision, bool)> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let result = consume(&tx, policy, participant_id, request)?;
    tx.commit()?;
    Ok(result)
}

/// Replay check, admission, conditional debit and insert.
///
/// Returns the decision and whether this call flipped the reveal flag.
fn consume(
    conn: &Connection,
    policy: &QuotaPolicy,
    participant_id: &ParticipantId,
    request: &PlacementRequest,
) -> StoreResult<(PlacementDecision, bool)> {
    let participant = sql::load_participant(conn, participant_id)?;

    if let Some(key) = &request.idempotency_key {
        if let Some(existing) = sql::find_placement_by_key(conn, participant_id, key)? {
            return Ok((replay(existing, &participant, request)?, false));
        }
    }

    let snapshot = participant.to_snapshot()?;
    let now = Utc::now();
    let (phase, revealed_now) = match policy.admit(&snapshot, request.phase_hint) {
        Admission::RejectQuotaExhausted => {
            return Ok((PlacementDecision::QuotaExhausted { snapshot }, false));
        }
        Admission::RejectInsufficientCredits => {
            return Ok((PlacementDecision::InsufficientCredits { snapshot }, false));
        }
        Admission::DebitFree => {
            match sql::debit_free(conn, participant_id, policy.free_quota_limit, now)? {
                Some(revealed) => (Phase::Free, revealed),
                None => return Ok((PlacementDecision::QuotaExhausted { snapshot }, false)),
            }
        }
        Admission::DebitCredit => {
            if !sql::debit_credit(conn, participant_id)? {
                return Ok((PlacementDecision::InsufficientCredits { snapshot }, false));
            }
            (Phase::Paid, false)
        }
    };

    let entity = PlacementEntity::new(
        participant_id,
        request.position,
        &participant.color_value,
        phase,
        request.idempotency_key.as_ref(),
    );

    let seq = sql::insert_placement(conn, &entity)?;
    if seq.is_none() {
        // The replay lookup above runs under the same write lock, so a
        // conflict here means the store is inconsistent.
        return Err(StoreError::Constraint(format!(
            "idempotency key conflict for participant {}",
            participant_id
        )));
    }

    let snapshot = sql::load_participant(conn, participant_id)?.to_snapshot()?;
    let placement = entity.into_placement()?;
    Ok((
        PlacementDecision::Accepted {
            placement,
            snapshot,
        },
        revealed_now,
    ))
}

fn replay(
    existing: PlacementEntity,
    participant: &ParticipantEntity,
    request: &PlacementRequest,
) -> StoreResult<PlacementDecision> {
    if !existing.is_at(&request.position) {
        warn!(
            participant_id = %participant.id,
            placement_id = %existing.id,
            stored_x = existing.x,
            stored_y = existing.y,
            requested_x = request.position.x,
            requested_y = request.position.y,
            "Idempotency key replayed with different coordinates; returning stored placement"
        );
    }
    Ok(PlacementDecision::Replayed {
        placement: existing.into_placement()?,
        snapshot: participant.to_snapshot()?,
    })
}

fn log_decision(participant_id: &ParticipantId, decision: &PlacementDecision, revealed_now: bool) {
    let snapshot = decision.snapshot();
    match decision {
        PlacementDecision::Accepted { placement, .. } => info!(
            participant_id = %participant_id,
            placement_id = %placement.id.as_str(),
            phase = %placement.phase,
            free_quota_consumed = snapshot.free_quota_consumed,
            credit_balance = snapshot.credit_balance,
            "Placement accepted"
        ),
        PlacementDecision::Replayed { placement, .. } => debug!(
            participant_id = %participant_id,
            placement_id = %placement.id.as_str(),
            "Placement replayed"
        ),
        PlacementDecision::QuotaExhausted { .. } | PlacementDecision::InsufficientCredits { .. } => {
            info!(
                participant_id = %participant_id,
                outcome = decision.outcome().as_str(),
                free_quota_consumed = snapshot.free_quota_consumed,
                revealed = snapshot.revealed,
                credit_balance = snapshot.credit_balance,
                "Placement rejected"
            )
        }
    }
    if revealed_now {
        info!(participant_id = %participant_id, via = "implicit", "Participant revealed");
    }
}
