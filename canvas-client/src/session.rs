//! Per-participant session state
//!
//! Holds the last adopted ledger snapshot, the provisional marks that are
//! buffered or in flight, and the marks to render. Local counters are a
//! projection of the snapshot plus in-flight work; they never authorize a
//! placement.

use canvas_core::{IdempotencyKey, LedgerSnapshot, ParticipantId, Phase, Position};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::api::{PlacedMark, PlacementItem, Rejection, Submission};
use crate::error::{ClientError, ClientResult};

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Uninitialized,
    SelectingIdentity,
    BlindActive,
    RevealedActive,
}

impl SessionState {
    /// Phase new placements are charged against, if placing is possible
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::BlindActive => Some(Phase::Free),
            Self::RevealedActive => Some(Phase::Paid),
            _ => None,
        }
    }
}

/// Whether a rendered mark has been confirmed by the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkStatus {
    Provisional,
    Confirmed,
}

/// Mark as drawn on the local canvas
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedMark {
    pub id: Option<String>,
    pub key: Option<IdempotencyKey>,
    pub x: f64,
    pub y: f64,
    pub color_value: String,
    pub phase: Phase,
    pub status: MarkStatus,
    pub created_at: Option<DateTime<Utc>>,
}

impl RenderedMark {
    fn confirmed(mark: &PlacedMark) -> Self {
        Self {
            id: Some(mark.id.clone()),
            key: mark.idempotency_key.clone().map(IdempotencyKey::new),
            x: mark.x,
            y: mark.y,
            color_value: mark.color_value.clone(),
            phase: mark.phase,
            status: MarkStatus::Confirmed,
            created_at: Some(mark.created_at),
        }
    }
}

/// Why a provisional mark left the render set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackReason {
    QuotaExhausted,
    InsufficientCredits,
    /// Submission succeeded but the key was not among the accepted items
    Unconfirmed,
    /// Transport failure after retries
    Failed(String),
    /// The ledger no longer knows the participant
    IdentityDiscarded,
}

impl From<Rejection> for RollbackReason {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::QuotaExhausted => Self::QuotaExhausted,
            Rejection::InsufficientCredits => Self::InsufficientCredits,
        }
    }
}

/// Observable result of applying ledger responses to the session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReconcileEvent {
    IdentityRequired,
    IdentityAssigned { snapshot: LedgerSnapshot },
    SnapshotAdopted { snapshot: LedgerSnapshot },
    StaleSnapshotIgnored { incoming: u32, held: u32 },
    Confirmed {
        key: IdempotencyKey,
        created_at: DateTime<Utc>,
    },
    RolledBack {
        key: IdempotencyKey,
        reason: RollbackReason,
    },
    Revealed { snapshot: LedgerSnapshot },
    CanvasLoaded { marks: usize },
}

#[derive(Debug, Clone)]
struct PendingMark {
    key: IdempotencyKey,
    x: f64,
    y: f64,
    phase: Phase,
    visible: bool,
}

/// Client session for one participant
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    free_quota_limit: u32,
    snapshot: Option<LedgerSnapshot>,
    pending: Vec<PendingMark>,
    confirmed: Vec<RenderedMark>,
    canvas: Option<Vec<PlacedMark>>,
    canvas_requested: bool,
}

impl Session {
    pub fn new(free_quota_limit: u32) -> Self {
        Self {
            state: SessionState::Uninitialized,
            free_quota_limit,
            snapshot: None,
            pending: Vec::new(),
            confirmed: Vec::new(),
            canvas: None,
            canvas_requested: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Last adopted snapshot
    pub fn snapshot(&self) -> Option<&LedgerSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn participant_id(&self) -> Option<&ParticipantId> {
        self.snapshot.as_ref().map(|s| &s.id)
    }

    /// First load. Without a stored identity the user must pick a color.
    pub fn begin(&mut self, stored: Option<LedgerSnapshot>) -> ClientResult<Vec<ReconcileEvent>> {
        if self.state != SessionState::Uninitialized {
            return Err(ClientError::invalid_state(self.state));
        }
        self.state = SessionState::SelectingIdentity;
        match stored {
            Some(snapshot) => self.assign_identity(snapshot),
            None => Ok(vec![ReconcileEvent::IdentityRequired]),
        }
    }

    /// Drop the current identity and go back to color selection.
    ///
    /// Every outstanding provisional mark is rolled back.
    pub fn reset_identity(&mut self) -> Vec<ReconcileEvent> {
        if let Some(id) = self.participant_id() {
            info!(participant_id = %id, "Identity discarded");
        }
        let mut events: Vec<ReconcileEvent> = self
            .pending
            .drain(..)
            .map(|m| ReconcileEvent::RolledBack {
                key: m.key,
                reason: RollbackReason::IdentityDiscarded,
            })
            .collect();

        *self = Self::new(self.free_quota_limit);
        self.state = SessionState::SelectingIdentity;
        events.push(ReconcileEvent::IdentityRequired);
        events
    }

    /// Identity created or restored
    pub fn assign_identity(
        &mut self,
        snapshot: LedgerSnapshot,
    ) -> ClientResult<Vec<ReconcileEvent>> {
        if self.state != SessionState::SelectingIdentity {
            return Err(ClientError::invalid_state(self.state));
        }
        info!(participant_id = %snapshot.id, color = %snapshot.color_value, "Identity assigned");
        self.state = SessionState::BlindActive;

        let mut events = vec![ReconcileEvent::IdentityAssigned {
            snapshot: snapshot.clone(),
        }];
        events.extend(self.adopt(snapshot));
        Ok(events)
    }

    /// Buffered plus in-flight placements
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    fn in_flight_for(&self, phase: Phase) -> u32 {
        self.pending.iter().filter(|m| m.phase == phase).count() as u32
    }

    /// Display-only estimate of free placements left
    pub fn estimated_free_remaining(&self) -> u32 {
        self.snapshot
            .as_ref()
            .map(|s| s.free_quota_remaining(self.free_quota_limit))
            .unwrap_or(0)
            .saturating_sub(self.in_flight_for(Phase::Free))
    }

    /// Display-only estimate of spendable credits
    pub fn estimated_credit_balance(&self) -> u32 {
        self.snapshot
            .as_ref()
            .map(|s| s.credit_balance)
            .unwrap_or(0)
            .saturating_sub(self.in_flight_for(Phase::Paid))
    }

    /// Whether the local estimate allows another attempt
    pub fn can_place(&self) -> bool {
        match self.state {
            SessionState::BlindActive => self.estimated_free_remaining() > 0,
            SessionState::RevealedActive => self.estimated_credit_balance() > 0,
            _ => false,
        }
    }

    /// Record a provisional mark and return the item to submit
    pub fn propose(&mut self, x: f64, y: f64) -> ClientResult<PlacementItem> {
        let phase = self
            .state
            .phase()
            .ok_or_else(|| ClientError::invalid_state(self.state))?;
        Position::new(x, y).map_err(|e| ClientError::validation(e.to_string()))?;
        if !self.can_place() {
            return Err(ClientError::NoCapacity { phase });
        }

        let key = IdempotencyKey::generate();
        debug!(key = %key, x, y, phase = %phase, "Provisional mark");
        self.pending.push(PendingMark {
            key: key.clone(),
            x,
            y,
            phase,
            visible: true,
        });

        Ok(PlacementItem {
            x,
            y,
            idempotency_key: key.0,
            phase,
        })
    }

    /// Adopt a server snapshot unless it is older than the one held
    pub fn adopt(&mut self, incoming: LedgerSnapshot) -> Vec<ReconcileEvent> {
        if let Some(held) = &self.snapshot {
            let regresses = incoming.free_quota_consumed < held.free_quota_consumed
                || (held.revealed && !incoming.revealed);
            if regresses {
                debug!(
                    incoming = incoming.free_quota_consumed,
                    held = held.free_quota_consumed,
                    "Ignoring stale snapshot"
                );
                return vec![ReconcileEvent::StaleSnapshotIgnored {
                    incoming: incoming.free_quota_consumed,
                    held: held.free_quota_consumed,
                }];
            }
        }

        let revealed = incoming.revealed;
        self.snapshot = Some(incoming.clone());
        let mut events = vec![ReconcileEvent::SnapshotAdopted {
            snapshot: incoming.clone(),
        }];

        if revealed && self.state == SessionState::BlindActive {
            info!(participant_id = %incoming.id, "Canvas revealed");
            self.state = SessionState::RevealedActive;
            self.confirmed.clear();
            for mark in &mut self.pending {
                mark.visible = false;
            }
            events.push(ReconcileEvent::Revealed { snapshot: incoming });
        }
        events
    }

    /// Apply the ledger decision for a submitted batch
    pub fn resolve(
        &mut self,
        keys: &[IdempotencyKey],
        submission: Submission,
    ) -> Vec<ReconcileEvent> {
        let mut events = self.adopt(submission.snapshot);

        for key in keys {
            let accepted = submission
                .accepted
                .iter()
                .find(|m| m.idempotency_key.as_deref() == Some(key.as_str()));
            let pending = self.take_pending(key);

            match accepted {
                Some(mark) => {
                    self.record_confirmed(mark);
                    events.push(ReconcileEvent::Confirmed {
                        key: key.clone(),
                        created_at: mark.created_at,
                    });
                }
                None if pending.is_some() => {
                    let reason = submission
                        .rejection
                        .map(RollbackReason::from)
                        .unwrap_or(RollbackReason::Unconfirmed);
                    events.push(ReconcileEvent::RolledBack {
                        key: key.clone(),
                        reason,
                    });
                }
                None => {}
            }
        }
        events
    }

    /// Roll back a batch that could not be delivered
    pub fn fail(&mut self, keys: &[IdempotencyKey], error: &ClientError) -> Vec<ReconcileEvent> {
        keys.iter()
            .filter_map(|key| self.take_pending(key).map(|_| key))
            .map(|key| ReconcileEvent::RolledBack {
                key: key.clone(),
                reason: RollbackReason::Failed(error.to_string()),
            })
            .collect()
    }

    fn take_pending(&mut self, key: &IdempotencyKey) -> Option<PendingMark> {
        let index = self.pending.iter().position(|m| &m.key == key)?;
        Some(self.pending.remove(index))
    }

    fn record_confirmed(&mut self, mark: &PlacedMark) {
        match self.state {
            // Blind marks accepted before the reveal are part of the fetched canvas.
            SessionState::RevealedActive if mark.phase == Phase::Free => {}
            SessionState::RevealedActive => {
                let on_canvas = self
                    .canvas
                    .as_ref()
                    .is_some_and(|c| c.iter().any(|m| m.id == mark.id));
                if !on_canvas {
                    self.confirmed.push(RenderedMark::confirmed(mark));
                }
            }
            _ => self.confirmed.push(RenderedMark::confirmed(mark)),
        }
    }

    /// Whether the revealed canvas still has to be fetched
    pub fn needs_canvas(&self) -> bool {
        self.state == SessionState::RevealedActive && self.canvas.is_none() && !self.canvas_requested
    }

    pub fn mark_canvas_requested(&mut self) {
        self.canvas_requested = true;
    }

    /// Allow another canvas fetch after a failed one
    pub fn canvas_fetch_failed(&mut self) {
        self.canvas_requested = false;
    }

    /// Install the revealed canvas
    pub fn apply_canvas(&mut self, marks: Vec<PlacedMark>) -> Vec<ReconcileEvent> {
        self.confirmed
            .retain(|c| !marks.iter().any(|m| Some(&m.id) == c.id.as_ref()));
        let count = marks.len();
        self.canvas = Some(marks);
        vec![ReconcileEvent::CanvasLoaded { marks: count }]
    }

    /// Marks to draw, confirmed first then provisional in submission order
    pub fn render_set(&self) -> Vec<RenderedMark> {
        let color = self
            .snapshot
            .as_ref()
            .map(|s| s.color_value.as_str().to_string())
            .unwrap_or_default();

        let mut marks: Vec<RenderedMark> = self
            .canvas
            .iter()
            .flatten()
            .map(RenderedMark::confirmed)
            .collect();
        marks.extend(self.confirmed.iter().cloned());
        marks.extend(self.pending.iter().filter(|m| m.visible).map(|m| RenderedMark {
            id: None,
            key: Some(m.key.clone()),
            x: m.x,
            y: m.y,
            color_value: color.clone(),
            phase: m.phase,
            status: MarkStatus::Provisional,
            created_at: None,
        }));
        marks
    }

    /// No placement is buffered or in flight
    pub fn is_settled(&self) -> bool {
        self.pending.is_empty()
    }
}
