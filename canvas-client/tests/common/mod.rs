//! In-process ledger used as a transport double

#![allow(dead_code)]

use async_trait::async_trait;
use canvas_client::{
    ClientError, ClientResult, PlacedMark, PlacementItem, PlacementTransport, Rejection,
    RevealInfo, Submission,
};
use canvas_core::{ColorLabel, ColorValue, LedgerSnapshot, ParticipantId, Phase};
use chrono::Utc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const LIMIT: u32 = 10;

struct Ledger {
    snapshot: Option<LedgerSnapshot>,
    marks: Vec<PlacedMark>,
    next_id: u64,
}

/// Mock gateway with the same admission rules as the real engine
pub struct MockLedger {
    ledger: Mutex<Ledger>,
    delay: Duration,
    failures_left: AtomicU32,
    pub submits: AtomicU32,
    pub canvas_reads: AtomicU32,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub batch_sizes: Mutex<Vec<usize>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            ledger: Mutex::new(Ledger {
                snapshot: None,
                marks: Vec::new(),
                next_id: 1,
            }),
            delay: Duration::ZERO,
            failures_left: AtomicU32::new(0),
            submits: AtomicU32::new(0),
            canvas_reads: AtomicU32::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            batch_sizes: Mutex::new(Vec::new()),
        }
    }

    /// Ledger with an existing participant
    pub fn with_participant(consumed: u32, revealed: bool, credits: u32) -> Self {
        let mock = Self::new();
        mock.ledger.lock().unwrap().snapshot = Some(LedgerSnapshot {
            id: ParticipantId::new("p-existing"),
            color_label: ColorLabel::Blue,
            color_value: ColorValue::new("#0040c2"),
            free_quota_consumed: consumed,
            revealed,
            credit_balance: credits,
        });
        mock
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail the next `n` submits with a connection error
    pub fn failing(self, n: u32) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    /// Drop the participant, as if the ledger had been reset
    pub fn forget(&self) {
        self.ledger.lock().unwrap().snapshot = None;
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.ledger.lock().unwrap().snapshot.clone().unwrap()
    }

    pub fn stored_marks(&self) -> usize {
        self.ledger.lock().unwrap().marks.len()
    }

    fn known(&self, id: &ParticipantId) -> ClientResult<()> {
        match &self.ledger.lock().unwrap().snapshot {
            Some(s) if &s.id == id => Ok(()),
            _ => Err(ClientError::NotFound {
                message: format!("Participant {} not found", id),
            }),
        }
    }
}

#[async_trait]
impl PlacementTransport for MockLedger {
    async fn create_participant(&self, label: ColorLabel) -> ClientResult<LedgerSnapshot> {
        let snapshot = LedgerSnapshot {
            id: ParticipantId::new("p-new"),
            color_label: label,
            color_value: ColorValue::new("#c20000"),
            free_quota_consumed: 0,
            revealed: false,
            credit_balance: 0,
        };
        self.ledger.lock().unwrap().snapshot = Some(snapshot.clone());
        Ok(snapshot)
    }

    async fn get_participant(&self, id: &ParticipantId) -> ClientResult<LedgerSnapshot> {
        self.known(id)?;
        Ok(self.snapshot())
    }

    async fn submit(
        &self,
        id: &ParticipantId,
        items: &[PlacementItem],
    ) -> ClientResult<Submission> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ClientError::connection("connection reset"));
        }
        self.known(id)?;
        self.batch_sizes.lock().unwrap().push(items.len());

        let mut guard = self.ledger.lock().unwrap();
        let ledger = &mut *guard;
        let mut accepted = Vec::new();
        let mut rejection = None;

        for item in items {
            if let Some(existing) = ledger
                .marks
                .iter()
                .find(|m| m.idempotency_key.as_deref() == Some(item.idempotency_key.as_str()))
            {
                accepted.push(existing.clone());
                continue;
            }

            let Some(snapshot) = ledger.snapshot.as_mut() else {
                return Err(ClientError::NotFound {
                    message: format!("Participant {} not found", id),
                });
            };
            let phase = match item.phase {
                Phase::Free if snapshot.revealed => {
                    rejection = Some(Rejection::QuotaExhausted);
                    break;
                }
                Phase::Free => {
                    snapshot.free_quota_consumed += 1;
                    if snapshot.free_quota_consumed >= LIMIT {
                        snapshot.revealed = true;
                    }
                    Phase::Free
                }
                Phase::Paid if !snapshot.revealed || snapshot.credit_balance == 0 => {
                    rejection = Some(Rejection::InsufficientCredits);
                    break;
                }
                Phase::Paid => {
                    snapshot.credit_balance -= 1;
                    Phase::Paid
                }
            };

            let mark = PlacedMark {
                id: format!("pl-{}", ledger.next_id),
                x: item.x,
                y: item.y,
                color_value: snapshot.color_value.as_str().to_string(),
                phase,
                idempotency_key: Some(item.idempotency_key.clone()),
                created_at: Utc::now(),
            };
            ledger.next_id += 1;
            ledger.marks.push(mark.clone());
            accepted.push(mark);
        }

        let snapshot = ledger
            .snapshot
            .clone()
            .ok_or_else(|| ClientError::NotFound {
                message: format!("Participant {} not found", id),
            })?;
        Ok(Submission {
            accepted,
            snapshot,
            rejection,
        })
    }

    async fn reveal(&self, id: &ParticipantId) -> ClientResult<RevealInfo> {
        self.known(id)?;
        let mut ledger = self.ledger.lock().unwrap();
        let Some(snapshot) = ledger.snapshot.as_mut() else {
            return Err(ClientError::NotFound {
                message: format!("Participant {} not found", id),
            });
        };
        if snapshot.revealed {
            return Ok(RevealInfo {
                snapshot: snapshot.clone(),
                revealed_now: false,
            });
        }
        if snapshot.free_quota_consumed < LIMIT {
            return Err(ClientError::QuotaNotMet {
                consumed: snapshot.free_quota_consumed,
                limit: LIMIT,
            });
        }
        snapshot.revealed = true;
        Ok(RevealInfo {
            snapshot: snapshot.clone(),
            revealed_now: true,
        })
    }

    async fn canvas(&self, id: &ParticipantId) -> ClientResult<Vec<PlacedMark>> {
        self.known(id)?;
        self.canvas_reads.fetch_add(1, Ordering::SeqCst);
        let ledger = self.ledger.lock().unwrap();
        if !ledger.snapshot.as_ref().is_some_and(|s| s.revealed) {
            return Err(ClientError::NotRevealed);
        }
        Ok(ledger
            .marks
            .iter()
            .map(|m| PlacedMark {
                idempotency_key: None,
                ..m.clone()
            })
            .collect())
    }
}
