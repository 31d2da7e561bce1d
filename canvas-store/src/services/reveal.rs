//! Reveal Transition

use canvas_core::{LedgerSnapshot, ParticipantId, QuotaPolicy, RevealCheck};
use chrono::Utc;
use rusqlite::TransactionBehavior;
use std::sync::Arc;
use tracing::{debug, info};

use crate::datastore::SqliteDatastore;
use crate::error::StoreResult;
use crate::sql;

/// Result of an explicit reveal request
#[derive(Clone, Debug, PartialEq)]
pub struct RevealResult {
    /// Ledger after the request
    pub snapshot: LedgerSnapshot,
    /// Whether this request performed the transition
    pub revealed_now: bool,
}

/// Explicit reveal service.
///
/// Shares its conditional predicate with the implicit path in the
/// consumption engine, so the flag flips at most once whichever path wins.
pub struct RevealService {
    datastore: Arc<SqliteDatastore>,
    policy: QuotaPolicy,
}

impl RevealService {
    /// Create a new service
    pub fn new(datastore: Arc<SqliteDatastore>, policy: QuotaPolicy) -> Self {
        Self { datastore, policy }
    }

    /// Reveal a participant whose free quota is used up.
    ///
    /// Already revealed is a no-op success; below quota is `QuotaNotMet`.
    pub async fn reveal(&self, participant_id: &ParticipantId) -> StoreResult<RevealResult> {
        let policy = self.policy.clone();
        let pid = participant_id.clone();

        let result = self
            .datastore
            .run(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let snapshot = sql::load_participant(&tx, &pid)?.to_snapshot()?;

                let result = match policy.check_reveal(&snapshot)? {
                    RevealCheck::AlreadyRevealed => RevealResult {
                        snapshot,
                        revealed_now: false,
                    },
                    RevealCheck::Eligible => {
                        let revealed_now =
                            sql::mark_revealed(&tx, &pid, policy.free_quota_limit, Utc::now())?;
                        RevealResult {
                            snapshot: sql::load_participant(&tx, &pid)?.to_snapshot()?,
                            revealed_now,
                        }
                    }
                };
                tx.commit()?;
                Ok(result)
            })
            .await?;

        if result.revealed_now {
            info!(participant_id = %participant_id, via = "explicit", "Participant revealed");
        } else {
            debug!(participant_id = %participant_id, "Reveal requested on revealed participant");
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::entities::ParticipantEntity;
    use canvas_core::{CanvasError, ColorLabel, ColorValue};

    async fn setup(consumed: i64, revealed: bool) -> (RevealService, ParticipantId) {
        let datastore = Arc::new(SqliteDatastore::open(&StoreConfig::memory()).unwrap());
        datastore.init_schema().await.unwrap();
        let pid = ParticipantId::new("p1");
        let mut entity =
            ParticipantEntity::new(pid.clone(), ColorLabel::Pink, ColorValue::new("#f0a"));
        entity.free_quota_consumed = consumed;
        entity.revealed = revealed;
        datastore
            .run(move |conn| sql::insert_participant(conn, &entity))
            .await
            .unwrap();
        (RevealService::new(datastore, QuotaPolicy::default()), pid)
    }

    #[tokio::test]
    async fn test_reveal_below_quota_fails() {
        let (service, pid) = setup(4, false).await;
        let err = service.reveal(&pid).await.unwrap_err();
        assert_eq!(
            err.as_domain(),
            Some(&CanvasError::QuotaNotMet {
                consumed: 4,
                limit: 10
            })
        );
    }

    #[tokio::test]
    async fn test_reveal_is_idempotent() {
        let (service, pid) = setup(10, false).await;

        let first = service.reveal(&pid).await.unwrap();
        assert!(first.revealed_now);
        assert!(first.snapshot.revealed);

        let second = service.reveal(&pid).await.unwrap();
        assert!(!second.revealed_now);
        assert_eq!(second.snapshot, first.snapshot);
    }

    #[tokio::test]
    async fn test_reveal_unknown_participant() {
        let (service, _) = setup(0, false).await;
        let err = service.reveal(&ParticipantId::new("ghost")).await.unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CanvasError::ParticipantNotFound { .. })
        ));
    }
}
