//! Credit Grant Service

use canvas_core::{CanvasError, ParticipantId};
use std::sync::Arc;
use tracing::info;

use crate::datastore::SqliteDatastore;
use crate::error::{StoreError, StoreResult};
use crate::sql::{self, CreditGrant};

/// Credit grant service, invoked by the trusted payment confirmation flow.
pub struct CreditService {
    datastore: Arc<SqliteDatastore>,
}

impl CreditService {
    /// Create a new service
    pub fn new(datastore: Arc<SqliteDatastore>) -> Self {
        Self { datastore }
    }

    /// Atomically add credits. Returns the new balance.
    pub async fn grant(&self, participant_id: &ParticipantId, amount: i64) -> StoreResult<u32> {
        let units = u32::try_from(amount)
            .ok()
            .filter(|n| *n > 0)
            .ok_or(CanvasError::InvalidGrantAmount { amount })?;

        let pid = participant_id.clone();
        let outcome = self
            .datastore
            .run(move |conn| sql::grant_credits(conn, &pid, units))
            .await?;

        let balance = match outcome {
            CreditGrant::Granted(balance) => balance,
            CreditGrant::Overflow { balance } => {
                return Err(CanvasError::CreditBalanceOverflow {
                    balance,
                    amount: units,
                }
                .into())
            }
            CreditGrant::UnknownParticipant => {
                return Err(CanvasError::participant_not_found(participant_id.as_str()).into())
            }
        };
        let balance = u32::try_from(balance)
            .map_err(|_| StoreError::Constraint(format!("credit balance out of range: {}", balance)))?;

        info!(
            participant_id = %participant_id,
            amount = units,
            credit_balance = balance,
            "Credits granted"
        );
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::entities::ParticipantEntity;
    use canvas_core::{ColorLabel, ColorValue};

    async fn setup() -> (CreditService, ParticipantId) {
        let datastore = Arc::new(SqliteDatastore::open(&StoreConfig::memory()).unwrap());
        datastore.init_schema().await.unwrap();
        let pid = ParticipantId::new("p1");
        let entity = ParticipantEntity::new(pid.clone(), ColorLabel::Blue, ColorValue::new("#00f"));
        datastore
            .run(move |conn| sql::insert_participant(conn, &entity))
            .await
            .unwrap();
        (CreditService::new(datastore), pid)
    }

    #[tokio::test]
    async fn test_grants_accumulate() {
        let (service, pid) = setup().await;
        assert_eq!(service.grant(&pid, 3).await.unwrap(), 3);
        assert_eq!(service.grant(&pid, 2).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_non_positive_amount_is_rejected() {
        let (service, pid) = setup().await;
        for amount in [0, -5] {
            let err = service.grant(&pid, amount).await.unwrap_err();
            assert_eq!(
                err.as_domain(),
                Some(&CanvasError::InvalidGrantAmount { amount })
            );
        }
    }

    #[tokio::test]
    async fn test_overflowing_grant_leaves_balance_untouched() {
        let (service, pid) = setup().await;
        let max = i64::from(u32::MAX);
        assert_eq!(service.grant(&pid, max - 1).await.unwrap(), u32::MAX - 1);

        let err = service.grant(&pid, 2).await.unwrap_err();
        assert_eq!(
            err.as_domain(),
            Some(&CanvasError::CreditBalanceOverflow {
                balance: max - 1,
                amount: 2
            })
        );
        assert!(!err.is_retryable());

        assert_eq!(service.grant(&pid, 1).await.unwrap(), u32::MAX);
    }

    #[tokio::test]
    async fn test_grant_unknown_participant() {
        let (service, _) = setup().await;
        let err = service.grant(&ParticipantId::new("ghost"), 1).await.unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CanvasError::ParticipantNotFound { .. })
        ));
    }
}
