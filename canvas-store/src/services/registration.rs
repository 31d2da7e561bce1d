//! Participant Registration
//!
//! Allocates a unique concrete color from the label's pool and creates a
//! blind ledger row.

use canvas_core::{palette, ColorLabel, ColorValue, LedgerSnapshot, ParticipantId};
use rusqlite::TransactionBehavior;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::info;

use crate::datastore::SqliteDatastore;
use crate::entities::ParticipantEntity;
use crate::error::StoreResult;
use crate::sql;

/// Remaining capacity of one color label
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteAvailability {
    pub label: ColorLabel,
    pub total: usize,
    pub remaining: usize,
}

/// Participant registration service
pub struct RegistrationService {
    datastore: Arc<SqliteDatastore>,
}

impl RegistrationService {
    /// Create a new service
    pub fn new(datastore: Arc<SqliteDatastore>) -> Self {
        Self { datastore }
    }

    /// Create a participant with a freshly allocated color
    pub async fn register(&self, label: ColorLabel) -> StoreResult<LedgerSnapshot> {
        let entity = self
            .datastore
            .run(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let used: HashSet<ColorValue> = sql::used_colors(&tx, label)?
                    .into_iter()
                    .map(ColorValue::new)
                    .collect();
                let color = palette::pick_unused(label, &used, &mut rand::thread_rng())?;

                let entity = ParticipantEntity::new(ParticipantId::generate(), label, color);
                sql::insert_participant(&tx, &entity)?;
                tx.commit()?;
                Ok(entity)
            })
            .await?;

        info!(
            participant_id = %entity.id,
            color_label = %entity.color_label,
            color_value = %entity.color_value,
            "Participant registered"
        );
        entity.to_snapshot()
    }

    /// Remaining pool capacity per label
    pub async fn availability(&self) -> StoreResult<Vec<PaletteAvailability>> {
        let counts: HashMap<String, u64> = self
            .datastore
            .run(|conn| sql::count_by_label(conn))
            .await?
            .into_iter()
            .collect();

        Ok(ColorLabel::ALL
            .iter()
            .map(|label| {
                let used = counts.get(label.as_str()).copied().unwrap_or(0) as usize;
                PaletteAvailability {
                    label: *label,
                    total: palette::POOL_SIZE,
                    remaining: palette::POOL_SIZE.saturating_sub(used),
                }
            })
            .collect())
    }
}
