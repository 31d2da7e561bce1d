//! Canvas Store - Participant Ledger and Placement Store
//!
//! SQLite persistence for the quota-gated placement ledger, plus the
//! transactional services that mutate it.
//!
//! # Architecture
//!
//! - `SqliteDatastore` - one serialized connection, blocking work on the
//!   blocking pool, every call bounded by a timeout
//! - `*Repository` traits - read-side access with SQLite implementations
//! - Services - `ConsumptionService`, `RevealService`, `CreditService`,
//!   `RegistrationService`, `CanvasViewService`; each owns its transactions
//!
//! Every ledger mutation runs in a `BEGIN IMMEDIATE` transaction and uses a
//! conditional `UPDATE` whose affected-row count is the admission decision.
//!
//! # Usage Example
//!
//! ```ignore
//! use canvas_store::{CanvasDatabase, StoreConfig};
//! use canvas_core::{ColorLabel, QuotaPolicy};
//!
//! async fn example() {
//!     let db = CanvasDatabase::open(&StoreConfig::memory(), QuotaPolicy::default()).unwrap();
//!     db.init_schema().await.unwrap();
//!     let snapshot = db.registration.register(ColorLabel::Blue).await.unwrap();
//! }
//! ```

pub mod config;
pub mod datastore;
pub mod entities;
pub mod error;
pub mod repos;
pub mod schema;
pub mod services;
mod sql;

// Re-export main types
pub use config::{StoreConfig, StoreLocation};
pub use datastore::SqliteDatastore;
pub use entities::*;
pub use error::*;
pub use repos::*;
pub use schema::CANVAS_SCHEMA;
pub use services::*;

use canvas_core::{Phase, QuotaPolicy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Aggregate canvas counters
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasStats {
    pub participants: u64,
    pub revealed_participants: u64,
    pub placements: u64,
    pub free_placements: u64,
    pub paid_placements: u64,
}

/// Canvas database facade
///
/// Bundles the repositories and services over one shared datastore.
pub struct CanvasDatabase {
    /// Underlying datastore
    datastore: Arc<SqliteDatastore>,
    /// Quota policy shared by the engine and the reveal path
    policy: QuotaPolicy,
    /// Participant repository
    pub participants: SqliteParticipantRepository,
    /// Placement repository
    pub placements: SqlitePlacementRepository,
    /// Quota consumption engine
    pub consumption: ConsumptionService,
    /// Explicit reveal transition
    pub reveal: RevealService,
    /// Credit grants
    pub credits: CreditService,
    /// Participant registration
    pub registration: RegistrationService,
    /// Reveal-gated reads
    pub view: CanvasViewService,
}

impl CanvasDatabase {
    /// Create a database facade over an open datastore
    pub fn new(datastore: Arc<SqliteDatastore>, policy: QuotaPolicy) -> Self {
        Self {
            participants: SqliteParticipantRepository::new(datastore.clone()),
            placements: SqlitePlacementRepository::new(datastore.clone()),
            consumption: ConsumptionService::new(datastore.clone(), policy.clone()),
            reveal: RevealService::new(datastore.clone(), policy.clone()),
            credits: CreditService::new(datastore.clone()),
            registration: RegistrationService::new(datastore.clone()),
            view: CanvasViewService::new(datastore.clone()),
            datastore,
            policy,
        }
    }

    /// Open a datastore and wrap it
    pub fn open(config: &StoreConfig, policy: QuotaPolicy) -> StoreResult<Self> {
        let datastore = Arc::new(SqliteDatastore::open(config)?);
        Ok(Self::new(datastore, policy))
    }

    /// Initialize database schema
    pub async fn init_schema(&self) -> StoreResult<()> {
        self.datastore.init_schema().await?;
        tracing::info!("Canvas database schema initialized successfully");
        Ok(())
    }

    /// Check database health
    pub async fn health_check(&self) -> StoreResult<bool> {
        self.datastore.ping().await.map(|_| true)
    }

    /// Aggregate counters
    pub async fn stats(&self) -> StoreResult<CanvasStats> {
        Ok(CanvasStats {
            participants: self.participants.count().await?,
            revealed_participants: self.participants.count_revealed().await?,
            placements: self.placements.count(None).await?,
            free_placements: self.placements.count(Some(Phase::Free)).await?,
            paid_placements: self.placements.count(Some(Phase::Paid)).await?,
        })
    }

    /// Get the underlying datastore
    pub fn datastore(&self) -> &Arc<SqliteDatastore> {
        &self.datastore
    }

    /// Active quota policy
    pub fn policy(&self) -> &QuotaPolicy {
        &self.policy
    }
}
