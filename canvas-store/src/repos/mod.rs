//! Canvas Store Repositories
//!
//! Read-side data access for the participant ledger and placement store.
//! Mutations go through the services, which own the transactions.

mod participant_repo;
mod placement_repo;

// SQLite implementations
mod sqlite_participant_repo;
mod sqlite_placement_repo;

// Export repository traits
pub use participant_repo::*;
pub use placement_repo::*;

// Export SQLite implementations
pub use sqlite_participant_repo::*;
pub use sqlite_placement_repo::*;
