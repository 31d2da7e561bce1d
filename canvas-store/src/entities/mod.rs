//! Canvas Store Entities
//!
//! Row mappings for the participant ledger and placement store.

mod participant;
mod placement;

pub use participant::*;
pub use placement::*;
