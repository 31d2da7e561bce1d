//! Canvas domain types

pub mod common;
pub mod participant;
pub mod placement;

pub use common::*;
pub use participant::*;
pub use placement::*;
