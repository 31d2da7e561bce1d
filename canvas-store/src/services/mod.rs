//! Canvas Store Services
//!
//! Transactional operations over the participant ledger. Each service owns
//! its transactions; the repositories only read.

mod consumption;
mod credit;
mod registration;
mod reveal;
mod view;

pub use consumption::*;
pub use credit::*;
pub use registration::*;
pub use reveal::*;
pub use view::*;
