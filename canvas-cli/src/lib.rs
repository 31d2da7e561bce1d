//! Canvas CLI - Command Line Interface
//!
//! Runs the placement gateway and talks to it.
//!
//! # Usage
//!
//! ```text
//! canvas [OPTIONS] <COMMAND>
//!
//! Commands:
//!   init      Initialize the database schema
//!   start     Start the placement gateway
//!   health    Check health of the gateway
//!   stats     Show canvas statistics
//!   colors    List palette labels with remaining capacity
//!   join      Create a participant for a color label
//!   status    Show a participant's ledger snapshot
//!   place     Place a single mark
//!   reveal    Reveal the canvas once the free quota is used up
//!   mine      List the participant's own marks
//!   canvas    List every mark on the canvas (requires reveal)
//!   grant     Grant credits to a participant (trusted route)
//!   scribble  Place random marks through the buffered reconciliation layer
//!
//! Options:
//!   -a, --api-url <URL>    API endpoint URL [default: http://localhost:3000]
//!       --db-url <PATH>    SQLite database path [default: canvas.db]
//!   -f, --format <FORMAT>  Output format (json, table, plain) [default: table]
//!   -v, --verbose          Enable verbose output
//! ```
//!
//! # Examples
//!
//! ```text
//! canvas start --port 3000
//! canvas join blue
//! canvas place -P <participant> 0.25 0.75
//! canvas scribble --label green -n 12
//! ```

pub mod commands;
pub mod error;
pub mod handler;
pub mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use error::{CliError, CliResult};

/// Canvas CLI version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
