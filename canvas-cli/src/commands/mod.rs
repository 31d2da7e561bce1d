//! CLI Commands Module
//!
//! Command definitions for the canvas CLI.

use clap::{Parser, Subcommand};

/// Canvas placement ledger CLI
#[derive(Parser, Debug)]
#[command(name = "canvas")]
#[command(version)]
#[command(about = "Canvas Placement Ledger Command Line Interface")]
#[command(long_about = "A command-line tool for running and using the canvas placement ledger.\n\n\
    Use this tool to start the gateway, create participants, place marks, \
    and inspect the shared canvas.")]
pub struct Cli {
    /// API endpoint URL
    #[arg(short, long, env = "CANVAS_API_URL", default_value = "http://localhost:3000")]
    pub api_url: String,

    /// SQLite database path, or mem:// for an in-memory store (env: CANVAS_DB_URL)
    #[arg(long, env = "CANVAS_DB_URL", default_value = "canvas.db")]
    pub db_url: String,

    /// Output format (json, table, plain)
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Table format (human-readable)
    #[default]
    Table,
    /// Plain text
    Plain,
}

/// Placement phase argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PhaseArg {
    Free,
    Paid,
}

impl From<PhaseArg> for canvas_core::Phase {
    fn from(phase: PhaseArg) -> Self {
        match phase {
            PhaseArg::Free => canvas_core::Phase::Free,
            PhaseArg::Paid => canvas_core::Phase::Paid,
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the database schema
    Init,

    /// Start the placement gateway
    Start {
        /// Host to bind to (env: CANVAS_API_HOST)
        #[arg(short = 'H', long, env = "CANVAS_API_HOST", default_value = "0.0.0.0")]
        host: String,
        /// Port to listen on (env: CANVAS_API_PORT)
        #[arg(short, long, env = "CANVAS_API_PORT", default_value = "3000")]
        port: u16,
        /// Free placements per participant
        #[arg(long, env = "CANVAS_FREE_QUOTA", default_value = "10")]
        free_quota: u32,
        /// Largest accepted batch
        #[arg(long, env = "CANVAS_MAX_BATCH", default_value = "50")]
        max_batch: usize,
        /// Storage operation timeout in milliseconds
        #[arg(long, env = "CANVAS_DB_TIMEOUT_MS", default_value = "5000")]
        db_timeout_ms: u64,
    },

    /// Check health of the gateway
    Health,

    /// Show canvas statistics
    Stats,

    /// List palette labels with remaining capacity
    Colors,

    /// Create a participant for a color label
    Join {
        /// Color label (red, orange, yellow, green, blue, purple, pink, brown)
        label: String,
    },

    /// Show a participant's ledger snapshot
    Status {
        /// Participant ID (env: CANVAS_PARTICIPANT)
        #[arg(env = "CANVAS_PARTICIPANT")]
        participant: String,
    },

    /// Place a single mark
    Place {
        /// Participant ID (env: CANVAS_PARTICIPANT)
        #[arg(short = 'P', long, env = "CANVAS_PARTICIPANT")]
        participant: String,
        /// Horizontal position in [0, 1]
        x: f64,
        /// Vertical position in [0, 1]
        y: f64,
        /// Idempotency key (generated when omitted)
        #[arg(short, long)]
        key: Option<String>,
        /// Expected phase; defaults to the participant's current phase
        #[arg(long)]
        phase: Option<PhaseArg>,
    },

    /// Reveal the canvas once the free quota is used up
    Reveal {
        /// Participant ID (env: CANVAS_PARTICIPANT)
        #[arg(env = "CANVAS_PARTICIPANT")]
        participant: String,
    },

    /// List the participant's own marks
    Mine {
        /// Participant ID (env: CANVAS_PARTICIPANT)
        #[arg(env = "CANVAS_PARTICIPANT")]
        participant: String,
    },

    /// List every mark on the canvas (requires reveal)
    Canvas {
        /// Participant ID (env: CANVAS_PARTICIPANT)
        #[arg(env = "CANVAS_PARTICIPANT")]
        participant: String,
    },

    /// Grant credits to a participant (trusted route)
    Grant {
        /// Participant ID
        participant: String,
        /// Credits to add
        amount: i64,
        /// API key for the internal route (env: CANVAS_ADMIN_KEY)
        #[arg(long, env = "CANVAS_ADMIN_KEY")]
        api_key: Option<String>,
    },

    /// Place random marks through the buffered reconciliation layer
    Scribble {
        /// Existing participant ID; a new one is created when omitted
        #[arg(short = 'P', long, env = "CANVAS_PARTICIPANT")]
        participant: Option<String>,
        /// Color label for a new participant
        #[arg(short, long, default_value = "red")]
        label: String,
        /// Marks to attempt
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,
        /// Buffered marks per request
        #[arg(long, default_value = "5")]
        batch: usize,
        /// Concurrent requests
        #[arg(long, default_value = "3")]
        in_flight: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_help() {
        let result = Cli::try_parse_from(["canvas", "--help"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Table);
    }

    #[test]
    fn test_parse_place() {
        let cli = Cli::try_parse_from([
            "canvas", "place", "-P", "p1", "0.25", "0.75", "--phase", "free",
        ])
        .unwrap();
        match cli.command {
            Commands::Place {
                participant,
                x,
                y,
                key,
                phase,
            } => {
                assert_eq!(participant, "p1");
                assert_eq!((x, y), (0.25, 0.75));
                assert!(key.is_none());
                assert_eq!(phase, Some(PhaseArg::Free));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_scribble_defaults() {
        let cli = Cli::try_parse_from(["canvas", "--format", "json", "scribble"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Scribble { label, count, .. } => {
                assert_eq!(label, "red");
                assert_eq!(count, 10);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
