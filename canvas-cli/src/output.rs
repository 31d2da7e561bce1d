//! Output Formatting
//!
//! Utilities for formatting CLI output in various formats.

use canvas_client::{
    ColorAvailability, HealthInfo, PlacedMark, ReconcileEvent, RevealInfo, StatsInfo,
};
use canvas_core::LedgerSnapshot;
use serde::Serialize;

use crate::commands::OutputFormat;

/// Print as JSON
pub fn print_json<T: Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error formatting JSON: {}", e),
    }
}

/// Print health response
pub fn print_health(health: &HealthInfo, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(health),
        OutputFormat::Table | OutputFormat::Plain => {
            println!("Canvas Gateway Health");
            println!("=====================");
            print_row("Status", &health.status);
            print_row("Version", &health.version);
            print_row("Uptime", &format!("{}s", health.uptime_secs));
        }
    }
}

/// Print stats response
pub fn print_stats(stats: &StatsInfo, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(stats),
        OutputFormat::Table | OutputFormat::Plain => {
            println!("Canvas Statistics");
            println!("=================");
            print_row("Participants", &stats.participants.to_string());
            print_row("Revealed", &stats.revealed_participants.to_string());
            print_row("Placements", &stats.placements.to_string());
            print_row("  free", &stats.free_placements.to_string());
            print_row("  paid", &stats.paid_placements.to_string());
            print_row("Free quota", &stats.free_quota_limit.to_string());
            print_row("Max batch", &stats.max_batch_size.to_string());
            print_row("Requests", &stats.total_requests.to_string());
            print_row("Uptime", &format!("{}s", stats.uptime_secs));
        }
    }
}

/// Print palette availability
pub fn print_colors(colors: &[ColorAvailability], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&colors),
        OutputFormat::Table => {
            println!("{:<10} {:>9} {:>6}", "LABEL", "REMAINING", "TOTAL");
            for color in colors {
                println!(
                    "{:<10} {:>9} {:>6}",
                    color.label.as_str(),
                    color.remaining,
                    color.total
                );
            }
        }
        OutputFormat::Plain => {
            for color in colors {
                println!("{} {}/{}", color.label, color.remaining, color.total);
            }
        }
    }
}

/// Print a ledger snapshot
pub fn print_snapshot(snapshot: &LedgerSnapshot, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(snapshot),
        OutputFormat::Table => {
            println!("Participant");
            println!("===========");
            print_row("ID", snapshot.id.as_str());
            print_row("Color", &format!("{} ({})", snapshot.color_label, snapshot.color_value));
            print_row("Free used", &snapshot.free_quota_consumed.to_string());
            print_row("Revealed", &snapshot.revealed.to_string());
            print_row("Credits", &snapshot.credit_balance.to_string());
        }
        OutputFormat::Plain => println!(
            "{} {} free={} revealed={} credits={}",
            snapshot.id,
            snapshot.color_value,
            snapshot.free_quota_consumed,
            snapshot.revealed,
            snapshot.credit_balance
        ),
    }
}

/// Print a placement result
pub fn print_placement(mark: &PlacedMark, snapshot: &LedgerSnapshot, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "placement": mark,
            "snapshot": snapshot,
        })),
        OutputFormat::Table | OutputFormat::Plain => {
            println!(
                "Placed {} at ({:.3}, {:.3}) [{}]",
                mark.id, mark.x, mark.y, mark.phase
            );
            print_snapshot(snapshot, OutputFormat::Plain);
        }
    }
}

/// Print a placement listing
pub fn print_placements(marks: &[PlacedMark], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&marks),
        OutputFormat::Table => {
            println!(
                "{:<38} {:>7} {:>7} {:<9} {:<5} {}",
                "ID", "X", "Y", "COLOR", "PHASE", "CREATED"
            );
            for mark in marks {
                println!(
                    "{:<38} {:>7.4} {:>7.4} {:<9} {:<5} {}",
                    mark.id,
                    mark.x,
                    mark.y,
                    mark.color_value,
                    mark.phase,
                    mark.created_at.to_rfc3339()
                );
            }
            println!("{} placement(s)", marks.len());
        }
        OutputFormat::Plain => {
            for mark in marks {
                println!("{} {} {} {}", mark.x, mark.y, mark.color_value, mark.phase);
            }
        }
    }
}

/// Print an explicit reveal result
pub fn print_reveal(info: &RevealInfo, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(info),
        OutputFormat::Table | OutputFormat::Plain => {
            if info.revealed_now {
                println!("Canvas revealed.");
            } else {
                println!("Canvas was already revealed.");
            }
            print_snapshot(&info.snapshot, OutputFormat::Plain);
        }
    }
}

/// Print one reconciliation event
pub fn print_event(event: &ReconcileEvent, format: OutputFormat) {
    if format == OutputFormat::Json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("Error formatting JSON: {}", e),
        }
        return;
    }

    match event {
        ReconcileEvent::IdentityRequired => println!("identity required"),
        ReconcileEvent::IdentityAssigned { snapshot } => {
            println!("joined as {} ({})", snapshot.id, snapshot.color_value)
        }
        ReconcileEvent::SnapshotAdopted { snapshot } => println!(
            "snapshot free={} revealed={} credits={}",
            snapshot.free_quota_consumed, snapshot.revealed, snapshot.credit_balance
        ),
        ReconcileEvent::StaleSnapshotIgnored { incoming, held } => {
            println!("stale snapshot ignored ({} < {})", incoming, held)
        }
        ReconcileEvent::Confirmed { key, created_at } => {
            println!("confirmed {} at {}", key, created_at.to_rfc3339())
        }
        ReconcileEvent::RolledBack { key, reason } => {
            println!("rolled back {} ({:?})", key, reason)
        }
        ReconcileEvent::Revealed { .. } => println!("canvas revealed"),
        ReconcileEvent::CanvasLoaded { marks } => println!("canvas loaded: {} marks", marks),
    }
}

/// Print warning message
pub fn print_warning(message: &str) {
    eprintln!("Warning: {}", message);
}

/// Print a table row
pub fn print_row(key: &str, value: &str) {
    println!("{:<14} {}", key, value);
}
