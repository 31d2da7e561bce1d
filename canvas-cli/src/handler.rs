//! Command Handlers
//!
//! Handler functions for CLI commands.

use canvas_api::{ApiConfig, AppState, MetricsConfig};
use canvas_client::{
    CanvasClient, ClientError, PlacementItem, ReconcileEvent, Reconciler, ReconcilerConfig,
    RetryPolicy, SessionState, SubmissionPolicy,
};
use canvas_core::{ColorLabel, IdempotencyKey, ParticipantId, Phase, QuotaPolicy};
use canvas_store::{CanvasDatabase, StoreConfig};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

use crate::commands::{Cli, Commands, OutputFormat, PhaseArg};
use crate::error::{CliError, CliResult};
use crate::output;

/// Run the CLI with parsed arguments
pub async fn run(cli: Cli) -> CliResult<()> {
    let format = cli.format;
    match cli.command {
        Commands::Init => handle_init(&cli.db_url).await,
        Commands::Start {
            host,
            port,
            free_quota,
            max_batch,
            db_timeout_ms,
        } => {
            let policy = QuotaPolicy {
                free_quota_limit: free_quota,
                max_batch_size: max_batch,
            };
            let store_config = StoreConfig::from_url(&cli.db_url)
                .with_op_timeout(Duration::from_millis(db_timeout_ms));
            handle_start(store_config, &host, port, policy).await
        }
        command => {
            let client = CanvasClient::new(&cli.api_url)?;
            handle_client_command(&client, command, format).await
        }
    }
}

/// Commands that talk to a running gateway
async fn handle_client_command(
    client: &CanvasClient,
    command: Commands,
    format: OutputFormat,
) -> CliResult<()> {
    match command {
        Commands::Health => output::print_health(&client.health().await?, format),
        Commands::Stats => output::print_stats(&client.stats().await?, format),
        Commands::Colors => output::print_colors(&client.colors().await?, format),
        Commands::Join { label } => {
            let snapshot = client.create_participant(parse_label(&label)?).await?;
            output::print_snapshot(&snapshot, format);
        }
        Commands::Status { participant } => {
            let snapshot = client.get_participant(&ParticipantId::new(participant)).await?;
            output::print_snapshot(&snapshot, format);
        }
        Commands::Place {
            participant,
            x,
            y,
            key,
            phase,
        } => handle_place(client, ParticipantId::new(participant), x, y, key, phase, format).await?,
        Commands::Reveal { participant } => {
            let info = client.reveal(&ParticipantId::new(participant)).await?;
            output::print_reveal(&info, format);
        }
        Commands::Mine { participant } => {
            let marks = client.own_placements(&ParticipantId::new(participant)).await?;
            output::print_placements(&marks, format);
        }
        Commands::Canvas { participant } => {
            let marks = client.canvas(&ParticipantId::new(participant)).await?;
            output::print_placements(&marks, format);
        }
        Commands::Grant {
            participant,
            amount,
            api_key,
        } => {
            if amount < 1 {
                return Err(CliError::invalid_arg("amount must be at least 1"));
            }
            let id = ParticipantId::new(participant);
            let balance = client.grant_credits(&id, amount, api_key.as_deref()).await?;
            match format {
                OutputFormat::Json => output::print_json(&serde_json::json!({
                    "participant_id": id,
                    "credit_balance": balance,
                })),
                OutputFormat::Table | OutputFormat::Plain => {
                    println!("{} now has {} credit(s)", id, balance)
                }
            }
        }
        Commands::Scribble {
            participant,
            label,
            count,
            batch,
            in_flight,
        } => {
            let submission = SubmissionPolicy {
                max_batch: batch.max(1),
                max_in_flight: in_flight.max(1),
                ..SubmissionPolicy::default()
            };
            handle_scribble(client, participant, &label, count, submission, format).await?
        }
        Commands::Init | Commands::Start { .. } => {
            return Err(CliError::invalid_arg("command does not use the gateway"))
        }
    }
    Ok(())
}

/// Handle database initialization
async fn handle_init(db_url: &str) -> CliResult<()> {
    let store_config = StoreConfig::from_url(db_url);

    println!("Initializing canvas database...");
    println!("  Location: {:?}", store_config.location);

    let database = CanvasDatabase::open(&store_config, QuotaPolicy::default())
        .map_err(|e| CliError::database(format!("Database open failed: {}", e)))?;
    database
        .init_schema()
        .await
        .map_err(|e| CliError::database(format!("Schema initialization failed: {}", e)))?;

    println!("Database schema initialized successfully.");
    Ok(())
}

/// Handle starting the gateway
async fn handle_start(
    store_config: StoreConfig,
    host: &str,
    port: u16,
    policy: QuotaPolicy,
) -> CliResult<()> {
    println!("Starting canvas gateway...");
    println!("  Host: {}:{}", host, port);
    println!("  Database: {:?}", store_config.location);
    println!(
        "  Free quota: {}, max batch: {}",
        policy.free_quota_limit, policy.max_batch_size
    );

    canvas_api::init_metrics(&MetricsConfig::from_env()).map_err(CliError::config)?;

    let api_config = ApiConfig {
        listen_addr: format!("{}:{}", host, port),
        ..ApiConfig::default()
    };

    // Schema is created on first run.
    let state = AppState::with_sqlite(store_config, policy, api_config)
        .await
        .map_err(|e| CliError::server(format!("Startup failed: {}", e)))?;

    println!("Starting server on {}:{}...", host, port);

    canvas_api::start_server(state)
        .await
        .map_err(|e| CliError::server(format!("Server error: {}", e)))
}

/// Handle a single placement
async fn handle_place(
    client: &CanvasClient,
    participant: ParticipantId,
    x: f64,
    y: f64,
    key: Option<String>,
    phase: Option<PhaseArg>,
    format: OutputFormat,
) -> CliResult<()> {
    let key = match key {
        Some(key) => IdempotencyKey::parse(key).map_err(|e| CliError::invalid_arg(e.to_string()))?,
        None => IdempotencyKey::generate(),
    };
    let phase = match phase {
        Some(phase) => Phase::from(phase),
        None => Phase::for_revealed(client.get_participant(&participant).await?.revealed),
    };

    let item = PlacementItem {
        x,
        y,
        idempotency_key: key.0,
        phase,
    };

    match client.place(&participant, &item).await {
        Ok((mark, snapshot)) => {
            output::print_placement(&mark, &snapshot, format);
            Ok(())
        }
        Err(e) => {
            if let ClientError::QuotaExhausted { snapshot, .. }
            | ClientError::InsufficientCredits { snapshot, .. } = &e
            {
                output::print_warning(&e.to_string());
                output::print_snapshot(snapshot, format);
            }
            Err(e.into())
        }
    }
}

/// Drive the reconciliation layer with random marks
async fn handle_scribble(
    client: &CanvasClient,
    participant: Option<String>,
    label: &str,
    count: usize,
    submission: SubmissionPolicy,
    format: OutputFormat,
) -> CliResult<()> {
    let stats = client.stats().await?;
    let config = ReconcilerConfig {
        submission,
        retry: RetryPolicy::default(),
        ..ReconcilerConfig::default()
    }
    .with_server_policy(&stats);
    let mut reconciler = Reconciler::new(Arc::new(client.clone()), config);

    let events = reconciler.start(participant.map(ParticipantId::new)).await?;
    print_events(&events, format);
    if reconciler.session().state() == SessionState::SelectingIdentity {
        let events = reconciler.join(parse_label(label)?).await?;
        print_events(&events, format);
    }

    let points: Vec<(f64, f64)> = {
        let mut rng = rand::thread_rng();
        (0..count).map(|_| (rng.gen::<f64>(), rng.gen::<f64>())).collect()
    };

    let mut placed = 0;
    for (x, y) in points {
        match reconciler.place(x, y) {
            Ok(_) => placed += 1,
            Err(ClientError::NoCapacity { phase }) => {
                output::print_warning(&format!("no {} capacity left after {} mark(s)", phase, placed));
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    let events = reconciler.settle().await?;
    print_events(&events, format);

    let session = reconciler.session();
    if let Some(snapshot) = session.snapshot() {
        output::print_snapshot(snapshot, format);
    }
    if format != OutputFormat::Json {
        println!(
            "{} mark(s) attempted, {} on screen",
            placed,
            session.render_set().len()
        );
    }
    Ok(())
}

fn print_events(events: &[ReconcileEvent], format: OutputFormat) {
    for event in events {
        output::print_event(event, format);
    }
}

fn parse_label(label: &str) -> CliResult<ColorLabel> {
    label
        .parse()
        .map_err(|e: canvas_core::CanvasError| CliError::invalid_arg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_label() {
        assert_eq!(parse_label("blue").unwrap(), ColorLabel::Blue);
        assert!(matches!(
            parse_label("teal"),
            Err(CliError::InvalidArgument { .. })
        ));
    }
}
