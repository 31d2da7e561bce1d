//! Prometheus Metrics
//!
//! # Metrics
//!
//! ## Counters
//! - `canvas_http_requests_total` - HTTP requests by method, path, status
//! - `canvas_placements_total` - Placement decisions by phase, outcome
//! - `canvas_reveals_total` - Reveal transitions by path (`implicit`, `explicit`)
//! - `canvas_errors_total` - Error responses by code
//!
//! ## Histograms
//! - `canvas_http_request_duration_seconds` - HTTP request duration
//!
//! ## Gauges
//! - `canvas_requests_seen` - Requests handled since start
//! - `canvas_uptime_seconds` - Service uptime
//!
//! # Configuration
//!
//! - `CANVAS_METRICS_ENABLED`: Enable metrics (default: true)
//! - `CANVAS_METRICS_PORT`: Metrics server port (default: 9090)

use axum::{
    extract::{OriginalUri, Request, State},
    middleware::Next,
    response::Response,
};
use canvas_core::PlacementDecision;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::state::AppState;

/// Metrics configuration
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are enabled
    pub enabled: bool,
    /// Port for the scrape endpoint
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 9090,
        }
    }
}

impl MetricsConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let enabled = std::env::var("CANVAS_METRICS_ENABLED")
            .map(|v| v.to_lowercase() != "false" && v != "0")
            .unwrap_or(true);

        let port = std::env::var("CANVAS_METRICS_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(9090);

        Self { enabled, port }
    }
}

/// Install the Prometheus recorder and its scrape listener.
///
/// Call once at startup, from within a tokio runtime.
pub fn init_metrics(config: &MetricsConfig) -> Result<(), String> {
    if !config.enabled {
        tracing::info!("Metrics disabled");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from(([0, 0, 0, 0], config.port)))
        .install()
        .map_err(|e| format!("Failed to install metrics recorder: {}", e))?;

    tracing::info!(port = config.port, "Metrics initialized");
    Ok(())
}

/// Record a request metric
pub fn record_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", normalize_path(path)),
        ("status", status.to_string()),
    ];

    counter!("canvas_http_requests_total", &labels).increment(1);
    histogram!("canvas_http_request_duration_seconds", &labels).record(duration_secs);
}

/// Record a single engine decision
pub fn record_decision(decision: &PlacementDecision) {
    let phase = match decision {
        PlacementDecision::Accepted { placement, .. }
        | PlacementDecision::Replayed { placement, .. } => placement.phase.as_str(),
        PlacementDecision::QuotaExhausted { .. } => "free",
        PlacementDecision::InsufficientCredits { .. } => "paid",
    };
    record_placement(phase, decision.outcome().as_str());
}

/// Record a placement outcome
pub fn record_placement(phase: &str, outcome: &str) {
    counter!(
        "canvas_placements_total",
        "phase" => phase.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a reveal transition
pub fn record_reveal(via: &'static str) {
    counter!("canvas_reveals_total", "via" => via).increment(1);
}

/// Record an error
pub fn record_error(error_type: &str) {
    counter!("canvas_errors_total", "type" => error_type.to_string()).increment(1);
}

/// Normalize path for metric labels (ids become `:id`)
fn normalize_path(path: &str) -> String {
    let normalized = path
        .split('/')
        .map(|part| {
            if part.len() >= 8 && part.chars().all(|c| c.is_ascii_hexdigit() || c == '-') {
                ":id"
            } else {
                part
            }
        })
        .collect::<Vec<_>>()
        .join("/");

    if normalized.len() > 64 {
        normalized.chars().take(64).collect()
    } else {
        normalized
    }
}

/// Metrics middleware for tracking HTTP requests
pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.0.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let seen = state.increment_requests().await;
    gauge!("canvas_requests_seen").set(seen as f64);
    gauge!("canvas_uptime_seconds").set(state.uptime_secs() as f64);

    let response = next.run(request).await;

    let duration = start.elapsed().as_secs_f64();
    record_request(&method, &path, response.status().as_u16(), duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_config_default() {
        let config = MetricsConfig::default();
        assert!(config.enabled);
        assert_eq!(config.port, 9090);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/api/v1/health"), "/api/v1/health");
        assert_eq!(
            normalize_path("/api/v1/participants/550e8400-e29b-41d4-a716-446655440000/placements"),
            "/api/v1/participants/:id/placements"
        );
        assert_eq!(normalize_path("/api/v1/colors"), "/api/v1/colors");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_placement("free", "accepted");
        record_reveal("implicit");
        record_error("VALIDATION_ERROR");
    }
}
