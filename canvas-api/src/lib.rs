//! Canvas API - Placement Gateway
//!
//! HTTP interface to the quota-gated placement ledger.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 Canvas API                  │
//! │  ┌─────────────────────────────────────┐    │
//! │  │           HTTP Routes               │    │
//! │  │   /participants, /placements        │    │
//! │  │   /reveal, /canvas, /internal       │    │
//! │  └─────────────────────────────────────┘    │
//! │           │              │           │      │
//! │           ▼              ▼           ▼      │
//! │  ┌─────────────┐ ┌─────────────┐ ┌────────┐ │
//! │  │  Handlers   │ │    DTOs     │ │ State  │ │
//! │  └─────────────┘ └─────────────┘ └────────┘ │
//! └─────────────────────────────────────────────┘
//!                        │
//!                        ▼
//!                   canvas-store
//! ```
//!
//! # Endpoints
//!
//! ## Health & Status
//! - `GET /healthz`, `GET /api/v1/health` - Store health
//! - `GET /api/v1/stats` - Canvas counters
//! - `GET /api/v1/colors` - Palette labels and remaining capacity
//!
//! ## Participants
//! - `POST /api/v1/participants` - Claim a color, start blind
//! - `GET /api/v1/participants/:id` - Ledger snapshot
//! - `POST /api/v1/participants/:id/reveal` - Explicit reveal
//!
//! ## Placements
//! - `POST /api/v1/participants/:id/placements` - Place one mark
//! - `POST /api/v1/participants/:id/placements/batch` - Place an ordered batch
//! - `GET /api/v1/participants/:id/placements` - Own marks
//! - `GET /api/v1/participants/:id/canvas` - All marks (revealed only)
//!
//! ## Internal
//! - `POST /api/v1/internal/participants/:id/credits` - Grant credits
//!
//! # Usage Example
//!
//! ```ignore
//! use canvas_api::{ApiConfig, AppState, start_server};
//! use canvas_core::QuotaPolicy;
//! use canvas_store::StoreConfig;
//!
//! #[tokio::main]
//! async fn main() {
//!     let state = AppState::with_sqlite(
//!         StoreConfig::from_url("canvas.db"),
//!         QuotaPolicy::default(),
//!         ApiConfig::default(),
//!     )
//!     .await
//!     .unwrap();
//!     start_server(state).await.unwrap();
//! }
//! ```

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;

// Re-export main types
pub use auth::AuthConfig;
pub use dto::*;
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use metrics::{init_metrics, MetricsConfig};
pub use routes::{build_app, create_router, create_v1_router};
pub use state::{ApiConfig, AppState, ComponentHealthCheck, HealthStatus};

use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Canvas API version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default API port
pub const DEFAULT_PORT: u16 = 3000;

/// Start the API server and serve until shutdown
pub async fn start_server(state: AppState) -> Result<(), std::io::Error> {
    let addr = state.config.listen_addr.clone();
    let app = build_app(state);

    tracing::info!("Starting canvas API server on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await
}

/// Start the API server in a background task. Returns the bound address.
///
/// Useful with port 0 in tests.
pub async fn start_background_server(state: AppState) -> Result<SocketAddr, std::io::Error> {
    let listener = TcpListener::bind(&state.config.listen_addr).await?;
    let actual_addr = listener.local_addr()?;
    let app = build_app(state);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Server error: {}", e);
        }
    });

    tracing::info!("Canvas API server listening on {}", actual_addr);
    Ok(actual_addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_port() {
        assert_eq!(DEFAULT_PORT, 3000);
    }

    #[test]
    fn test_api_config_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.listen_addr, "0.0.0.0:3000");
        assert!(config.enable_cors);
        assert_eq!(config.request_timeout_secs, 30);
    }
}
