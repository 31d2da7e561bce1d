//! API Routes
//!
//! Route definitions for the placement gateway.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::auth_middleware;
use crate::handlers::*;
use crate::metrics::metrics_middleware;
use crate::state::AppState;

/// Create the API router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let enable_cors = state.config.enable_cors;
    let request_timeout = Duration::from_secs(state.config.request_timeout_secs);
    let max_body_size = state.config.max_body_size;

    // Trusted routes, reached only by the payment confirmation flow
    let internal = Router::new()
        .route(
            "/internal/participants/:participant_id/credits",
            post(grant_credits),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let mut router = Router::new()
        // Health and status
        .route("/health", get(health_check))
        .route("/stats", get(get_stats))
        .route("/colors", get(list_colors))
        // Participant ledger
        .route("/participants", post(create_participant))
        .route("/participants/:participant_id", get(get_participant))
        .route("/participants/:participant_id/reveal", post(reveal))
        // Placements
        .route(
            "/participants/:participant_id/placements",
            post(place_one).get(list_own_placements),
        )
        .route(
            "/participants/:participant_id/placements/batch",
            post(place_batch),
        )
        .route("/participants/:participant_id/canvas", get(list_canvas))
        .merge(internal)
        .with_state(state.clone());

    // Add metrics middleware
    router = router.layer(middleware::from_fn_with_state(state, metrics_middleware));

    router = router
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(TimeoutLayer::new(request_timeout));

    // Add CORS middleware
    if enable_cors {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router.layer(TraceLayer::new_for_http())
}

/// Create a router for the V1 API with /api/v1 prefix
pub fn create_v1_router(state: Arc<AppState>) -> Router {
    Router::new().nest("/api/v1", create_router(state))
}

/// Build the full application router
pub fn build_app(state: AppState) -> Router {
    let state = Arc::new(state);

    let root_router = Router::new().route("/", get(|| async { "Canvas Placement Gateway" }));

    let health_router = Router::new()
        .route("/healthz", get(health_check))
        .with_state(state.clone());

    root_router
        .merge(health_router)
        .merge(create_v1_router(state))
}
