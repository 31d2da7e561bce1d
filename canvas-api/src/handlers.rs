//! API Handlers
//!
//! HTTP handler implementations for the placement gateway. Handlers relay
//! engine decisions and store results; they never compute ledger values.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use canvas_core::{ColorLabel, LedgerSnapshot, ParticipantId, Phase, PlacementDecision, PlacementOutcome};
use std::sync::Arc;

use crate::dto::*;
use crate::error::{ApiError, ApiResult};
use crate::metrics::{record_decision, record_placement, record_reveal};
use crate::state::{AppState, ComponentHealthCheck, HealthStatus};

/// Health check handler
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database = match state.database.health_check().await {
        Ok(_) => ComponentHealthCheck::healthy("database"),
        Err(e) => ComponentHealthCheck::unhealthy("database", e.to_string()),
    };
    let components = vec![database];

    let overall_status = if components.iter().all(|c| c.status == HealthStatus::Healthy) {
        HealthStatus::Healthy
    } else {
        HealthStatus::Unhealthy
    };

    Json(HealthResponse {
        status: overall_status.as_str().to_string(),
        version: state.config.version.clone(),
        uptime_secs: state.uptime_secs(),
        components: components
            .into_iter()
            .map(|c| ComponentHealth {
                name: c.name,
                status: c.status.as_str().to_string(),
                message: c.message,
            })
            .collect(),
    })
}

/// Canvas statistics
pub async fn get_stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<StatsResponse>> {
    let canvas = state.database.stats().await?;
    let policy = state.database.policy();

    Ok(Json(StatsResponse {
        canvas,
        free_quota_limit: policy.free_quota_limit,
        max_batch_size: policy.max_batch_size,
        total_requests: state.request_count().await,
        uptime_secs: state.uptime_secs(),
    }))
}

/// Palette labels and remaining capacity
pub async fn list_colors(State(state): State<Arc<AppState>>) -> ApiResult<Json<PaletteResponse>> {
    let colors = state.database.registration.availability().await?;
    Ok(Json(PaletteResponse { colors }))
}

/// Create a participant with a freshly allocated color
pub async fn create_participant(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateParticipantRequest>,
) -> ApiResult<(StatusCode, Json<LedgerSnapshot>)> {
    let label: ColorLabel = request.color_label.parse()?;
    let snapshot = state.database.registration.register(label).await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// Current ledger snapshot
pub async fn get_participant(
    State(state): State<Arc<AppState>>,
    Path(participant_id): Path<String>,
) -> ApiResult<Json<LedgerSnapshot>> {
    let snapshot = state
        .database
        .view
        .snapshot(&ParticipantId::new(participant_id))
        .await?;
    Ok(Json(snapshot))
}

/// Place one mark
///
/// Without an idempotency key a request that timed out may still have been
/// applied, so retrying it can place a second mark.
pub async fn place_one(
    State(state): State<Arc<AppState>>,
    Path(participant_id): Path<String>,
    Json(item): Json<PlacementItemRequest>,
) -> ApiResult<Json<PlaceResponse>> {
    let request = item.into_request()?;
    let decision = state
        .database
        .consumption
        .place(&ParticipantId::new(participant_id), request)
        .await?;

    record_decision(&decision);
    if let PlacementDecision::Accepted { placement, snapshot } = &decision {
        if placement.phase == Phase::Free && snapshot.revealed {
            record_reveal("implicit");
        }
    }

    match decision {
        PlacementDecision::Accepted {
            placement,
            snapshot,
        } => Ok(Json(PlaceResponse {
            outcome: PlacementOutcome::Accepted,
            placement: PlacementDto::own(&placement),
            snapshot,
        })),
        PlacementDecision::Replayed {
            placement,
            snapshot,
        } => Ok(Json(PlaceResponse {
            outcome: PlacementOutcome::Replayed,
            placement: PlacementDto::own(&placement),
            snapshot,
        })),
        PlacementDecision::QuotaExhausted { snapshot } => {
            Err(ApiError::quota_exhausted(snapshot, Vec::new()))
        }
        PlacementDecision::InsufficientCredits { snapshot } => {
            Err(ApiError::insufficient_credits(snapshot, Vec::new()))
        }
    }
}

/// Place an ordered batch, stopping at the first quota or credit rejection
pub async fn place_batch(
    State(state): State<Arc<AppState>>,
    Path(participant_id): Path<String>,
    Json(batch): Json<BatchPlaceRequest>,
) -> ApiResult<Json<BatchPlaceResponse>> {
    let requests = batch
        .items
        .into_iter()
        .map(PlacementItemRequest::into_request)
        .collect::<ApiResult<Vec<_>>>()?;

    let decision = state
        .database
        .consumption
        .place_batch(&ParticipantId::new(participant_id), requests)
        .await?;

    for placement in &decision.accepted {
        record_placement(placement.phase.as_str(), PlacementOutcome::Accepted.as_str());
    }
    if decision.revealed_now {
        record_reveal("implicit");
    }

    let accepted: Vec<PlacementDto> = decision.accepted.iter().map(PlacementDto::own).collect();
    match decision.rejection {
        None => Ok(Json(BatchPlaceResponse {
            accepted,
            snapshot: decision.snapshot,
        })),
        Some(rejection) => {
            tracing::debug!(
                index = rejection.index,
                not_attempted = rejection.not_attempted,
                outcome = rejection.outcome.as_str(),
                "Batch short-circuited"
            );
            match rejection.outcome {
                PlacementOutcome::InsufficientCredits => {
                    record_placement("paid", rejection.outcome.as_str());
                    Err(ApiError::insufficient_credits(decision.snapshot, accepted))
                }
                _ => {
                    record_placement("free", rejection.outcome.as_str());
                    Err(ApiError::quota_exhausted(decision.snapshot, accepted))
                }
            }
        }
    }
}

/// Explicit reveal
pub async fn reveal(
    State(state): State<Arc<AppState>>,
    Path(participant_id): Path<String>,
) -> ApiResult<Json<RevealResponse>> {
    let result = state
        .database
        .reveal
        .reveal(&ParticipantId::new(participant_id))
        .await?;

    if result.revealed_now {
        record_reveal("explicit");
    }

    Ok(Json(RevealResponse {
        snapshot: result.snapshot,
        revealed_now: result.revealed_now,
    }))
}

/// The participant's own placements; always permitted
pub async fn list_own_placements(
    State(state): State<Arc<AppState>>,
    Path(participant_id): Path<String>,
) -> ApiResult<Json<PlacementListResponse>> {
    let placements = state
        .database
        .view
        .list_own(&ParticipantId::new(participant_id))
        .await?;
    Ok(Json(PlacementListResponse::new(
        placements.iter().map(PlacementDto::own).collect(),
    )))
}

/// Every placement on the canvas; forbidden until the requester is revealed
pub async fn list_canvas(
    State(state): State<Arc<AppState>>,
    Path(participant_id): Path<String>,
) -> ApiResult<Json<PlacementListResponse>> {
    let placements = state
        .database
        .view
        .list_all(&ParticipantId::new(participant_id))
        .await?;
    Ok(Json(PlacementListResponse::new(
        placements.iter().map(PlacementDto::public).collect(),
    )))
}

/// Credit grant from the trusted payment flow
pub async fn grant_credits(
    State(state): State<Arc<AppState>>,
    Path(participant_id): Path<String>,
    Json(request): Json<GrantCreditsRequest>,
) -> ApiResult<Json<GrantCreditsResponse>> {
    let participant_id = ParticipantId::new(participant_id);
    let credit_balance = state
        .database
        .credits
        .grant(&participant_id, request.amount)
        .await?;

    Ok(Json(GrantCreditsResponse {
        participant_id: participant_id.0,
        credit_balance,
    }))
}
