//! Data Transfer Objects
//!
//! Request and response DTOs for the placement gateway.

use canvas_core::{
    IdempotencyKey, LedgerSnapshot, Phase, Placement, PlacementOutcome, PlacementRequest, Position,
};
use canvas_store::{CanvasStats, PaletteAvailability};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

// ============================================
// Participant DTOs
// ============================================

/// Request to create a participant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateParticipantRequest {
    /// One of the palette labels (`red`, `blue`, ...)
    pub color_label: String,
}

/// Palette listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaletteResponse {
    pub colors: Vec<PaletteAvailability>,
}

// ============================================
// Placement DTOs
// ============================================

/// One proposed placement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementItemRequest {
    pub x: f64,
    pub y: f64,
    /// Client-generated idempotency key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    /// Phase the client expects to be charged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
}

impl PlacementItemRequest {
    /// Convert into an engine request. Coordinates are checked by the engine.
    pub fn into_request(self) -> ApiResult<PlacementRequest> {
        let mut request = PlacementRequest::new(Position {
            x: self.x,
            y: self.y,
        });
        if let Some(key) = self.idempotency_key {
            let key = IdempotencyKey::parse(key).map_err(|e| ApiError::validation(e.to_string()))?;
            request = request.with_key(key);
        }
        if let Some(phase) = self.phase {
            request = request.with_phase_hint(phase);
        }
        Ok(request)
    }
}

/// Ordered batch of proposed placements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPlaceRequest {
    pub items: Vec<PlacementItemRequest>,
}

/// Placement as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementDto {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub color_value: String,
    pub phase: Phase,
    /// Present only on the owner's own placements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PlacementDto {
    /// Owner view, including the idempotency key
    pub fn own(placement: &Placement) -> Self {
        Self {
            idempotency_key: placement
                .idempotency_key
                .as_ref()
                .map(|k| k.as_str().to_string()),
            ..Self::public(placement)
        }
    }

    /// Shared canvas view
    pub fn public(placement: &Placement) -> Self {
        Self {
            id: placement.id.as_str().to_string(),
            x: placement.position.x,
            y: placement.position.y,
            color_value: placement.color_value.as_str().to_string(),
            phase: placement.phase,
            idempotency_key: None,
            created_at: placement.created_at,
        }
    }
}

/// Single placement accepted (or replayed)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceResponse {
    /// `accepted` or `replayed`
    pub outcome: PlacementOutcome,
    pub placement: PlacementDto,
    pub snapshot: LedgerSnapshot,
}

/// Batch fully applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPlaceResponse {
    pub accepted: Vec<PlacementDto>,
    pub snapshot: LedgerSnapshot,
}

/// Placement listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementListResponse {
    pub placements: Vec<PlacementDto>,
    pub total: usize,
}

impl PlacementListResponse {
    pub fn new(placements: Vec<PlacementDto>) -> Self {
        Self {
            total: placements.len(),
            placements,
        }
    }
}

// ============================================
// Reveal / Credit DTOs
// ============================================

/// Explicit reveal result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealResponse {
    pub snapshot: LedgerSnapshot,
    /// Whether this request performed the transition
    pub revealed_now: bool,
}

/// Credit grant request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantCreditsRequest {
    pub amount: i64,
}

/// Credit grant result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantCreditsResponse {
    pub participant_id: String,
    pub credit_balance: u32,
}

// ============================================
// Health & Stats DTOs
// ============================================

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub components: Vec<ComponentHealth>,
}

/// Component health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Canvas statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub canvas: CanvasStats,
    pub free_quota_limit: u32,
    pub max_batch_size: usize,
    pub total_requests: u64,
    pub uptime_secs: u64,
}
