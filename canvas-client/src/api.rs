//! HTTP client for the canvas gateway

use canvas_core::{ColorLabel, LedgerSnapshot, ParticipantId, Phase, PlacementOutcome};
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ClientError, ClientResult};

/// Default gateway base URL
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

// ============================================
// Wire types
// ============================================

/// Proposed placement as sent to the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementItem {
    pub x: f64,
    pub y: f64,
    pub idempotency_key: String,
    pub phase: Phase,
}

/// Accepted mark as returned by the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedMark {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub color_value: String,
    pub phase: Phase,
    #[serde(default)]
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Remaining capacity of one palette label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorAvailability {
    pub label: ColorLabel,
    pub total: usize,
    pub remaining: usize,
}

/// Gateway health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthInfo {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Gateway counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsInfo {
    pub participants: u64,
    pub revealed_participants: u64,
    pub placements: u64,
    pub free_placements: u64,
    pub paid_placements: u64,
    pub free_quota_limit: u32,
    pub max_batch_size: usize,
    pub total_requests: u64,
    pub uptime_secs: u64,
}

/// Explicit reveal result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealInfo {
    pub snapshot: LedgerSnapshot,
    pub revealed_now: bool,
}

/// Which ledger check stopped a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    QuotaExhausted,
    InsufficientCredits,
}

/// Ledger decision for one submitted batch
///
/// `accepted` holds the applied prefix in submission order. Items after the
/// prefix were either rejected (`rejection` is set) or not attempted.
#[derive(Debug, Clone)]
pub struct Submission {
    pub accepted: Vec<PlacedMark>,
    pub snapshot: LedgerSnapshot,
    pub rejection: Option<Rejection>,
}

#[derive(Debug, Serialize)]
struct CreateParticipantBody<'a> {
    color_label: &'a str,
}

#[derive(Debug, Serialize)]
struct BatchBody<'a> {
    items: &'a [PlacementItem],
}

#[derive(Debug, Serialize)]
struct GrantBody {
    amount: i64,
}

#[derive(Debug, Deserialize)]
struct PlaceBody {
    #[allow(dead_code)]
    outcome: PlacementOutcome,
    placement: PlacedMark,
    snapshot: LedgerSnapshot,
}

#[derive(Debug, Deserialize)]
struct BatchResponseBody {
    accepted: Vec<PlacedMark>,
    snapshot: LedgerSnapshot,
}

#[derive(Debug, Deserialize)]
struct ListBody {
    placements: Vec<PlacedMark>,
}

#[derive(Debug, Deserialize)]
struct PaletteBody {
    colors: Vec<ColorAvailability>,
}

#[derive(Debug, Deserialize)]
struct GrantResponseBody {
    credit_balance: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(default)]
    details: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RejectionDetails {
    snapshot: LedgerSnapshot,
    #[serde(default)]
    accepted: Vec<PlacedMark>,
}

#[derive(Debug, Deserialize)]
struct QuotaNotMetDetails {
    consumed: u32,
    limit: u32,
}

// ============================================
// Client
// ============================================

/// Canvas gateway client
#[derive(Clone)]
pub struct CanvasClient {
    client: Client,
    base_url: String,
}

impl CanvasClient {
    /// Create a new client
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    /// Create a client with a custom request timeout
    pub fn with_timeout(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::connection(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    /// Check gateway health
    pub async fn health(&self) -> ClientResult<HealthInfo> {
        let response = self.client.get(self.url("/health")).send().await?;
        read_json(response).await
    }

    /// Fetch gateway counters
    pub async fn stats(&self) -> ClientResult<StatsInfo> {
        let response = self.client.get(self.url("/stats")).send().await?;
        read_json(response).await
    }

    /// List palette labels with remaining capacity
    pub async fn colors(&self) -> ClientResult<Vec<ColorAvailability>> {
        let response = self.client.get(self.url("/colors")).send().await?;
        let body: PaletteBody = read_json(response).await?;
        Ok(body.colors)
    }

    /// Create a participant for the chosen label
    pub async fn create_participant(&self, label: ColorLabel) -> ClientResult<LedgerSnapshot> {
        let response = self
            .client
            .post(self.url("/participants"))
            .json(&CreateParticipantBody {
                color_label: label.as_str(),
            })
            .send()
            .await?;
        read_json(response).await
    }

    /// Fetch the authoritative snapshot
    pub async fn get_participant(&self, id: &ParticipantId) -> ClientResult<LedgerSnapshot> {
        let response = self
            .client
            .get(self.url(&format!("/participants/{}", id)))
            .send()
            .await?;
        read_json(response).await
    }

    /// Submit an ordered batch. A single item goes through the single placement route.
    ///
    /// Quota and credit rejections come back as `Ok` with `rejection` set.
    pub async fn submit(
        &self,
        id: &ParticipantId,
        items: &[PlacementItem],
    ) -> ClientResult<Submission> {
        let result = match items {
            [item] => self.place(id, item).await.map(|(mark, snapshot)| Submission {
                accepted: vec![mark],
                snapshot,
                rejection: None,
            }),
            _ => self.place_batch(id, items).await.map(|(accepted, snapshot)| Submission {
                accepted,
                snapshot,
                rejection: None,
            }),
        };

        match result {
            Err(ClientError::QuotaExhausted { snapshot, accepted }) => Ok(Submission {
                accepted,
                snapshot: *snapshot,
                rejection: Some(Rejection::QuotaExhausted),
            }),
            Err(ClientError::InsufficientCredits { snapshot, accepted }) => Ok(Submission {
                accepted,
                snapshot: *snapshot,
                rejection: Some(Rejection::InsufficientCredits),
            }),
            other => other,
        }
    }

    /// Place a single mark
    pub async fn place(
        &self,
        id: &ParticipantId,
        item: &PlacementItem,
    ) -> ClientResult<(PlacedMark, LedgerSnapshot)> {
        let response = self
            .client
            .post(self.url(&format!("/participants/{}/placements", id)))
            .json(item)
            .send()
            .await?;
        let body: PlaceBody = read_json(response).await?;
        Ok((body.placement, body.snapshot))
    }

    /// Place an ordered batch of marks
    pub async fn place_batch(
        &self,
        id: &ParticipantId,
        items: &[PlacementItem],
    ) -> ClientResult<(Vec<PlacedMark>, LedgerSnapshot)> {
        let response = self
            .client
            .post(self.url(&format!("/participants/{}/placements/batch", id)))
            .json(&BatchBody { items })
            .send()
            .await?;
        let body: BatchResponseBody = read_json(response).await?;
        Ok((body.accepted, body.snapshot))
    }

    /// Request the explicit reveal
    pub async fn reveal(&self, id: &ParticipantId) -> ClientResult<RevealInfo> {
        let response = self
            .client
            .post(self.url(&format!("/participants/{}/reveal", id)))
            .send()
            .await?;
        read_json(response).await
    }

    /// List the participant's own marks
    pub async fn own_placements(&self, id: &ParticipantId) -> ClientResult<Vec<PlacedMark>> {
        let response = self
            .client
            .get(self.url(&format!("/participants/{}/placements", id)))
            .send()
            .await?;
        let body: ListBody = read_json(response).await?;
        Ok(body.placements)
    }

    /// List every mark on the canvas. Fails with `NotRevealed` before reveal.
    pub async fn canvas(&self, id: &ParticipantId) -> ClientResult<Vec<PlacedMark>> {
        let response = self
            .client
            .get(self.url(&format!("/participants/{}/canvas", id)))
            .send()
            .await?;
        let body: ListBody = read_json(response).await?;
        Ok(body.placements)
    }

    /// Grant credits through the internal route. Returns the new balance.
    pub async fn grant_credits(
        &self,
        id: &ParticipantId,
        amount: i64,
        api_key: Option<&str>,
    ) -> ClientResult<u32> {
        let mut request = self
            .client
            .post(self.url(&format!("/internal/participants/{}/credits", id)))
            .json(&GrantBody { amount });
        if let Some(key) = api_key {
            request = request.header("X-API-Key", key);
        }
        let body: GrantResponseBody = read_json(request.send().await?).await?;
        Ok(body.credit_balance)
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    if response.status().is_success() {
        Ok(response.json().await?)
    } else {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        Err(error_from_body(status, &text))
    }
}

/// Map a gateway error body onto a typed client error
pub(crate) fn error_from_body(status: StatusCode, text: &str) -> ClientError {
    let body: ErrorBody = match serde_json::from_str(text) {
        Ok(body) => body,
        Err(_) => return ClientError::api(status.as_u16(), text),
    };

    let rejection = || {
        body.details
            .clone()
            .and_then(|d| serde_json::from_value::<RejectionDetails>(d).ok())
    };

    match body.code.as_str() {
        "QUOTA_EXHAUSTED" => match rejection() {
            Some(d) => ClientError::QuotaExhausted {
                snapshot: Box::new(d.snapshot),
                accepted: d.accepted,
            },
            None => ClientError::api(status.as_u16(), body.message),
        },
        "INSUFFICIENT_CREDITS" => match rejection() {
            Some(d) => ClientError::InsufficientCredits {
                snapshot: Box::new(d.snapshot),
                accepted: d.accepted,
            },
            None => ClientError::api(status.as_u16(), body.message),
        },
        "QUOTA_NOT_MET" => match body
            .details
            .and_then(|d| serde_json::from_value::<QuotaNotMetDetails>(d).ok())
        {
            Some(d) => ClientError::QuotaNotMet {
                consumed: d.consumed,
                limit: d.limit,
            },
            None => ClientError::api(status.as_u16(), body.message),
        },
        "NOT_FOUND" => ClientError::NotFound {
            message: body.message,
        },
        "VALIDATION_ERROR" => ClientError::validation(body.message),
        "NOT_REVEALED" => ClientError::NotRevealed,
        "STORE_UNAVAILABLE" => ClientError::Unavailable {
            message: body.message,
        },
        _ => ClientError::api(status.as_u16(), body.message),
    }
}
