//! Authentication for trusted routes
//!
//! Participants are anonymous; their session id in the path is the only
//! credential. The internal routes (credit grants from the payment flow) are
//! guarded by this middleware.
//!
//! ## API Key (Header)
//! ```text
//! X-API-Key: your-api-key-here
//! ```
//!
//! ## Bearer Token
//! ```text
//! Authorization: Bearer your-token-here
//! ```
//!
//! # Configuration
//!
//! - `CANVAS_API_KEYS`: Comma separated keys, accepted in either header
//! - `CANVAS_AUTH_ENABLED`: Enable/disable authentication (default: false)

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::error::ErrorResponse;
use crate::state::AppState;

/// Authentication configuration
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Whether authentication is enabled
    pub enabled: bool,
    /// Accepted keys
    pub api_keys: Vec<String>,
}

impl AuthConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let enabled = std::env::var("CANVAS_AUTH_ENABLED")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(false);

        let api_keys = std::env::var("CANVAS_API_KEYS")
            .map(|v| parse_keys(&v))
            .unwrap_or_default();

        Self { enabled, api_keys }
    }

    /// Enabled configuration with the given keys
    pub fn with_keys(keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            enabled: true,
            api_keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Validate an API key
    pub fn validate_api_key(&self, key: &str) -> bool {
        !key.is_empty() && self.api_keys.iter().any(|k| k == key)
    }
}

fn parse_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn unauthorized(message: &str) -> Response {
    crate::metrics::record_error("UNAUTHORIZED");
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        }),
    )
        .into_response()
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let auth_config = &state.auth_config;

    if !auth_config.enabled {
        return next.run(request).await;
    }

    // X-API-Key header
    if let Some(api_key) = request.headers().get("X-API-Key") {
        if let Ok(key) = api_key.to_str() {
            if auth_config.validate_api_key(key) {
                return next.run(request).await;
            }
        }
        return unauthorized("Invalid API key");
    }

    // Authorization: Bearer <key>
    if let Some(auth_header) = request.headers().get(AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                if auth_config.validate_api_key(token) {
                    return next.run(request).await;
                }
                return unauthorized("Invalid bearer token");
            }
        }
    }

    unauthorized("Authentication required. Provide X-API-Key header or Authorization: Bearer <token>")
}
