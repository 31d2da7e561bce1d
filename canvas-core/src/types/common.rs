//! Common identifier types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CanvasError, CanvasResult};

/// Maximum accepted length of a client-supplied idempotency key
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

/// Participant ID (opaque session identifier)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Placement ID (system generated)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlacementId(pub String);

impl PlacementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Idempotency key, unique per participant
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(pub String);

impl IdempotencyKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Parse a client-supplied key
    pub fn parse(key: impl Into<String>) -> CanvasResult<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(CanvasError::InvalidIdempotencyKey {
                reason: "key is empty".to_string(),
            });
        }
        if key.len() > MAX_IDEMPOTENCY_KEY_LEN {
            return Err(CanvasError::InvalidIdempotencyKey {
                reason: format!("key longer than {} bytes", MAX_IDEMPOTENCY_KEY_LEN),
            });
        }
        if !key.chars().all(|c| c.is_ascii_graphic()) {
            return Err(CanvasError::InvalidIdempotencyKey {
                reason: "key must be printable ASCII without spaces".to_string(),
            });
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(ParticipantId::generate(), ParticipantId::generate());
        assert_ne!(IdempotencyKey::generate(), IdempotencyKey::generate());
    }

    #[test]
    fn test_idempotency_key_parse() {
        assert!(IdempotencyKey::parse("mark-1").is_ok());
        assert!(IdempotencyKey::parse("").is_err());
        assert!(IdempotencyKey::parse("has space").is_err());
        assert!(IdempotencyKey::parse("k".repeat(MAX_IDEMPOTENCY_KEY_LEN + 1)).is_err());
    }

    #[test]
    fn test_participant_id_serializes_as_string() {
        let id = ParticipantId::new("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }
}
