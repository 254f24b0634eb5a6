//! WS-Addressing message identifiers.
//!
//! Every WS-Discovery probe carries a fresh `MessageID` so that responses
//! can be correlated through their `RelatesTo` header.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A unique WS-Addressing message identifier.
///
/// Uses UUID v4 internally and renders in the `uuid:` URN form devices
/// expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Generate a new random message ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The `uuid:`-prefixed form used on the wire.
    pub fn urn(&self) -> String {
        format!("uuid:{}", self.0)
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = MessageIdError;

    /// Accepts both the bare UUID and the `uuid:` / `urn:uuid:` forms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let bare = trimmed
            .strip_prefix("urn:uuid:")
            .or_else(|| trimmed.strip_prefix("uuid:"))
            .unwrap_or(trimmed);

        let uuid =
            Uuid::parse_str(bare).map_err(|_| MessageIdError::InvalidFormat(s.to_string()))?;
        Ok(Self(uuid))
    }
}

/// Error type for MessageId parsing.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MessageIdError {
    #[error("invalid message ID format: {0}")]
    InvalidFormat(String),
}
