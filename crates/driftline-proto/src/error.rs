//! Decode errors for inbound payloads.

use thiserror::Error;

/// A server payload failed the typed decode step.
///
/// Decode errors never flow into the timeline store; the boundary logs them
/// and drops the payload, leaving the materialized window untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Payload was not valid JSON or was missing required fields.
    #[error("invalid payload: {0}")]
    Json(String),

    /// Timestamp outside the representable range.
    #[error("timestamp out of range: {millis} ms")]
    Timestamp {
        /// The raw millisecond value.
        millis: i64,
    },

    /// Live event name not recognized by this client.
    #[error("unknown live event: {0}")]
    UnknownEvent(String),
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}
