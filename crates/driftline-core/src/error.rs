//! Transport error taxonomy.
//!
//! Strongly-typed errors for the history-fetch and live channels. The store
//! never inspects platform error values; it classifies failures through this
//! type to decide what to surface and whether a retry is worthwhile.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the transport adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Request did not complete within its deadline.
    #[error("request timed out after {elapsed:?}")]
    Timeout {
        /// How long we waited.
        elapsed: Duration,
    },

    /// Network-level failure (DNS, reset, unreachable).
    #[error("network failure: {0}")]
    Network(String),

    /// History endpoint returned a non-success status.
    #[error("history fetch failed with status {status}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
    },

    /// Live channel is not connected.
    #[error("live channel disconnected")]
    Disconnected,

    /// Server payload failed the typed decode step.
    #[error("malformed server payload: {0}")]
    Malformed(String),
}

impl TransportError {
    /// True if the failure is transient and may succeed on retry.
    ///
    /// Timeouts and network faults are retryable by repeating the user
    /// gesture. Malformed payloads are not: the same bytes would fail again.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Network(_) | Self::Disconnected => true,
            Self::HttpStatus { status } => *status >= 500,
            Self::Malformed(_) => false,
        }
    }
}
