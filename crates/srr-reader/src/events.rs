//! Events published by the reader
//!
//! Every subscriber sees the same stream: punches as they are decoded, I/O
//! errors during steady-state listening, and connection lifecycle changes.
//! Protocol errors (noise, truncated frames, overflow resets) are counted in
//! the statistics and never published.

use serde::Serialize;
use srr_protocol::Punch;

/// Reader event delivered to listeners and subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ReaderEvent {
    /// A punch was decoded
    Punch(Punch),

    /// The serial line failed while listening
    Error {
        /// Error message
        message: String,
    },

    /// The reader started listening on a port
    Connected {
        /// Serial port path
        port: String,
    },

    /// The reader stopped listening
    Disconnected,
}

impl ReaderEvent {
    /// Event name as used by subscribers (`punch`, `error`, ...)
    pub fn name(&self) -> &'static str {
        match self {
            ReaderEvent::Punch(_) => "punch",
            ReaderEvent::Error { .. } => "error",
            ReaderEvent::Connected { .. } => "connected",
            ReaderEvent::Disconnected => "disconnected",
        }
    }

    pub fn is_punch(&self) -> bool {
        matches!(self, ReaderEvent::Punch(_))
    }

    /// Check if this is a connection lifecycle event
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            ReaderEvent::Connected { .. } | ReaderEvent::Disconnected
        )
    }

    /// Get the punch if this is a punch event
    pub fn punch(&self) -> Option<&Punch> {
        match self {
            ReaderEvent::Punch(punch) => Some(punch),
            _ => None,
        }
    }
}
