//! Error types for SRR device detection

use thiserror::Error;

/// Errors that can occur during detection
#[derive(Debug, Error)]
pub enum DetectError {
    /// Failed to enumerate serial ports
    #[error("failed to enumerate ports: {0}")]
    EnumerationFailed(String),

    /// No serial port matched the SRR receiver identity
    #[error("no SRR receiver found")]
    PortNotFound,

    /// Several candidates matched but none was confirmed as the receiver
    #[error("could not tell the SRR receiver apart from {}", candidates.join(", "))]
    AmbiguousDevice { candidates: Vec<String> },

    /// Failed to open serial port
    #[error("failed to open port {port}: {reason}")]
    OpenFailed { port: String, reason: String },
}
