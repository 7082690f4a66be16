//! Error types for the reader

use srr_detect::DetectError;
use thiserror::Error;

/// Errors surfaced by [`SrrReader`](crate::SrrReader) operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReaderError {
    /// No serial port matched the SRR receiver identity
    #[error("no SRR receiver found")]
    PortNotFound,

    /// Several candidates matched, none was confirmed as the receiver
    #[error("could not tell the SRR receiver apart from {}", candidates.join(", "))]
    AmbiguousDevice { candidates: Vec<String> },

    /// Open, read or close failure on the serial line
    #[error("serial I/O error on {port}: {reason}")]
    SerialIo { port: String, reason: String },

    /// Serial ports could not be listed
    #[error("failed to enumerate serial ports: {0}")]
    Enumeration(String),

    /// Auto-detect is off and no port was given
    #[error("no serial port configured and auto-detect disabled")]
    NoPortConfigured,
}

impl From<DetectError> for ReaderError {
    fn from(err: DetectError) -> Self {
        match err {
            DetectError::PortNotFound => ReaderError::PortNotFound,
            DetectError::AmbiguousDevice { candidates } => {
                ReaderError::AmbiguousDevice { candidates }
            }
            DetectError::OpenFailed { port, reason } => ReaderError::SerialIo { port, reason },
            DetectError::EnumerationFailed(reason) => ReaderError::Enumeration(reason),
        }
    }
}
