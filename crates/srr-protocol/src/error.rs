//! Error types for SRR protocol framing and decoding

use thiserror::Error;

/// Errors that can occur while parsing protocol data
///
/// These never leave the reader as events. They are counted, logged, and the
/// byte stream keeps flowing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Frame is shorter than its fixed structure requires
    #[error("truncated frame: need {needed} bytes, have {actual}")]
    Truncated { needed: usize, actual: usize },

    /// Invalid frame structure
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Assembly buffer exceeded its bound without yielding a frame
    #[error("assembly buffer overflow: {len} bytes discarded")]
    BufferOverflow { len: usize },

    /// Payload too short for the field being read
    #[error("{command} payload too short: need {needed} bytes, have {actual}")]
    PayloadTooShort {
        command: &'static str,
        needed: usize,
        actual: usize,
    },
}
