//! Frame stuffing, decoding and encoding
//!
//! A raw frame is everything from `STX` to `ETX` inclusive. Between the
//! markers every literal `DLE` is doubled, so decoding first collapses
//! `DLE DLE` pairs and then splits the result into command, declared length,
//! payload and checksum.

use tracing::debug;

use crate::command::Command;
use crate::crc::checksum;
use crate::error::ParseError;
use crate::{DLE, ETX, STX};

/// Complete frame as extracted from the byte stream, `STX` and `ETX` included
pub type RawFrame = Vec<u8>;

/// Smallest un-stuffed frame body: command, length and two checksum bytes
const MIN_BODY_LEN: usize = 4;

/// A structurally valid frame split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    /// Command code
    pub command: Command,
    /// Length byte as declared by the sender
    pub length: u8,
    /// Un-stuffed payload
    pub payload: Vec<u8>,
    /// Checksum as transmitted (big-endian)
    pub checksum: u16,
}

impl DecodedMessage {
    /// Checksum recomputed over command, length and payload
    pub fn computed_checksum(&self) -> u16 {
        let mut data = Vec::with_capacity(self.payload.len() + 2);
        data.push(self.command.code());
        data.push(self.length);
        data.extend_from_slice(&self.payload);
        checksum(&data)
    }

    /// Whether the transmitted checksum matches the recomputed one
    ///
    /// Informational only, frames are never rejected on this.
    pub fn checksum_matches(&self) -> bool {
        self.computed_checksum() == self.checksum
    }
}

/// Double every `DLE` in `data`
pub fn stuff(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 4);
    for &b in data {
        out.push(b);
        if b == DLE {
            out.push(DLE);
        }
    }
    out
}

/// Collapse every `DLE DLE` pair in `data` into a single `DLE`
pub fn unstuff(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        out.push(data[i]);
        if data[i] == DLE && data.get(i + 1) == Some(&DLE) {
            i += 2;
        } else {
            i += 1;
        }
    }
    out
}

/// Decode a raw frame
pub fn decode_frame(frame: &[u8]) -> Result<DecodedMessage, ParseError> {
    if frame.len() < 2 {
        return Err(ParseError::Truncated {
            needed: MIN_BODY_LEN + 2,
            actual: frame.len(),
        });
    }
    if frame[0] != STX {
        return Err(ParseError::InvalidFrame("missing STX".into()));
    }
    if frame[frame.len() - 1] != ETX {
        return Err(ParseError::InvalidFrame("missing ETX".into()));
    }

    let body = unstuff(&frame[1..frame.len() - 1]);
    if body.len() < MIN_BODY_LEN {
        return Err(ParseError::Truncated {
            needed: MIN_BODY_LEN,
            actual: body.len(),
        });
    }

    let n = body.len();
    let command = Command::from(body[0]);
    let length = body[1];
    let payload = body[2..n - 2].to_vec();
    let checksum = u16::from_be_bytes([body[n - 2], body[n - 1]]);

    if usize::from(length) != payload.len() {
        debug!(
            "{} frame declares {} payload bytes, carries {}",
            command.name(),
            length,
            payload.len()
        );
    }

    Ok(DecodedMessage {
        command,
        length,
        payload,
        checksum,
    })
}

/// Build a complete stuffed frame for `command` carrying `payload`
///
/// Payloads longer than 255 bytes declare a length of 255.
pub fn encode_frame(command: u8, payload: &[u8]) -> RawFrame {
    let length = u8::try_from(payload.len()).unwrap_or(u8::MAX);

    let mut body = Vec::with_capacity(payload.len() + MIN_BODY_LEN);
    body.push(command);
    body.push(length);
    body.extend_from_slice(payload);
    let crc = checksum(&body);
    body.extend_from_slice(&crc.to_be_bytes());

    let mut frame = Vec::with_capacity(body.len() + 4);
    frame.push(STX);
    frame.extend(stuff(&body));
    frame.push(ETX);
    frame
}
