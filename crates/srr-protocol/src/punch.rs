//! Punch extraction from decoded messages
//!
//! # Radio Punch Payload (0xD3)
//! ```text
//! [cn1] [cn0] [--] [si2] [si1] [si0] [td] [th] [tl] [tss]
//! ```
//!
//! - `cn1 cn0`: control code, big-endian
//! - `si2 si1 si0`: card number, big-endian (byte 2 reserved)
//! - `td`: day/flags, bit 0 set means PM
//! - `th tl`: seconds within the 12-hour half of the day
//! - `tss`: optional sub-second fraction in 1/256 s
//!
//! Only the first six bytes are required. Time bytes past the end of a
//! shorter payload count as zero.
//!
//! Punch times are kept in device units (tenths of a second since local
//! midnight). They are never converted to host wall-clock time.

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::cards::{CardLayout, SI8_SERIES};
use crate::command::Command;
use crate::error::ParseError;
use crate::frame::DecodedMessage;

/// Twelve hours in tenths of a second
pub const HALF_DAY_TENTHS: u32 = 12 * 3600 * 10;

/// Smallest radio punch payload carrying control code and card number
const RADIO_PUNCH_MIN_LEN: usize = 6;
const DAY_FLAGS_INDEX: usize = 6;
/// Index of the optional sub-second byte
const SUB_SECOND_INDEX: usize = 9;

/// A single timing punch
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Punch {
    /// Competitor's card number
    pub card_number: u32,
    /// Control station code
    pub control_code: u16,
    /// Tenths of a second since local midnight, device clock
    pub punch_time: u32,
    /// Host wall-clock time of receipt
    pub timestamp: DateTime<Utc>,
    /// Hex dump of the payload the punch was decoded from
    pub raw: String,
}

impl Punch {
    /// Punch time split into hours, minutes, seconds and tenths
    pub fn time_of_day(&self) -> (u32, u32, u32, u32) {
        let tenths = self.punch_time % 10;
        let secs = self.punch_time / 10;
        (secs / 3600, (secs / 60) % 60, secs % 60, tenths)
    }
}

/// Interprets payloads of punch-carrying commands
#[derive(Debug, Clone, Copy, Default)]
pub struct PunchDecoder;

impl PunchDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode a punch received now
    ///
    /// Returns `Ok(None)` for commands that carry no punch (ACK, NAK and
    /// unknown codes).
    pub fn decode(&self, msg: &DecodedMessage) -> Result<Option<Punch>, ParseError> {
        self.decode_at(msg, Utc::now())
    }

    /// Decode a punch, stamping it with `timestamp`
    pub fn decode_at(
        &self,
        msg: &DecodedMessage,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<Punch>, ParseError> {
        let payload = &msg.payload;
        let fields = match msg.command {
            Command::RadioPunch => decode_radio_punch(payload)?,
            Command::GetSi5Data | Command::GetSi6Data | Command::GetSi8Data => {
                let series = SI8_SERIES.read(payload).map(|s| s as u8);
                match msg.command.card_layout(series) {
                    Some(layout) => decode_card(layout, payload)?,
                    None => return Ok(None),
                }
            }
            Command::Ack | Command::Nak | Command::Unknown(_) => {
                trace!("No punch in {} message", msg.command.name());
                return Ok(None);
            }
        };

        Ok(Some(Punch {
            card_number: fields.card_number,
            control_code: fields.control_code,
            punch_time: fields.punch_time,
            timestamp,
            raw: hex::encode(payload),
        }))
    }
}

struct PunchFields {
    card_number: u32,
    control_code: u16,
    punch_time: u32,
}

fn decode_radio_punch(payload: &[u8]) -> Result<PunchFields, ParseError> {
    if payload.len() < RADIO_PUNCH_MIN_LEN {
        return Err(ParseError::PayloadTooShort {
            command: Command::RadioPunch.name(),
            needed: RADIO_PUNCH_MIN_LEN,
            actual: payload.len(),
        });
    }

    let control_code = u16::from_be_bytes([payload[0], payload[1]]);
    let card_number =
        (u32::from(payload[3]) << 16) | (u32::from(payload[4]) << 8) | u32::from(payload[5]);

    // Time bytes missing from a short payload read as zero
    let byte = |i: usize| payload.get(i).copied().unwrap_or(0);
    let seconds = u32::from(u16::from_be_bytes([byte(7), byte(8)]));
    let mut punch_time = seconds * 10;
    if byte(DAY_FLAGS_INDEX) & 0x01 != 0 {
        punch_time += HALF_DAY_TENTHS;
    }
    if let Some(&fraction) = payload.get(SUB_SECOND_INDEX) {
        punch_time += sub_second_tenths(fraction);
    }

    Ok(PunchFields {
        card_number,
        control_code,
        punch_time,
    })
}

/// Sub-second byte (1/256 s) to rounded tenths
fn sub_second_tenths(fraction: u8) -> u32 {
    (((100.0 * f64::from(fraction)) / 256.0 + 4.0) / 10.0).round() as u32
}

fn decode_card(layout: &CardLayout, payload: &[u8]) -> Result<PunchFields, ParseError> {
    let too_short = || ParseError::PayloadTooShort {
        command: layout.name,
        needed: layout.min_len(),
        actual: payload.len(),
    };

    let mut card_number = layout.card_number.read(payload).ok_or_else(too_short)?;
    if let Some(series) = layout.series_multiplier {
        let series = series.read(payload).ok_or_else(too_short)?;
        if series > 1 {
            card_number += series * 100_000;
        }
    }

    let control_code = layout.control_code.read(payload).ok_or_else(too_short)? as u16;
    let mut punch_time = layout.punch_time.read(payload).ok_or_else(too_short)? * 10;
    if let Some(day) = layout.day_flags {
        if day.read(payload).ok_or_else(too_short)? & 0x01 != 0 {
            punch_time += HALF_DAY_TENTHS;
        }
    }

    Ok(PunchFields {
        card_number,
        control_code,
        punch_time,
    })
}
