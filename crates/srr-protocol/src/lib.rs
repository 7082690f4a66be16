//! SRR Protocol Library
//!
//! This crate provides framing and decoding for the binary protocol spoken by
//! SPORTident SRR radio receiver dongles. It is I/O free: bytes go in, punches
//! come out.
//!
//! # Frame Format
//! ```text
//! STX [cmd] [len] [payload...] [crc hi] [crc lo] ETX
//! ```
//!
//! - `STX` (0x02) / `ETX` (0x03): frame markers
//! - `cmd`: command code (radio punch, card data replies, ACK, NAK)
//! - `len`: declared payload length, counted before escaping
//! - `payload`: command specific data, literal `DLE` bytes are doubled
//! - `crc`: 16-bit checksum over `cmd`, `len` and `payload`
//!
//! # Pipeline
//!
//! - [`FrameAssembler`] pulls complete raw frames out of arbitrarily chunked input
//! - [`decode_frame`] un-stuffs and splits a raw frame into a [`DecodedMessage`]
//! - [`PunchDecoder`] interprets the payload of punch-carrying commands
//!
//! # Example
//!
//! ```rust
//! use srr_protocol::{decode_frame, encode_frame, Command, FrameAssembler, PunchDecoder};
//!
//! let payload = [0x00, 0x1F, 0x00, 0x12, 0x34, 0x56, 0x00, 0x23, 0x28, 0x00];
//! let bytes = encode_frame(Command::RadioPunch.code(), &payload);
//!
//! let mut assembler = FrameAssembler::new();
//! assembler.push_bytes(&bytes[..7]);
//! assert!(assembler.next_frame().is_none());
//! assembler.push_bytes(&bytes[7..]);
//!
//! let frame = assembler.next_frame().unwrap().unwrap();
//! let message = decode_frame(&frame).unwrap();
//! let punch = PunchDecoder::new().decode(&message).unwrap().unwrap();
//! assert_eq!(punch.card_number, 1_193_046);
//! assert_eq!(punch.control_code, 31);
//! ```

pub mod cards;
pub mod command;
pub mod crc;
pub mod error;
pub mod frame;
pub mod framing;
pub mod punch;

pub use cards::{CardLayout, Field};
pub use command::Command;
pub use crc::checksum;
pub use error::ParseError;
pub use frame::{decode_frame, encode_frame, stuff, unstuff, DecodedMessage, RawFrame};
pub use framing::{AssemblerConfig, EtxSearch, FrameAssembler};
pub use punch::{Punch, PunchDecoder};

/// Start of frame marker
pub const STX: u8 = 0x02;
/// End of frame marker
pub const ETX: u8 = 0x03;
/// Positive acknowledgement
pub const ACK: u8 = 0x06;
/// Escape byte, doubled when it occurs literally inside a frame
pub const DLE: u8 = 0x10;
/// Negative acknowledgement
pub const NAK: u8 = 0x15;
/// Wake-up byte sent ahead of any communication with a station
pub const WAKEUP: u8 = 0xFF;

/// Fixed serial line settings of the SRR dongle
pub mod line {
    /// Baud rate
    pub const BAUD_RATE: u32 = 38_400;
    /// Data bits per character
    pub const DATA_BITS: u8 = 8;
    /// Stop bits per character
    pub const STOP_BITS: u8 = 1;
}
