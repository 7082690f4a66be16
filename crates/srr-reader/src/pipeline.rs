//! Synchronous decode pipeline
//!
//! Bytes go through [`FrameAssembler`], [`decode_frame`] and
//! [`PunchDecoder`] in order. Each chunk is processed to completion; the
//! pipeline never waits mid-frame and performs no I/O, so it can be driven
//! directly from tests.

use srr_protocol::{
    decode_frame, AssemblerConfig, Command, FrameAssembler, ParseError, Punch, PunchDecoder,
};
use tracing::{debug, trace};

/// Result of processing one frame or one discarded span of bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A frame decoded into a punch
    Punch { punch: Punch, checksum_ok: bool },
    /// A well-formed frame without a punch (ACK, NAK, unknown command)
    Ignored { command: Command, checksum_ok: bool },
    /// Bytes or a frame thrown away
    Discarded(ParseError),
}

/// Frame assembly and decoding for one byte stream
#[derive(Debug)]
pub struct PunchPipeline {
    assembler: FrameAssembler,
    decoder: PunchDecoder,
}

impl PunchPipeline {
    pub fn new(config: AssemblerConfig) -> Self {
        Self {
            assembler: FrameAssembler::with_config(config),
            decoder: PunchDecoder::new(),
        }
    }

    /// Process one received chunk
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Outcome> {
        trace!("Pipeline input: {:02X?}", chunk);
        self.assembler.push_bytes(chunk);

        let mut outcomes = Vec::new();
        while let Some(extracted) = self.assembler.next_frame() {
            let outcome = match extracted {
                Ok(frame) => self.decode(&frame),
                Err(e) => Outcome::Discarded(e),
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    fn decode(&self, frame: &[u8]) -> Outcome {
        let message = match decode_frame(frame) {
            Ok(message) => message,
            Err(e) => {
                debug!("Dropping malformed frame {:02X?}: {}", frame, e);
                return Outcome::Discarded(e);
            }
        };

        let checksum_ok = message.checksum_matches();
        if !checksum_ok {
            debug!(
                "Checksum mismatch on {} frame: sent 0x{:04X}, computed 0x{:04X}",
                message.command.name(),
                message.checksum,
                message.computed_checksum()
            );
        }

        if !message.command.carries_punch() {
            debug!(
                "Ignoring {} message (0x{:02X})",
                message.command.name(),
                message.command.code()
            );
            return Outcome::Ignored {
                command: message.command,
                checksum_ok,
            };
        }

        match self.decoder.decode(&message) {
            Ok(Some(punch)) => {
                debug!(
                    "Punch: card {} at control {}",
                    punch.card_number, punch.control_code
                );
                Outcome::Punch { punch, checksum_ok }
            }
            Ok(None) => {
                debug!("No card layout for {} reply", message.command.name());
                Outcome::Ignored {
                    command: message.command,
                    checksum_ok,
                }
            }
            Err(e) => {
                debug!("Failed to decode {} payload: {}", message.command.name(), e);
                Outcome::Discarded(e)
            }
        }
    }

    /// Drop any partially assembled frame
    pub fn reset(&mut self) {
        self.assembler.clear();
    }

    /// Bytes waiting for the rest of a frame
    pub fn buffered_len(&self) -> usize {
        self.assembler.buffered_len()
    }
}

impl Default for PunchPipeline {
    fn default() -> Self {
        Self::new(AssemblerConfig::default())
    }
}
