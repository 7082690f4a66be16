//! Streaming frame assembler
//!
//! Serial reads hand over bytes in whatever chunks the driver produced. The
//! assembler buffers them and cuts complete `STX ... ETX` frames out of the
//! buffer, discarding noise between frames.
//!
//! The declared length byte counts payload bytes before stuffing, so the
//! frame size it implies is only a lower bound. The end marker is searched
//! in a window starting at that lower bound and extending `lookahead` bytes
//! past it.

use tracing::{debug, trace, warn};

use crate::error::ParseError;
use crate::frame::{unstuff, RawFrame};
use crate::{ETX, STX};

/// STX, command and length bytes
const HEADER_LEN: usize = 3;
/// Two checksum bytes and ETX
const TRAILER_LEN: usize = 3;
/// Command, length and checksum bytes of an un-stuffed body
const BODY_OVERHEAD: usize = 4;

/// How the end marker is chosen inside the search window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EtxSearch {
    /// First `ETX` whose un-stuffed frame body matches the declared length.
    /// A start marker is dropped as a false start when its window is fully
    /// buffered without a matching end, or when a later start marker already
    /// begins a complete frame.
    #[default]
    LengthChecked,
    /// Last `ETX` inside the buffered part of the window
    LastInWindow,
}

/// Assembler limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AssemblerConfig {
    /// Buffer size beyond which an unresolved buffer is thrown away
    pub max_buffer: usize,
    /// Bytes searched for `ETX` past the minimum frame size
    pub lookahead: usize,
    /// End marker selection
    pub strategy: EtxSearch,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            max_buffer: 2048,
            lookahead: 20,
            strategy: EtxSearch::default(),
        }
    }
}

/// Incremental frame extractor
#[derive(Debug)]
pub struct FrameAssembler {
    buffer: Vec<u8>,
    config: AssemblerConfig,
}

impl FrameAssembler {
    /// Create an assembler with default limits
    pub fn new() -> Self {
        Self::with_config(AssemblerConfig::default())
    }

    /// Create an assembler with custom limits
    pub fn with_config(config: AssemblerConfig) -> Self {
        Self {
            buffer: Vec::with_capacity(256),
            config,
        }
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Append received bytes
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Number of bytes currently buffered
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drop everything buffered
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Try to extract the next frame
    ///
    /// Returns `None` when more data is needed. `Some(Err(_))` reports bytes
    /// that were thrown away (false start or overflow); call again to keep
    /// scanning.
    pub fn next_frame(&mut self) -> Option<Result<RawFrame, ParseError>> {
        let Some(start) = self.buffer.iter().position(|&b| b == STX) else {
            if !self.buffer.is_empty() {
                trace!("Discarding {} bytes without STX", self.buffer.len());
                self.buffer.clear();
            }
            return None;
        };

        if start > 0 {
            debug!(
                "Discarding {} bytes before STX: {:02X?}",
                start,
                &self.buffer[..start]
            );
            self.buffer.drain(..start);
        }

        if self.buffer.len() < HEADER_LEN {
            return None;
        }

        let declared = usize::from(self.buffer[2]);
        let min_size = HEADER_LEN + declared + TRAILER_LEN;
        let window_end = min_size + self.config.lookahead;

        let end = if self.buffer.len() < min_size {
            None
        } else {
            let search_end = window_end.min(self.buffer.len());
            match self.config.strategy {
                EtxSearch::LengthChecked => self.matching_end(0),
                EtxSearch::LastInWindow => self.last_end_in_window(min_size, search_end),
            }
        };

        if let Some(end) = end {
            let frame: RawFrame = self.buffer.drain(..=end).collect();
            trace!("Extracted frame: {:02X?}", frame);
            return Some(Ok(frame));
        }

        if self.config.strategy == EtxSearch::LengthChecked {
            if self.buffer.len() >= window_end {
                debug!(
                    "No frame end within {} bytes of STX (cmd 0x{:02X}, len {}), resyncing",
                    window_end, self.buffer[1], declared
                );
                self.buffer.drain(..1);
                return Some(Err(ParseError::InvalidFrame(format!(
                    "no ETX matching declared length {} within {} bytes",
                    declared, window_end
                ))));
            }

            if let Some(next) = self.later_complete_frame() {
                debug!(
                    "STX with declared length {} overtaken by a complete frame at offset {}, resyncing",
                    declared, next
                );
                self.buffer.drain(..next);
                return Some(Err(ParseError::InvalidFrame(format!(
                    "false start with declared length {} before a complete frame",
                    declared
                ))));
            }
        }

        if self.buffer.len() > self.config.max_buffer {
            let len = self.buffer.len();
            warn!("Assembly buffer overflow, discarding {} bytes", len);
            self.buffer.clear();
            return Some(Err(ParseError::BufferOverflow { len }));
        }

        None
    }

    /// End of the frame starting at `start`, if it is fully buffered
    ///
    /// The end is the first `ETX` inside the search window at which the
    /// un-stuffed body has the declared size.
    fn matching_end(&self, start: usize) -> Option<usize> {
        let frame = self.buffer.get(start..)?;
        let declared = usize::from(*frame.get(2)?);
        let min_size = HEADER_LEN + declared + TRAILER_LEN;
        if frame.len() < min_size {
            return None;
        }
        let search_end = (min_size + self.config.lookahead).min(frame.len());
        (min_size - 1..search_end)
            .find(|&i| {
                frame[i] == ETX && unstuff(&frame[1..i]).len() == declared + BODY_OVERHEAD
            })
            .map(|i| start + i)
    }

    /// Offset of the first later `STX` that already starts a complete frame
    fn later_complete_frame(&self) -> Option<usize> {
        (1..self.buffer.len())
            .filter(|&i| self.buffer[i] == STX)
            .find(|&i| self.matching_end(i).is_some())
    }

    /// Last `ETX` found scanning backward from the end of the window
    fn last_end_in_window(&self, min_size: usize, search_end: usize) -> Option<usize> {
        (min_size - 1..search_end)
            .rev()
            .find(|&i| self.buffer[i] == ETX)
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::encode_frame;
    use crate::DLE;
    use proptest::prelude::*;

    fn drain(assembler: &mut FrameAssembler) -> (Vec<RawFrame>, usize) {
        let mut frames = Vec::new();
        let mut errors = 0;
        while let Some(result) = assembler.next_frame() {
            match result {
                Ok(frame) => frames.push(frame),
                Err(_) => errors += 1,
            }
        }
        (frames, errors)
    }

    #[test]
    fn test_single_frame() {
        let frame = encode_frame(0xD3, &[0x00, 0x1F, 0x00, 0x12, 0x34, 0x56]);
        let mut assembler = FrameAssembler::new();
        assembler.push_bytes(&frame);

        let (frames, errors) = drain(&mut assembler);
        assert_eq!(frames, vec![frame]);
        assert_eq!(errors, 0);
        assert_eq!(assembler.buffered_len(), 0);
    }

    #[test]
    fn test_waits_for_header_and_body() {
        let frame = encode_frame(0xD3, &[0x01, 0x02, 0x04]);
        let mut assembler = FrameAssembler::new();

        assembler.push_bytes(&frame[..2]);
        assert!(assembler.next_frame().is_none());
        assembler.push_bytes(&frame[2..5]);
        assert!(assembler.next_frame().is_none());
        assembler.push_bytes(&frame[5..]);
        assert_eq!(assembler.next_frame(), Some(Ok(frame)));
    }

    #[test]
    fn test_leading_noise_discarded() {
        let frame = encode_frame(0xD3, &[0x00, 0x1F]);
        let mut assembler = FrameAssembler::new();
        assembler.push_bytes(&[0xFF, 0x00, 0xAA]);
        assembler.push_bytes(&frame);

        let (frames, errors) = drain(&mut assembler);
        assert_eq!(frames, vec![frame]);
        assert_eq!(errors, 0);
    }

    #[test]
    fn test_multiple_frames_in_one_chunk() {
        let a = encode_frame(0xD3, &[0x00, 0x1F, 0x00, 0x12, 0x34, 0x56, 0x00, 0x23, 0x28]);
        let b = encode_frame(0xD3, &[0x00, 0x20, 0x00, 0x03, 0x03, 0x03, 0x01, 0x10, 0x03]);
        let mut stream = a.clone();
        stream.extend_from_slice(&b);

        let mut assembler = FrameAssembler::new();
        assembler.push_bytes(&stream);
        let (frames, errors) = drain(&mut assembler);
        assert_eq!(frames, vec![a, b]);
        assert_eq!(errors, 0);
    }

    #[test]
    fn test_stuffed_payload_with_etx_bytes() {
        let payload = [DLE, ETX, DLE, ETX, 0x00, DLE];
        let frame = encode_frame(0xD3, &payload);
        let mut assembler = FrameAssembler::new();
        assembler.push_bytes(&frame);
        assert_eq!(assembler.next_frame(), Some(Ok(frame)));
    }

    #[test]
    fn test_overflow_without_stx_resets() {
        let mut assembler = FrameAssembler::new();
        assembler.push_bytes(&[0xAA; 2048]);
        assert!(assembler.next_frame().is_none());
        assert_eq!(assembler.buffered_len(), 0);
    }

    #[test]
    fn test_false_start_is_dropped() {
        let frame = encode_frame(0xD3, &[0x00, 0x1F]);
        let mut stream = vec![STX, 0x44, 0x00];
        stream.extend_from_slice(&[0x00; 30]);
        stream.extend_from_slice(&frame);

        let mut assembler = FrameAssembler::new();
        assembler.push_bytes(&stream);
        let (frames, errors) = drain(&mut assembler);
        assert_eq!(frames, vec![frame]);
        assert_eq!(errors, 1);
    }

    #[test]
    fn test_false_start_in_noise_does_not_hold_back_next_frame() {
        let a = encode_frame(0xD3, &[0x00, 0x1F, 0x00, 0x12, 0x34, 0x56, 0x00, 0x23, 0x28]);
        let b = encode_frame(0xD3, &[0x00, 0x20, 0x00, 0x03, 0x03, 0x03, 0x01, 0x10, 0x03]);
        let mut stream = a.clone();
        stream.extend_from_slice(&[0xFF, STX, 0xC8, 0x55, 0x13]);
        stream.extend_from_slice(&b);

        let mut assembler = FrameAssembler::new();
        assembler.push_bytes(&stream);
        let (frames, errors) = drain(&mut assembler);
        assert_eq!(frames, vec![a, b]);
        assert_eq!(errors, 1);
        assert_eq!(assembler.buffered_len(), 0);
    }

    #[test]
    fn test_incomplete_frame_is_not_dropped_for_partial_successor() {
        let a = encode_frame(0xD3, &[0x00, 0x1F, 0x00, 0x12, 0x34, 0x56]);
        let b = encode_frame(0xD3, &[0x00, 0x20, 0x00, 0x03, 0x03, 0x03]);
        let mut stream = vec![STX, 0xC8, 0x55];
        stream.extend_from_slice(&a);
        stream.extend_from_slice(&b[..b.len() - 1]);

        // Long frame still arriving and nothing later is complete: wait
        let mut assembler = FrameAssembler::new();
        assembler.push_bytes(&stream[..3]);
        assert!(assembler.next_frame().is_none());
        assert_eq!(assembler.buffered_len(), 3);

        // Once a later frame completes, the stalled start is given up
        assembler.push_bytes(&stream[3..]);
        assert!(matches!(
            assembler.next_frame(),
            Some(Err(ParseError::InvalidFrame(_)))
        ));
        assert_eq!(assembler.next_frame(), Some(Ok(a)));
        assert!(assembler.next_frame().is_none());
    }

    #[test]
    fn test_last_in_window_overflow_resets() {
        let mut assembler = FrameAssembler::with_config(AssemblerConfig {
            strategy: EtxSearch::LastInWindow,
            ..Default::default()
        });
        assembler.push_bytes(&[STX, 0x44, 0x00]);
        assembler.push_bytes(&[0x00; 1024]);
        assert!(assembler.next_frame().is_none());
        assert_eq!(assembler.buffered_len(), 1027);

        assembler.push_bytes(&[0x00; 1024]);
        assert_eq!(
            assembler.next_frame(),
            Some(Err(ParseError::BufferOverflow { len: 2051 }))
        );
        assert_eq!(assembler.buffered_len(), 0);
    }

    #[test]
    fn test_last_in_window_takes_last_etx() {
        // Declared length 1, two ETX candidates inside the window
        let stream = [STX, 0xD3, 0x01, 0x05, 0xAA, 0xBB, ETX, 0x00, ETX];
        let mut assembler = FrameAssembler::with_config(AssemblerConfig {
            strategy: EtxSearch::LastInWindow,
            ..Default::default()
        });
        assembler.push_bytes(&stream);
        assert_eq!(assembler.next_frame(), Some(Ok(stream.to_vec())));
    }

    fn frame_strategy() -> impl Strategy<Value = RawFrame> {
        (
            prop_oneof![Just(0xD3u8), Just(0xB1), Just(0xE1), Just(0xEF), Just(0x06)],
            proptest::collection::vec(any::<u8>(), 0..32),
        )
            .prop_map(|(cmd, payload)| encode_frame(cmd, &payload))
    }

    proptest! {
        #[test]
        fn chunk_boundaries_do_not_change_frames(
            frames in proptest::collection::vec(frame_strategy(), 1..6),
            cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..12),
        ) {
            let stream: Vec<u8> = frames.iter().flatten().copied().collect();

            let mut whole = FrameAssembler::new();
            whole.push_bytes(&stream);
            let (expected, _) = drain(&mut whole);
            prop_assert_eq!(&expected, &frames);

            let mut points: Vec<usize> = cuts.iter().map(|i| i.index(stream.len() + 1)).collect();
            points.push(0);
            points.push(stream.len());
            points.sort_unstable();
            points.dedup();

            let mut chunked = FrameAssembler::new();
            let mut got = Vec::new();
            for pair in points.windows(2) {
                chunked.push_bytes(&stream[pair[0]..pair[1]]);
                let (mut out, _) = drain(&mut chunked);
                got.append(&mut out);
            }
            prop_assert_eq!(got, frames);
        }
    }
}
