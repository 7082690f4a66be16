//! Reader counters
//!
//! The read loop is the only writer. Everyone else reads a copied-out
//! [`Statistics`] snapshot.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use srr_protocol::{ParseError, Punch};

use crate::pipeline::Outcome;

/// Snapshot of the reader counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    /// Punches decoded and published
    pub punches_received: u64,
    /// Protocol errors: discarded frames, false starts and buffer resets
    pub errors: u64,
    /// Whether the reader is currently listening
    pub connected: bool,
    /// Most recent punch
    pub last_punch: Option<Punch>,
    /// When the current session started listening
    pub start_time: Option<DateTime<Utc>>,
    /// Time since `start_time`, only while connected
    pub uptime: Option<Duration>,
    /// Frames that decoded structurally
    pub frames_decoded: u64,
    /// ACK, NAK and unknown commands
    pub ignored_messages: u64,
    /// Frames whose transmitted checksum did not match
    pub checksum_mismatches: u64,
    /// Assembly buffer overflows
    pub buffer_resets: u64,
}

#[derive(Debug, Default)]
struct Counters {
    stats: Statistics,
    started: Option<Instant>,
}

/// Shared statistics store
#[derive(Debug, Default)]
pub struct StatisticsTracker {
    inner: Mutex<Counters>,
}

impl StatisticsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a listening session
    pub fn mark_connected(&self) {
        let mut counters = self.lock();
        counters.stats.connected = true;
        counters.stats.start_time = Some(Utc::now());
        counters.started = Some(Instant::now());
    }

    /// End the listening session, counters are kept
    pub fn mark_disconnected(&self) {
        let mut counters = self.lock();
        counters.stats.connected = false;
        counters.stats.start_time = None;
        counters.started = None;
    }

    /// Fold one pipeline outcome into the counters
    pub fn record(&self, outcome: &Outcome) {
        let mut counters = self.lock();
        let stats = &mut counters.stats;
        match outcome {
            Outcome::Punch {
                punch,
                checksum_ok,
            } => {
                stats.frames_decoded += 1;
                stats.punches_received += 1;
                stats.last_punch = Some(punch.clone());
                if !checksum_ok {
                    stats.checksum_mismatches += 1;
                }
            }
            Outcome::Ignored { checksum_ok, .. } => {
                stats.frames_decoded += 1;
                stats.ignored_messages += 1;
                if !checksum_ok {
                    stats.checksum_mismatches += 1;
                }
            }
            Outcome::Discarded(err) => {
                stats.errors += 1;
                if matches!(err, ParseError::BufferOverflow { .. }) {
                    stats.buffer_resets += 1;
                }
            }
        }
    }

    /// Copy out the current counters
    pub fn snapshot(&self) -> Statistics {
        let counters = self.lock();
        let mut stats = counters.stats.clone();
        stats.uptime = match (stats.connected, counters.started) {
            (true, Some(started)) => Some(started.elapsed()),
            _ => None,
        };
        stats
    }

    /// Zero every counter and end the session
    pub fn reset(&self) {
        *self.lock() = Counters::default();
    }
}
