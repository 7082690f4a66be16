//! SRR receiver location
//!
//! Identity filtering usually leaves one port. When a card reader is plugged
//! in next to the dongle both carry the same USB identity, and the locator
//! has to tell them apart:
//!
//! 1. A single candidate is taken as is.
//! 2. If serial numbers are reported, a short one (up to
//!    [`SHORT_SERIAL_MAX`] characters) marks the dongle. Card readers report
//!    longer serials.
//! 3. Otherwise the remaining candidates are probed with the wake-up byte.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::DetectError;
use crate::opener::{PortOpener, SerialPortOpener};
use crate::probe::{ProbeConfig, WakeupProber};
use crate::scanner::{PortScanner, SerialPortInfo};

/// Longest serial number still attributed to a radio dongle
pub const SHORT_SERIAL_MAX: usize = 5;

/// Finds the SRR receiver among the host's serial ports
pub struct PortLocator<O: PortOpener = SerialPortOpener> {
    scanner: PortScanner,
    opener: Arc<O>,
    prober: WakeupProber,
}

impl PortLocator<SerialPortOpener> {
    /// Locator over the real serial ports
    pub fn new() -> Self {
        Self::with_opener(Arc::new(SerialPortOpener), ProbeConfig::default())
    }
}

impl Default for PortLocator<SerialPortOpener> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: PortOpener> PortLocator<O> {
    /// Locator probing through a custom opener
    pub fn with_opener(opener: Arc<O>, probe: ProbeConfig) -> Self {
        Self {
            scanner: PortScanner::new(),
            opener,
            prober: WakeupProber::with_config(probe),
        }
    }

    /// Enumerate ports matching the SRR receiver identity
    pub fn list_candidates(&self) -> Result<Vec<SerialPortInfo>, DetectError> {
        self.scanner.list_candidates()
    }

    /// Pick the SRR receiver out of `candidates`
    pub async fn identify_srr(
        &self,
        candidates: &[SerialPortInfo],
    ) -> Result<String, DetectError> {
        match candidates {
            [] => return Err(DetectError::PortNotFound),
            [only] => {
                info!("Using {} as SRR receiver", only.port);
                return Ok(only.port.clone());
            }
            _ => {}
        }

        let reported = candidates.iter().any(|c| c.serial().is_some());
        let short: Vec<&SerialPortInfo> = candidates
            .iter()
            .filter(|c| c.serial().is_some_and(is_short_serial))
            .collect();

        if let [dongle] = short.as_slice() {
            info!(
                "Using {} as SRR receiver (serial {})",
                dongle.port,
                dongle.serial().unwrap_or_default()
            );
            return Ok(dongle.port.clone());
        }

        let to_probe: Vec<String> = if reported && !short.is_empty() {
            short.iter().map(|c| c.port.clone()).collect()
        } else {
            candidates.iter().map(|c| c.port.clone()).collect()
        };
        debug!(
            "Serial numbers inconclusive, probing {} port(s)",
            to_probe.len()
        );

        let results = self
            .prober
            .probe_all(Arc::clone(&self.opener), &to_probe)
            .await;
        match results.into_iter().find(|(_, answered)| *answered) {
            Some((port, _)) => {
                info!("Using {} as SRR receiver (answered probe)", port);
                Ok(port)
            }
            None => Err(DetectError::AmbiguousDevice {
                candidates: candidates.iter().map(|c| c.port.clone()).collect(),
            }),
        }
    }

    /// Enumerate and identify in one step
    pub async fn detect_port(&self) -> Result<String, DetectError> {
        let candidates = self.list_candidates()?;
        self.identify_srr(&candidates).await
    }
}

fn is_short_serial(serial: &str) -> bool {
    serial.chars().count() <= SHORT_SERIAL_MAX
}
