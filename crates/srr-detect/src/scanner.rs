//! Serial port enumeration
//!
//! This module enumerates host serial ports and narrows them down to those
//! that look like a SPORTident receiver.

use serialport::{available_ports, SerialPortInfo as SerialPortInfoRaw, SerialPortType};
use tracing::{debug, info};

use crate::error::DetectError;
use crate::usb_ids::{is_srr_usb_id, matches_manufacturer};

/// One enumerated serial port and whatever USB identity it reported
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerialPortInfo {
    /// OS device name, `/dev/ttyUSB0` or `COM3`
    pub port: String,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    /// Radio dongles report short serials, card readers long ones
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl SerialPortInfo {
    fn from_listing(listing: SerialPortInfoRaw) -> Self {
        let port = listing.port_name;
        let SerialPortType::UsbPort(usb) = listing.port_type else {
            return Self {
                port,
                ..Default::default()
            };
        };
        Self {
            port,
            vid: Some(usb.vid),
            pid: Some(usb.pid),
            serial_number: usb.serial_number,
            manufacturer: usb.manufacturer,
            product: usb.product,
        }
    }

    /// Whether this port matches the SPORTident USB identity
    pub fn is_srr_candidate(&self) -> bool {
        if let (Some(vid), Some(pid)) = (self.vid, self.pid) {
            if is_srr_usb_id(vid, pid) {
                return true;
            }
        }
        self.manufacturer
            .as_deref()
            .map(matches_manufacturer)
            .unwrap_or(false)
    }

    /// Non-empty USB serial number, if reported
    pub fn serial(&self) -> Option<&str> {
        self.serial_number
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Lists host serial ports
///
/// Ports whose name contains an ignored fragment never show up.
/// macOS exposes Bluetooth serial endpoints that stall on open, so those are
/// ignored by default.
#[derive(Debug, Clone)]
pub struct PortScanner {
    ignored: Vec<String>,
}

impl PortScanner {
    pub fn new() -> Self {
        Self {
            ignored: vec!["Bluetooth".to_string()],
        }
    }

    /// Every visible serial port, USB or not
    pub fn enumerate_ports(&self) -> Result<Vec<SerialPortInfo>, DetectError> {
        let listings =
            available_ports().map_err(|e| DetectError::EnumerationFailed(e.to_string()))?;

        let ports: Vec<SerialPortInfo> = listings
            .into_iter()
            .map(SerialPortInfo::from_listing)
            .filter(|p| !self.is_ignored(&p.port))
            .collect();

        debug!("{} serial port(s) visible", ports.len());
        for p in &ports {
            debug!(
                "  {} [{}]",
                p.port,
                p.product.as_deref().unwrap_or("no USB descriptor")
            );
        }
        Ok(ports)
    }

    /// Enumerate ports that match the SRR receiver identity
    pub fn list_candidates(&self) -> Result<Vec<SerialPortInfo>, DetectError> {
        let candidates = filter_candidates(self.enumerate_ports()?);
        info!("{} SPORTident candidate port(s)", candidates.len());
        Ok(candidates)
    }

    fn is_ignored(&self, name: &str) -> bool {
        self.ignored.iter().any(|fragment| name.contains(fragment))
    }
}

impl Default for PortScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep only ports matching the SRR receiver identity
pub fn filter_candidates(ports: Vec<SerialPortInfo>) -> Vec<SerialPortInfo> {
    ports
        .into_iter()
        .filter(|p| {
            let keep = p.is_srr_candidate();
            if !keep {
                debug!("Skipping {}: not a SPORTident device", p.port);
            }
            keep
        })
        .collect()
}
