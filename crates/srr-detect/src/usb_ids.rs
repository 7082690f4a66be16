//! USB identity of SPORTident receivers
//!
//! SPORTident stations use a Silicon Labs CP210x bridge. The SRR dongle and
//! the BSM7/BSM8 card readers report the same vendor ID, so identity alone
//! narrows the list down to "some SPORTident device".

/// USB Vendor ID / Product ID pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsbId {
    pub vid: u16,
    pub pid: u16,
}

impl UsbId {
    pub const fn new(vid: u16, pid: u16) -> Self {
        Self { vid, pid }
    }
}

/// Silicon Labs bridge as shipped in SPORTident devices
pub mod sportident {
    use super::UsbId;

    pub const VID: u16 = 0x10C4;

    /// SPORTident USB station (SRR dongle, BSM8-USB)
    pub const STATION: UsbId = UsbId::new(VID, 0x800A);
    /// Stock CP2102 identity seen on older readers
    pub const CP2102: UsbId = UsbId::new(VID, 0xEA60);
    /// Dual-port CP2105
    pub const CP2105: UsbId = UsbId::new(VID, 0xEA70);

    /// All known product IDs
    pub const ALL_PIDS: &[u16] = &[0x800A, 0xEA60, 0xEA70];

    /// Lowercase manufacturer substrings that identify the device family
    pub const MANUFACTURER_PATTERNS: &[&str] = &["sportident", "silicon labs", "silabs"];
}

/// Check if a VID/PID belongs to a SPORTident receiver
pub fn is_srr_usb_id(vid: u16, pid: u16) -> bool {
    vid == sportident::VID && sportident::ALL_PIDS.contains(&pid)
}

/// Check if a USB manufacturer string names the SPORTident device family
pub fn matches_manufacturer(manufacturer: &str) -> bool {
    let lower = manufacturer.to_lowercase();
    sportident::MANUFACTURER_PATTERNS
        .iter()
        .any(|pattern| lower.contains(pattern))
}
