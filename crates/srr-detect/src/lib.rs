//! SRR Receiver Detection Library
//!
//! This crate finds the SPORTident SRR radio receiver among the host's serial
//! ports and tells it apart from card readers sharing its USB identity.
//!
//! # Example
//!
//! ```rust,no_run
//! use srr_detect::PortLocator;
//!
//! # async fn run() -> Result<(), srr_detect::DetectError> {
//! let locator = PortLocator::new();
//! let port = locator.detect_port().await?;
//! println!("SRR receiver on {}", port);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod locator;
pub mod opener;
pub mod probe;
pub mod scanner;
pub mod usb_ids;

#[cfg(test)]
mod test_support;

pub use error::DetectError;
pub use locator::PortLocator;
pub use opener::{PortOpener, SerialPortOpener};
pub use probe::{ProbeConfig, WakeupProber};
pub use scanner::{filter_candidates, PortScanner, SerialPortInfo};
