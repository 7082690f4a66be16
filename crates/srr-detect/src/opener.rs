//! Opening serial lines
//!
//! Probing and the reader both go through [`PortOpener`], so tests can swap
//! the real serial driver for in-memory streams.

use std::time::Duration;

use srr_protocol::line;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::debug;

use crate::error::DetectError;

/// Opens a byte stream to a named port
///
/// Dropping the returned stream must close the port.
pub trait PortOpener: Send + Sync + 'static {
    /// Stream type produced by this opener
    type Port: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Open `port` at `baud_rate`
    fn open(&self, port: &str, baud_rate: u32) -> Result<Self::Port, DetectError>;
}

/// Opens real serial ports with the SRR line settings (8N1, no flow control)
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialPortOpener;

impl PortOpener for SerialPortOpener {
    type Port = SerialStream;

    fn open(&self, port: &str, baud_rate: u32) -> Result<Self::Port, DetectError> {
        debug!("Opening {} at {} baud", port, baud_rate);
        tokio_serial::new(port, baud_rate)
            .data_bits(data_bits())
            .stop_bits(stop_bits())
            .parity(Parity::None)
            .timeout(Duration::from_millis(100))
            .open_native_async()
            .map_err(|e| DetectError::OpenFailed {
                port: port.to_string(),
                reason: e.to_string(),
            })
    }
}

fn data_bits() -> DataBits {
    match line::DATA_BITS {
        5 => DataBits::Five,
        6 => DataBits::Six,
        7 => DataBits::Seven,
        _ => DataBits::Eight,
    }
}

fn stop_bits() -> StopBits {
    match line::STOP_BITS {
        2 => StopBits::Two,
        _ => StopBits::One,
    }
}
