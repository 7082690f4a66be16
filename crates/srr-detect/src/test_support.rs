//! In-memory ports for probe and locator tests

use std::collections::HashMap;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use srr_protocol::{ACK, WAKEUP};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream, ReadBuf};

use crate::error::DetectError;
use crate::opener::PortOpener;

/// How a fixture device reacts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Replies ACK to the wake-up byte
    Answer,
    /// Reads everything, never replies
    Silent,
    /// Fails to open
    Unavailable,
}

#[derive(Debug)]
struct PortFixture {
    behavior: Behavior,
    open: Arc<AtomicBool>,
    opens: AtomicUsize,
    received: Arc<Mutex<Vec<u8>>>,
}

/// Opener handing out duplex streams backed by scripted devices
#[derive(Debug, Default)]
pub struct FixtureOpener {
    ports: HashMap<String, PortFixture>,
}

impl FixtureOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_port(mut self, port: &str, behavior: Behavior) -> Self {
        self.ports.insert(
            port.to_string(),
            PortFixture {
                behavior,
                open: Arc::new(AtomicBool::new(false)),
                opens: AtomicUsize::new(0),
                received: Arc::new(Mutex::new(Vec::new())),
            },
        );
        self
    }

    pub fn is_open(&self, port: &str) -> bool {
        self.ports
            .get(port)
            .map(|p| p.open.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    pub fn open_count(&self, port: &str) -> usize {
        self.ports
            .get(port)
            .map(|p| p.opens.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    pub fn total_opens(&self) -> usize {
        self.ports
            .values()
            .map(|p| p.opens.load(Ordering::SeqCst))
            .sum()
    }

    pub fn received(&self, port: &str) -> Vec<u8> {
        self.ports
            .get(port)
            .map(|p| p.received.lock().unwrap().clone())
            .unwrap_or_default()
    }
}

impl PortOpener for FixtureOpener {
    type Port = FixturePort;

    fn open(&self, port: &str, _baud_rate: u32) -> Result<Self::Port, DetectError> {
        let fixture = self.ports.get(port).ok_or_else(|| DetectError::OpenFailed {
            port: port.to_string(),
            reason: "no such port".into(),
        })?;
        if fixture.behavior == Behavior::Unavailable {
            return Err(DetectError::OpenFailed {
                port: port.to_string(),
                reason: "access denied".into(),
            });
        }

        let (host, mut device) = tokio::io::duplex(64);
        let behavior = fixture.behavior;
        let received = Arc::clone(&fixture.received);
        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            loop {
                match device.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        received.lock().unwrap().extend_from_slice(&buf[..n]);
                        if behavior == Behavior::Answer && buf[..n].contains(&WAKEUP) {
                            let _ = device.write_all(&[ACK]).await;
                        }
                    }
                }
            }
        });

        fixture.opens.fetch_add(1, Ordering::SeqCst);
        fixture.open.store(true, Ordering::SeqCst);
        Ok(FixturePort {
            inner: host,
            open: Arc::clone(&fixture.open),
        })
    }
}

/// Host end of a fixture device, marks the port closed when dropped
#[derive(Debug)]
pub struct FixturePort {
    inner: DuplexStream,
    open: Arc<AtomicBool>,
}

impl Drop for FixturePort {
    fn drop(&mut self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

impl AsyncRead for FixturePort {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for FixturePort {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
