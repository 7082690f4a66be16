//! Connection management and the read loop
//!
//! [`SrrReader`] owns at most one open serial line. Each successful
//! [`connect`](SrrReader::connect) spawns a read task that owns the stream
//! and a fresh [`PunchPipeline`]; [`disconnect`](SrrReader::disconnect) stops
//! that task and drops everything it held. Nothing of a previous session's
//! parser state survives into the next one.
//!
//! Sessions are numbered. A read task only ever changes the reader state for
//! its own session, so a task that is slow to wind down cannot touch a newer
//! connection.

use std::io::ErrorKind;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use srr_detect::{PortLocator, PortOpener, ProbeConfig, SerialPortOpener};
use srr_protocol::{line, AssemblerConfig};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::ReaderError;
use crate::events::ReaderEvent;
use crate::notifier::Notifier;
use crate::pipeline::{Outcome, PunchPipeline};
use crate::state::ReaderState;
use crate::statistics::{Statistics, StatisticsTracker};

/// Reader configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Locate the receiver when no port is given
    pub auto_detect: bool,
    /// Port used when `connect` is called without one
    pub port: Option<String>,
    /// Size of a single serial read
    pub read_buffer_size: usize,
    /// Upper bound for stopping the read task (milliseconds)
    pub shutdown_timeout_ms: u64,
    /// Frame assembler limits
    pub assembler: AssemblerConfig,
    /// Device probing during auto-detect
    pub probe: ProbeConfig,
    /// Events buffered per async subscriber
    pub event_capacity: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            auto_detect: true,
            port: None,
            read_buffer_size: 1024,
            shutdown_timeout_ms: 2000,
            assembler: AssemblerConfig::default(),
            probe: ProbeConfig::default(),
            event_capacity: 256,
        }
    }
}

impl ReaderConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

/// Commands that can be sent to a read task
#[derive(Debug)]
enum ReadTaskCommand {
    /// Stop reading and close the port
    Shutdown,
}

/// Why a read loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopExit {
    Shutdown,
    Lost,
}

/// Handle to the running read task
struct Connection {
    session: u64,
    port: String,
    cmd_tx: mpsc::Sender<ReadTaskCommand>,
    task: JoinHandle<()>,
}

#[derive(Debug, Default)]
struct Lifecycle {
    state: ReaderState,
    session: u64,
    port: Option<String>,
}

/// State shared between the reader and its read task
#[derive(Debug)]
struct Shared {
    lifecycle: Mutex<Lifecycle>,
    stats: StatisticsTracker,
    notifier: Notifier,
}

impl Shared {
    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a new session in `Connecting`
    fn begin(&self) -> u64 {
        let mut lifecycle = self.lifecycle();
        lifecycle.session += 1;
        lifecycle.state = ReaderState::Connecting;
        lifecycle.port = None;
        lifecycle.session
    }

    fn listening(&self, session: u64, port: &str) {
        {
            let mut lifecycle = self.lifecycle();
            if lifecycle.session != session {
                return;
            }
            lifecycle.state = ReaderState::Listening;
            lifecycle.port = Some(port.to_string());
        }
        self.stats.mark_connected();
        self.notifier.emit(ReaderEvent::Connected {
            port: port.to_string(),
        });
    }

    /// Steady-state I/O failure
    fn failed(&self, session: u64, message: String) {
        {
            let mut lifecycle = self.lifecycle();
            if lifecycle.session != session || lifecycle.state != ReaderState::Listening {
                return;
            }
            lifecycle.state = ReaderState::Error;
        }
        self.notifier.emit(ReaderEvent::Error { message });
    }

    /// Close `session`, announcing it only if `connected` was announced
    fn end(&self, session: u64) {
        let announced = {
            let mut lifecycle = self.lifecycle();
            if lifecycle.session != session || lifecycle.state == ReaderState::Disconnected {
                return;
            }
            let announced = lifecycle.state.is_announced();
            lifecycle.state = ReaderState::Disconnected;
            lifecycle.port = None;
            announced
        };
        if announced {
            self.stats.mark_disconnected();
            self.notifier.emit(ReaderEvent::Disconnected);
        }
    }

    fn handle(&self, outcome: Outcome) {
        self.stats.record(&outcome);
        if let Outcome::Punch { punch, .. } = outcome {
            self.notifier.emit(ReaderEvent::Punch(punch));
        }
    }
}

/// Passive radio punch reader
pub struct SrrReader<O: PortOpener = SerialPortOpener> {
    config: ReaderConfig,
    opener: Arc<O>,
    locator: PortLocator<O>,
    shared: Arc<Shared>,
    connection: tokio::sync::Mutex<Option<Connection>>,
}

impl SrrReader<SerialPortOpener> {
    /// Reader over real serial ports
    pub fn new(config: ReaderConfig) -> Self {
        Self::with_opener(config, Arc::new(SerialPortOpener))
    }
}

impl<O: PortOpener> SrrReader<O> {
    /// Reader opening ports through `opener`
    pub fn with_opener(config: ReaderConfig, opener: Arc<O>) -> Self {
        let locator = PortLocator::with_opener(Arc::clone(&opener), config.probe);
        let shared = Arc::new(Shared {
            lifecycle: Mutex::new(Lifecycle::default()),
            stats: StatisticsTracker::new(),
            notifier: Notifier::new(config.event_capacity),
        });
        Self {
            config,
            opener,
            locator,
            shared,
            connection: tokio::sync::Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Locate the SRR receiver among the host's serial ports
    pub async fn detect_port(&self) -> Result<String, ReaderError> {
        Ok(self.locator.detect_port().await?)
    }

    /// Start listening
    ///
    /// `port` overrides the configured port. Without either, the receiver is
    /// located automatically unless auto-detect is disabled. An existing
    /// connection is torn down first. Returns the port now being read.
    pub async fn connect(&self, port: Option<&str>) -> Result<String, ReaderError> {
        let mut connection = self.connection.lock().await;
        self.teardown(&mut connection).await;

        let session = self.shared.begin();
        let port = match self.resolve_port(port).await {
            Ok(port) => port,
            Err(e) => {
                self.shared.end(session);
                return Err(e);
            }
        };

        info!("Connecting to {} at {} baud", port, line::BAUD_RATE);
        let io = match self.opener.open(&port, line::BAUD_RATE) {
            Ok(io) => io,
            Err(e) => {
                warn!("Failed to open {}: {}", port, e);
                self.shared.end(session);
                return Err(ReaderError::SerialIo {
                    port,
                    reason: e.to_string(),
                });
            }
        };

        self.shared.listening(session, &port);

        let (cmd_tx, cmd_rx) = mpsc::channel(1);
        let task = tokio::spawn(run_read_loop(
            io,
            port.clone(),
            session,
            Arc::clone(&self.shared),
            PunchPipeline::new(self.config.assembler),
            self.config.read_buffer_size.max(1),
            cmd_rx,
        ));

        *connection = Some(Connection {
            session,
            port: port.clone(),
            cmd_tx,
            task,
        });
        Ok(port)
    }

    async fn resolve_port(&self, port: Option<&str>) -> Result<String, ReaderError> {
        if let Some(port) = port.or(self.config.port.as_deref()) {
            return Ok(port.to_string());
        }
        if !self.config.auto_detect {
            return Err(ReaderError::NoPortConfigured);
        }
        self.detect_port().await
    }

    /// Stop listening and close the port
    ///
    /// Safe to call at any time. Emits `disconnected` only when a session
    /// that announced `connected` is actually ended.
    pub async fn disconnect(&self) {
        let mut connection = self.connection.lock().await;
        self.teardown(&mut connection).await;
    }

    async fn teardown(&self, slot: &mut Option<Connection>) {
        let Some(connection) = slot.take() else {
            return;
        };
        let Connection {
            session,
            port,
            cmd_tx,
            mut task,
        } = connection;

        debug!("Stopping read task for {}", port);
        // Closed if the task already ended
        let _ = cmd_tx.send(ReadTaskCommand::Shutdown).await;
        drop(cmd_tx);

        match tokio::time::timeout(self.config.shutdown_timeout(), &mut task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Read task for {} failed: {}", port, e),
            Err(_) => {
                warn!(
                    "Read task for {} did not stop within {:?}, aborting",
                    port,
                    self.config.shutdown_timeout()
                );
                task.abort();
            }
        }

        self.shared.end(session);
        info!("Disconnected from {}", port);
    }

    /// Snapshot of the counters
    pub fn get_statistics(&self) -> Statistics {
        self.shared.stats.snapshot()
    }

    pub fn state(&self) -> ReaderState {
        self.shared.lifecycle().state
    }

    /// Port of the current session, if listening
    pub fn port(&self) -> Option<String> {
        self.shared.lifecycle().port.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ReaderState::Listening
    }

    /// Register a synchronous listener, see [`Notifier::add_listener`]
    pub fn add_listener<F>(&self, listener: F)
    where
        F: Fn(&ReaderEvent) + Send + Sync + 'static,
    {
        self.shared.notifier.add_listener(listener);
    }

    /// Receive events asynchronously
    pub fn subscribe(&self) -> broadcast::Receiver<ReaderEvent> {
        self.shared.notifier.subscribe()
    }
}

/// Main read loop - runs until the line fails or shutdown is requested
async fn run_read_loop<S>(
    mut io: S,
    port: String,
    session: u64,
    shared: Arc<Shared>,
    mut pipeline: PunchPipeline,
    buffer_size: usize,
    mut cmd_rx: mpsc::Receiver<ReadTaskCommand>,
) where
    S: AsyncRead + Unpin + Send,
{
    info!("Listening on {}", port);
    let mut buffer = vec![0u8; buffer_size];

    let exit = loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(ReadTaskCommand::Shutdown) | None => {
                        debug!("Shutdown requested for {}", port);
                        break LoopExit::Shutdown;
                    }
                }
            }

            result = io.read(&mut buffer) => {
                match result {
                    Ok(0) => {
                        warn!("Serial port {} closed", port);
                        let err = ReaderError::SerialIo {
                            port: port.clone(),
                            reason: "port closed".into(),
                        };
                        shared.failed(session, err.to_string());
                        break LoopExit::Lost;
                    }
                    Ok(n) => {
                        debug!("Read {} bytes from {}: {:02X?}", n, port, &buffer[..n]);
                        for outcome in pipeline.feed(&buffer[..n]) {
                            shared.handle(outcome);
                        }
                    }
                    Err(e) if is_transient(e.kind()) => {}
                    Err(e) => {
                        warn!("Read error on {}: {}", port, e);
                        let err = ReaderError::SerialIo {
                            port: port.clone(),
                            reason: e.to_string(),
                        };
                        shared.failed(session, err.to_string());
                        break LoopExit::Lost;
                    }
                }
            }
        }
    };

    pipeline.reset();
    drop(io);
    if exit == LoopExit::Lost {
        shared.end(session);
    }
    info!("Read loop ended for {}", port);
}

/// Read errors that leave the line usable
fn is_transient(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
    )
}
