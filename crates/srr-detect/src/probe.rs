//! Active probing for the SRR receiver
//!
//! A sleeping SPORTident station answers the wake-up byte, a card reader
//! waiting for a card stays silent. Each probe opens its port, writes
//! [`WAKEUP`], waits for any byte, and closes the port again whether or not
//! anything came back.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use srr_protocol::{line, WAKEUP};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use crate::opener::PortOpener;

/// Configuration for probing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// How long to wait for a reply to the wake-up byte
    #[serde(with = "millis")]
    pub timeout: Duration,
    /// Pause between opening the port and writing
    #[serde(with = "millis")]
    pub settle: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(500),
            settle: Duration::from_millis(50),
        }
    }
}

/// Wake-up byte prober
#[derive(Debug, Clone, Default)]
pub struct WakeupProber {
    config: ProbeConfig,
}

impl WakeupProber {
    /// Create a new prober with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a prober with custom configuration
    pub fn with_config(config: ProbeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Send the wake-up byte on an open stream and wait for any reply
    ///
    /// The configured timeout bounds the whole exchange, so a port that
    /// stalls on write is rejected as well.
    pub async fn probe<S>(&self, stream: &mut S) -> bool
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        trace!("Sending wake-up probe");
        let mut buf = [0u8; 16];
        let exchange = async {
            stream.write_all(&[WAKEUP]).await?;
            stream.flush().await?;
            stream.read(&mut buf).await
        };
        let result = timeout(self.config.timeout, exchange).await;

        match result {
            Ok(Ok(n)) if n > 0 => {
                trace!("Wake-up response: {:02X?}", &buf[..n]);
                true
            }
            Ok(Ok(_)) => {
                trace!("Port closed during wake-up probe");
                false
            }
            Ok(Err(e)) => {
                warn!("Wake-up probe failed: {}", e);
                false
            }
            Err(_) => {
                trace!("Wake-up probe timeout");
                false
            }
        }
    }

    /// Open `port`, probe it, and close it again
    pub async fn probe_port<O: PortOpener>(&self, opener: &O, port: &str) -> bool {
        debug!("Probing {} at {} baud", port, line::BAUD_RATE);

        let mut stream = match opener.open(port, line::BAUD_RATE) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to open {}: {}", port, e);
                return false;
            }
        };

        // Give the port a moment to settle
        tokio::time::sleep(self.config.settle).await;

        let answered = self.probe(&mut stream).await;
        drop(stream);

        if answered {
            info!("{} answered the wake-up probe", port);
        } else {
            debug!("{} did not answer the wake-up probe", port);
        }
        answered
    }

    /// Probe every port concurrently
    ///
    /// Results come back in the order of `ports`. Each task owns its stream
    /// and closes it when the task ends, whatever the outcome.
    pub async fn probe_all<O: PortOpener>(
        &self,
        opener: Arc<O>,
        ports: &[String],
    ) -> Vec<(String, bool)> {
        let mut tasks = JoinSet::new();
        for (index, port) in ports.iter().enumerate() {
            let prober = self.clone();
            let opener = Arc::clone(&opener);
            let port = port.clone();
            tasks.spawn(async move {
                let answered = prober.probe_port(opener.as_ref(), &port).await;
                (index, answered)
            });
        }

        let mut answered = vec![false; ports.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, ok)) => answered[index] = ok,
                Err(e) => warn!("Probe task failed: {}", e),
            }
        }

        ports.iter().cloned().zip(answered).collect()
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Behavior, FixtureOpener};

    fn quick() -> WakeupProber {
        WakeupProber::with_config(ProbeConfig {
            timeout: Duration::from_millis(50),
            settle: Duration::from_millis(1),
        })
    }

    #[test]
    fn test_probe_config_default() {
        let config = ProbeConfig::default();
        assert_eq!(config.timeout, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_answering_port_confirms_and_closes() {
        let opener = FixtureOpener::new().with_port("/dev/ttyUSB0", Behavior::Answer);
        assert!(quick().probe_port(&opener, "/dev/ttyUSB0").await);
        assert_eq!(opener.open_count("/dev/ttyUSB0"), 1);
        assert!(!opener.is_open("/dev/ttyUSB0"));
        assert_eq!(opener.received("/dev/ttyUSB0"), vec![WAKEUP]);
    }

    #[tokio::test]
    async fn test_silent_port_times_out_and_closes() {
        let opener = FixtureOpener::new().with_port("/dev/ttyUSB1", Behavior::Silent);
        assert!(!quick().probe_port(&opener, "/dev/ttyUSB1").await);
        assert_eq!(opener.open_count("/dev/ttyUSB1"), 1);
        assert!(!opener.is_open("/dev/ttyUSB1"));
    }

    #[tokio::test]
    async fn test_stalled_write_times_out() {
        // One-byte pipe already full, so the wake-up write never completes
        let (mut stream, _far) = tokio::io::duplex(1);
        stream.write_all(&[0x00]).await.unwrap();

        let started = std::time::Instant::now();
        assert!(!quick().probe(&mut stream).await);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_unopenable_port_is_rejected() {
        let opener = FixtureOpener::new().with_port("COM9", Behavior::Unavailable);
        assert!(!quick().probe_port(&opener, "COM9").await);
        assert!(!opener.is_open("COM9"));
    }

    #[tokio::test]
    async fn test_probe_all_keeps_order() {
        let opener = Arc::new(
            FixtureOpener::new()
                .with_port("a", Behavior::Silent)
                .with_port("b", Behavior::Answer)
                .with_port("c", Behavior::Silent),
        );
        let ports = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        let results = quick().probe_all(Arc::clone(&opener), &ports).await;
        assert_eq!(
            results,
            vec![
                ("a".to_string(), false),
                ("b".to_string(), true),
                ("c".to_string(), false)
            ]
        );
        for port in &ports {
            assert!(!opener.is_open(port));
        }
    }
}
