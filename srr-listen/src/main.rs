//! SRR Listener
//!
//! Connects to an SRR radio receiver and prints every punch it reports.
//! The receiver is located automatically unless a port is given. When the
//! dongle goes away the listener keeps retrying until interrupted.

mod output;
mod settings;

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use output::Output;
use settings::Settings;
use srr_detect::PortScanner;
use srr_reader::{ReaderEvent, SrrReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[clap(name = "srr-listen", version, about = "Print radio punches from an SRR receiver")]
struct Args {
    /// Serial port of the receiver (skips auto-detection)
    #[clap(short, long, env = "SRR_PORT")]
    port: Option<String>,

    /// Never locate the receiver automatically
    #[clap(long)]
    no_auto_detect: bool,

    /// Seconds between reconnect attempts
    #[clap(long)]
    retry_secs: Option<u64>,

    /// Print events as JSON lines
    #[clap(long)]
    json: bool,

    /// Debug logging
    #[clap(short, long)]
    verbose: bool,

    /// List serial ports and exit
    #[clap(long)]
    list_ports: bool,

    /// Write the effective settings to the settings file
    #[clap(long)]
    save_settings: bool,
}

impl Args {
    /// Command-line flags take precedence over the settings file
    fn apply(&self, settings: &mut Settings) {
        if let Some(port) = &self.port {
            settings.reader.port = Some(port.clone());
        }
        if self.no_auto_detect {
            settings.reader.auto_detect = false;
        }
        if let Some(secs) = self.retry_secs {
            settings.retry_secs = secs;
        }
        if self.json {
            settings.json = true;
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "srr_listen=debug,srr_protocol=debug,srr_detect=debug,srr_reader=debug"
    } else {
        "srr_listen=info,srr_protocol=info,srr_detect=info,srr_reader=info"
    };

    // Logs go to stderr, stdout carries the events
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn list_ports() -> Result<()> {
    let ports = PortScanner::new()
        .enumerate_ports()
        .context("Failed to list serial ports")?;
    if ports.is_empty() {
        println!("No serial ports found");
        return Ok(());
    }

    for port in ports {
        let marker = if port.is_srr_candidate() { "*" } else { " " };
        let ids = match (port.vid, port.pid) {
            (Some(vid), Some(pid)) => format!("{:04X}:{:04X}", vid, pid),
            _ => "----:----".to_string(),
        };
        println!(
            "{} {:<20} {}  serial {:<12} {}",
            marker,
            port.port,
            ids,
            port.serial().unwrap_or("-"),
            port.product.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

/// Connect, print events until the line drops, wait, repeat
async fn listen(
    reader: &SrrReader,
    events: &mut broadcast::Receiver<ReaderEvent>,
    output: Output,
    retry: Duration,
) -> Result<()> {
    loop {
        if let Err(e) = reader.connect(None).await {
            warn!("{}, retrying in {:?}", e, retry);
            tokio::time::sleep(retry).await;
            continue;
        }

        loop {
            match events.recv().await {
                Ok(event) => {
                    output.write_event(&mut std::io::stdout().lock(), &event)?;
                    if event == ReaderEvent::Disconnected {
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => warn!("Output fell behind, {} events dropped", n),
                Err(RecvError::Closed) => bail!("event channel closed"),
            }
        }

        info!("Receiver lost, reconnecting in {:?}", retry);
        tokio::time::sleep(retry).await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.list_ports {
        return list_ports();
    }

    let mut settings = Settings::load();
    args.apply(&mut settings);
    if args.save_settings {
        let path = settings
            .save()
            .map_err(anyhow::Error::msg)
            .context("Failed to save settings")?;
        info!("Settings saved to {}", path.display());
    }

    info!("Starting SRR listener");
    let reader = SrrReader::new(settings.reader.clone());
    let mut events = reader.subscribe();
    let output = Output::new(settings.json);
    let retry = Duration::from_secs(settings.retry_secs.max(1));

    tokio::select! {
        result = listen(&reader, &mut events, output, retry) => result?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to wait for Ctrl-C")?;
            info!("Interrupted, closing receiver");
        }
    }

    let shutdown = settings.reader.shutdown_timeout();
    if tokio::time::timeout(shutdown, reader.disconnect())
        .await
        .is_err()
    {
        warn!("Receiver did not close within {:?}", shutdown);
    }

    let stats = reader.get_statistics();
    info!(
        "{} punches, {} protocol errors, {} ignored messages",
        stats.punches_received, stats.errors, stats.ignored_messages
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_settings() {
        let args = Args::parse_from([
            "srr-listen",
            "--port",
            "COM4",
            "--no-auto-detect",
            "--retry-secs",
            "10",
            "--json",
        ]);
        let mut settings = Settings::default();
        args.apply(&mut settings);

        assert_eq!(settings.reader.port.as_deref(), Some("COM4"));
        assert!(!settings.reader.auto_detect);
        assert_eq!(settings.retry_secs, 10);
        assert!(settings.json);
    }

    #[test]
    fn test_no_flags_keep_settings() {
        let args = Args::parse_from(["srr-listen"]);
        let mut settings = Settings {
            retry_secs: 3,
            ..Default::default()
        };
        settings.reader.port = Some("/dev/ttyUSB2".into());
        let before = settings.clone();

        args.apply(&mut settings);
        if std::env::var_os("SRR_PORT").is_none() {
            assert_eq!(settings, before);
        }
    }
}
