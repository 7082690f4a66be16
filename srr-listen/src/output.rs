//! Event printing

use std::io::Write;

use anyhow::Result;
use srr_protocol::Punch;
use srr_reader::ReaderEvent;

/// How events are written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Text,
    Json,
}

impl Output {
    pub fn new(json: bool) -> Self {
        if json {
            Output::Json
        } else {
            Output::Text
        }
    }

    /// Write one event as a single line
    pub fn write_event<W: Write>(&self, out: &mut W, event: &ReaderEvent) -> Result<()> {
        match self {
            Output::Json => writeln!(out, "{}", serde_json::to_string(event)?)?,
            Output::Text => writeln!(out, "{}", format_event(event))?,
        }
        out.flush()?;
        Ok(())
    }
}

fn format_event(event: &ReaderEvent) -> String {
    match event {
        ReaderEvent::Punch(punch) => format_punch(punch),
        ReaderEvent::Error { message } => format!("error      {}", message),
        ReaderEvent::Connected { port } => format!("connected  {}", port),
        ReaderEvent::Disconnected => "disconnected".to_string(),
    }
}

fn format_punch(punch: &Punch) -> String {
    let (h, m, s, tenths) = punch.time_of_day();
    format!(
        "punch      card {:>8}  control {:>3}  {:02}:{:02}:{:02}.{}  received {}",
        punch.card_number,
        punch.control_code,
        h,
        m,
        s,
        tenths,
        punch.timestamp.format("%H:%M:%S%.3f")
    )
}
