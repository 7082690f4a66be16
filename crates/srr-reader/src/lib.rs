//! SRR Reader
//!
//! This crate turns the byte stream of an SRR radio receiver into punch
//! events.
//!
//! # Architecture
//!
//! - [`SrrReader`] owns the serial connection: it locates the receiver,
//!   opens the line at the fixed 38400 8N1 settings and runs one read task
//!   per session
//! - [`PunchPipeline`] assembles and decodes frames synchronously for each
//!   received chunk
//! - [`StatisticsTracker`] counts punches, ignored messages and protocol
//!   errors
//! - [`Notifier`] delivers [`ReaderEvent`]s to listeners and subscribers
//!
//! Protocol errors never end a session. Noise, truncated frames and buffer
//! overflows are counted and skipped, the stream keeps flowing.
//!
//! # Example
//!
//! ```rust,no_run
//! use srr_reader::{ReaderConfig, ReaderEvent, SrrReader};
//!
//! # async fn run() -> Result<(), srr_reader::ReaderError> {
//! let reader = SrrReader::new(ReaderConfig::default());
//! let mut events = reader.subscribe();
//! reader.connect(None).await?;
//!
//! while let Ok(event) = events.recv().await {
//!     if let ReaderEvent::Punch(punch) = event {
//!         println!("card {} at control {}", punch.card_number, punch.control_code);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod events;
pub mod notifier;
pub mod pipeline;
pub mod reader;
pub mod state;
pub mod statistics;

pub use error::ReaderError;
pub use events::ReaderEvent;
pub use notifier::{Listener, Notifier};
pub use pipeline::{Outcome, PunchPipeline};
pub use reader::{ReaderConfig, SrrReader};
pub use state::ReaderState;
pub use statistics::{Statistics, StatisticsTracker};
