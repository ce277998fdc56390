//! Progress reporting.
//!
//! Transfers never draw anything themselves: they emit events through
//! [`ProgressEvents`] and the downloader forwards them to an optional
//! [`ProgressSink`]. Running without a sink is the headless mode.
//!
//! # Overview
//!
//! - `sink` - the [`ProgressSink`] trait and the non-blocking event forwarder
//! - `display` - [`ConsoleProgress`], an indicatif-based sink
//! - `style` - progress bar styling options and templates
//!
//! # Examples
//!
//! ## Custom Sink
//!
//! ```rust
//! use haul::progress::ProgressSink;
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! #[derive(Default)]
//! struct ByteCounter(AtomicU64);
//!
//! impl ProgressSink for ByteCounter {
//!     fn on_byte_progress(&self, _task: &str, bytes: u64, _total: Option<u64>) {
//!         self.0.fetch_add(bytes, Ordering::Relaxed);
//!     }
//! }
//! ```

pub(crate) mod display;
pub(crate) mod sink;
pub(crate) mod style;

pub use display::ConsoleProgress;
pub use sink::{ProgressEvent, ProgressEvents, ProgressSink};
pub use style::{ProgressBarOpts, StyleOptions};
