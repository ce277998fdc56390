//! Transfer outcome reporting.
//!
//! This module contains the per-task [`Summary`] and its terminal [`Status`],
//! plus the [`BatchResult`] aggregated by the downloader.
//!
//! # Examples
//!
//! ```rust
//! use haul::transfer::{Status, Summary, TransferSpec};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let spec = TransferSpec::try_from("https://example.com/file.zip")?;
//! let summary = Summary::new(spec, 2, 1024).fail("Network timeout");
//!
//! match summary.status() {
//!     Status::Done => println!("Transfer completed"),
//!     Status::Failed(msg) => println!("Transfer failed: {}", msg),
//!     Status::Cancelled => println!("Transfer cancelled"),
//! }
//! # Ok(())
//! # }
//! ```

use super::spec::TransferSpec;

/// Terminal status of a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// The file was downloaded, verified and published.
    Done,
    /// The transfer failed with an error message.
    Failed(String),
    /// The transfer observed the cancellation signal.
    Cancelled,
}

/// Represents a [`TransferSpec`] summary.
#[derive(Debug, Clone)]
pub struct Summary {
    /// Transferred item.
    spec: TransferSpec,
    /// Number of attempts made.
    attempts: u32,
    /// Bytes in the published file; 0 unless the transfer is done.
    size: u64,
    /// Status.
    status: Status,
}

impl Summary {
    /// Create a new successful [`Summary`].
    pub fn new(spec: TransferSpec, attempts: u32, size: u64) -> Self {
        Self {
            spec,
            attempts,
            size,
            status: Status::Done,
        }
    }

    /// Attach a status to a [`Summary`].
    pub fn with_status(self, status: Status) -> Self {
        Self { status, ..self }
    }

    /// Mark the summary as failed with a message.
    pub fn fail(self, msg: impl std::fmt::Display) -> Self {
        self.with_status(Status::Failed(msg.to_string()))
    }

    /// Mark the summary as cancelled.
    pub fn cancel(self) -> Self {
        self.with_status(Status::Cancelled)
    }

    /// Get a reference to the summary's transfer.
    pub fn spec(&self) -> &TransferSpec {
        &self.spec
    }

    /// Get the number of attempts made.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Get the summary's size.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Get a reference to the summary's status.
    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Whether the transfer reached `Done`.
    pub fn is_success(&self) -> bool {
        self.status == Status::Done
    }
}

/// Aggregate outcome of one batch.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    succeeded: usize,
    failed: usize,
    summaries: Vec<Summary>,
}

impl BatchResult {
    pub(crate) fn from_summaries(summaries: Vec<Summary>) -> Self {
        let succeeded = summaries.iter().filter(|s| s.is_success()).count();
        Self {
            succeeded,
            failed: summaries.len() - succeeded,
            summaries,
        }
    }

    /// Number of transfers that reached `Done`.
    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    /// Number of transfers that failed or were cancelled.
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Number of transfers in the batch.
    pub fn total(&self) -> usize {
        self.summaries.len()
    }

    /// Per-transfer summaries, in completion order.
    pub fn summaries(&self) -> &[Summary] {
        &self.summaries
    }
}
