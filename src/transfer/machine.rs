//! The per-transfer state machine.
//!
//! A [`TransferMachine`] drives one [`TransferSpec`] from `Pending` to exactly
//! one terminal state. Each attempt probes the working file for a resumable
//! prefix, requests the remaining bytes, streams them to disk, optionally
//! verifies the digest and publishes the file onto its destination.
//! Recoverable failures are retried with a linear backoff; `403` and `404`
//! end the transfer immediately.
//!
//! Every suspension point (gate admission, request, body chunks, writes,
//! hashing, backoff) observes the cancellation token.

use super::digest::digest_file;
use super::spec::TransferSpec;
use super::summary::Summary;
use crate::error::{Error, ErrorClass, Result};
use crate::gate::ConcurrencyGate;
use crate::http::{Transport, TransportResponse};
use crate::progress::ProgressEvents;

use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::StatusCode;
use std::fmt;
use std::io;
use std::path::Path;
use std::time::Duration;
use tokio::{
    fs::{self, File, OpenOptions},
    io::AsyncWriteExt,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// States of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    /// Created, waiting for a gate slot.
    Pending,
    /// Probing the working file and sending the request.
    Connecting,
    /// Writing the response body to the working file.
    Streaming,
    /// Hashing the working file.
    Verifying,
    /// Publishing the working file onto the destination.
    Finalizing,
    /// Backing off before the next attempt.
    Waiting(Duration),
    /// Terminal success.
    Done,
    /// Terminal failure.
    Failed,
    /// Terminal cancellation.
    Cancelled,
}

impl TransferState {
    /// Whether no further transition can happen.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferState::Done | TransferState::Failed | TransferState::Cancelled
        )
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferState::Pending => f.write_str("Pending"),
            TransferState::Connecting => f.write_str("Connecting"),
            TransferState::Streaming => f.write_str("Downloading"),
            TransferState::Verifying => f.write_str("Verifying"),
            TransferState::Finalizing => f.write_str("Finalizing"),
            TransferState::Waiting(delay) => write!(f, "Waiting {}s", delay.as_secs_f32()),
            TransferState::Done => f.write_str("Done"),
            TransferState::Failed => f.write_str("Failed"),
            TransferState::Cancelled => f.write_str("Cancelled"),
        }
    }
}

/// Bookkeeping for one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferAttempt {
    /// 0-based attempt number.
    pub index: u32,
    /// Bytes kept from a previous partial transfer.
    pub bytes_on_disk: u64,
    /// Full size of the file, when the server declared a length.
    pub expected_total: Option<u64>,
}

/// Retry and I/O settings a machine runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineOptions {
    /// Maximum number of attempts.
    pub max_retries: u32,
    /// Backoff before attempt `n + 1` is `(n + 1) * backoff_unit`.
    pub backoff_unit: Duration,
    /// Upper bound for a single write and hash read.
    pub chunk_size: usize,
}

impl Default for MachineOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_unit: Duration::from_secs(2),
            chunk_size: 64 * 1024,
        }
    }
}

/// Drives a single [`TransferSpec`] to a terminal state.
pub struct TransferMachine<'a> {
    spec: &'a TransferSpec,
    transport: &'a dyn Transport,
    gate: &'a ConcurrencyGate,
    cancel: &'a CancellationToken,
    events: &'a ProgressEvents,
    options: &'a MachineOptions,
    label: String,
    task: String,
    state: TransferState,
    attempts: u32,
}

impl<'a> TransferMachine<'a> {
    /// Create a machine in the `Pending` state.
    pub fn new(
        spec: &'a TransferSpec,
        transport: &'a dyn Transport,
        gate: &'a ConcurrencyGate,
        cancel: &'a CancellationToken,
        events: &'a ProgressEvents,
        options: &'a MachineOptions,
    ) -> Self {
        let label = spec.label();
        // Labels repeat across directories; progress is keyed by destination.
        let task = spec.destination().display().to_string();
        events.status(&task, TransferState::Pending);
        Self {
            spec,
            transport,
            gate,
            cancel,
            events,
            options,
            label,
            task,
            state: TransferState::Pending,
            attempts: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Run the transfer to completion and summarize it.
    pub async fn run(mut self) -> Summary {
        let outcome = match self.gate.acquire(self.cancel).await {
            Ok(_permit) => self.drive().await,
            Err(e) => Err(e),
        };
        self.cleanup().await;
        self.conclude(outcome)
    }

    fn set_state(&mut self, state: TransferState) {
        debug!("{}: {} -> {}", self.label, self.state, state);
        self.state = state;
        self.events.status(&self.task, state);
    }

    async fn drive(&mut self) -> Result<u64> {
        let max = self.options.max_retries;
        for index in 0..max {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            self.attempts = index + 1;
            let error = match self.attempt(index).await {
                Ok(size) => return Ok(size),
                Err(e) => e,
            };
            match error.class() {
                ErrorClass::Retryable if index + 1 < max => {
                    let wait = self.options.backoff_unit * (index + 1);
                    info!(
                        "Retry {}/{} for {} in {:?}: {}",
                        index + 1,
                        max,
                        self.label,
                        wait,
                        error
                    );
                    self.set_state(TransferState::Waiting(wait));
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => return Err(Error::Cancelled),
                        _ = tokio::time::sleep(wait) => {}
                    }
                }
                _ => return Err(error),
            }
        }
        Err(Error::Internal("no attempt allowed".into()))
    }

    async fn attempt(&mut self, index: u32) -> Result<u64> {
        self.set_state(TransferState::Connecting);
        let working = self.spec.working_path();

        let mut offset = size_on_disk(&working).await?;
        let mut response = self.send(offset).await?;
        if response.status == StatusCode::RANGE_NOT_SATISFIABLE {
            debug!(
                "Range from {} rejected for {}, restarting from zero",
                offset, self.label
            );
            remove_if_exists(&working).await?;
            offset = 0;
            response = self.send(0).await?;
        }

        let resuming = match response.status {
            StatusCode::PARTIAL_CONTENT => true,
            StatusCode::OK => false,
            status => return Err(Error::HttpStatus(status)),
        };
        if !resuming {
            // The server ignored the range, the whole body follows.
            offset = 0;
        }
        let attempt = TransferAttempt {
            index,
            bytes_on_disk: offset,
            // An overflowing length is as good as no length.
            expected_total: response
                .content_length
                .and_then(|len| len.checked_add(offset)),
        };
        debug!("{}: {:?}", self.label, attempt);

        if let Some(parent) = self.spec.destination().parent() {
            fs::create_dir_all(parent).await?;
        }
        debug!("Opening working file {:?}", &working);
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(resuming)
            .truncate(!resuming)
            .open(&working)
            .await?;

        self.set_state(TransferState::Streaming);
        self.events
            .transfer_start(&self.task, offset, attempt.expected_total);
        let streamed = self.stream_body(&mut file, response.body, &attempt).await;
        // Pending writes must land before the file can be hashed or published.
        let flushed = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            res = file.flush() => res.map_err(Error::from),
        };
        drop(file);
        let size = streamed?;
        flushed?;

        if let Some(expected) = self.spec.expected_digest() {
            self.set_state(TransferState::Verifying);
            let actual = digest_file(
                &working,
                self.spec.algorithm(),
                self.options.chunk_size,
                self.cancel,
            )
            .await?;
            if !actual.eq_ignore_ascii_case(expected) {
                warn!("Digest mismatch for {}", self.label);
                remove_if_exists(&working).await?;
                return Err(Error::DigestMismatch {
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        self.set_state(TransferState::Finalizing);
        publish(&working, self.spec.destination())
            .await
            .map_err(|source| Error::Finalize { source })?;
        Ok(size)
    }

    async fn send(&self, offset: u64) -> Result<TransportResponse> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            res = self.transport.get(self.spec.url(), offset) => res,
        }
    }

    async fn stream_body(
        &self,
        file: &mut File,
        mut body: BoxStream<'static, Result<Bytes>>,
        attempt: &TransferAttempt,
    ) -> Result<u64> {
        let chunk_size = self.options.chunk_size.max(1);
        let mut written = attempt.bytes_on_disk;
        loop {
            let item = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(Error::Cancelled),
                item = body.next() => item,
            };
            let Some(item) = item else {
                break;
            };
            let mut chunk = item?;
            while !chunk.is_empty() {
                let piece = chunk.split_to(chunk_size.min(chunk.len()));
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return Err(Error::Cancelled),
                    res = file.write_all(&piece) => res?,
                }
                written += piece.len() as u64;
                self.events
                    .bytes(&self.task, piece.len() as u64, attempt.expected_total);
            }
        }
        Ok(written)
    }

    async fn cleanup(&self) {
        let working = self.spec.working_path();
        match fs::remove_file(&working).await {
            Ok(()) => debug!("Removed working file {:?}", working),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove working file {:?}: {}", working, e),
        }
    }

    fn conclude(mut self, outcome: Result<u64>) -> Summary {
        let summary = Summary::new(self.spec.clone(), self.attempts, 0);
        match outcome {
            Ok(size) => {
                self.set_state(TransferState::Done);
                info!("Downloaded {} ({} bytes)", self.label, size);
                Summary::new(self.spec.clone(), self.attempts, size)
            }
            Err(Error::Cancelled) => {
                self.set_state(TransferState::Cancelled);
                warn!("Cancelled {}", self.label);
                summary.cancel()
            }
            Err(e) => {
                self.set_state(TransferState::Failed);
                error!(
                    "Failed to download {} after {} attempt(s): {}",
                    self.label, self.attempts, e
                );
                summary.fail(e)
            }
        }
    }
}

async fn size_on_disk(path: &Path) -> Result<u64> {
    match fs::metadata(path).await {
        Ok(metadata) => Ok(metadata.len()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e.into()),
    }
}

async fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Replace `destination` with `working`.
///
/// Remove-then-rename: a crash between both steps leaves no destination but
/// keeps the complete working file.
async fn publish(working: &Path, destination: &Path) -> io::Result<()> {
    remove_if_exists(destination).await?;
    fs::rename(working, destination).await
}
