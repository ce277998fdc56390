//! Core downloader implementation orchestrating batches of transfers.
//!
//! This module contains the main [`Downloader`] struct. It resolves each
//! [`TransferSpec`] against the download directory, runs one
//! [`TransferMachine`] per spec under a shared [`ConcurrencyGate`], forwards
//! progress to the configured sink and aggregates the outcomes into a
//! [`BatchResult`].
//!
//! # Examples
//!
//! ## Basic Download
//!
//! ```rust,no_run
//! use haul::downloader::DownloaderBuilder;
//! use haul::transfer::TransferSpec;
//! use std::convert::TryFrom;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = DownloaderBuilder::new().build();
//! let specs = vec![
//!     TransferSpec::try_from("https://example.com/file1.zip")?,
//!     TransferSpec::try_from("https://example.com/file2.pdf")?,
//! ];
//!
//! let result = downloader.download(&specs).await;
//! for summary in result.summaries() {
//!     println!("{} - {:?}", summary.spec().label(), summary.status());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Cancelling a Batch
//!
//! ```rust,no_run
//! use haul::downloader::DownloaderBuilder;
//! use haul::transfer::TransferSpec;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = DownloaderBuilder::new().build();
//! let token = downloader.cancellation_token();
//! tokio::spawn(async move {
//!     tokio::signal::ctrl_c().await.ok();
//!     token.cancel();
//! });
//! let specs = vec![TransferSpec::try_from("https://example.com/big.iso")?];
//! let result = downloader.download(&specs).await;
//! # Ok(())
//! # }
//! ```

use super::config::DownloaderConfig;
use crate::gate::ConcurrencyGate;
use crate::http::{create_http_client, HttpClientConfig, ReqwestTransport, Transport};
use crate::progress::ProgressEvents;
use crate::transfer::{BatchResult, Summary, TransferMachine, TransferSpec};

use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::fmt;
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Represents the download controller.
///
/// A downloader can be created via its builder:
///
/// ```rust
/// # fn main()  {
/// use haul::downloader::DownloaderBuilder;
///
/// let d = DownloaderBuilder::new().build();
/// # }
/// ```
///
/// Clones share the concurrency gate and the cancellation token.
#[derive(Clone)]
pub struct Downloader {
    config: DownloaderConfig,
    gate: ConcurrencyGate,
    cancel: CancellationToken,
}

impl Debug for Downloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Downloader")
            .field("config", &self.config)
            .field("gate", &self.gate)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl Downloader {
    /// Creates a new Downloader with the given configuration.
    pub(crate) fn new(config: DownloaderConfig, cancel: CancellationToken) -> Self {
        let gate = ConcurrencyGate::new(config.concurrent_downloads.max(1));
        Self {
            config,
            gate,
            cancel,
        }
    }

    /// Gets the directory relative destinations are resolved against.
    pub fn directory(&self) -> &PathBuf {
        &self.config.directory
    }

    /// Gets the number of attempts per transfer.
    pub fn retries(&self) -> u32 {
        self.config.retries
    }

    /// Gets the number of concurrent transfers.
    pub fn concurrent_downloads(&self) -> usize {
        self.config.concurrent_downloads
    }

    /// Gets the backoff unit.
    pub fn backoff_unit(&self) -> Duration {
        self.config.backoff_unit
    }

    /// Gets the I/O chunk size.
    pub fn chunk_size(&self) -> usize {
        self.config.chunk_size
    }

    /// Gets the HTTP client settings.
    pub fn http_config(&self) -> &HttpClientConfig {
        &self.config.http
    }

    /// Gets the whole configuration.
    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    /// Replace the HTTP settings used by the next batch.
    pub fn set_network_config(&mut self, http: HttpClientConfig) {
        debug!("Network configuration updated: {:?}", http);
        self.config.http = http;
    }

    /// Update the retry policy and chunk size used by the next batch.
    ///
    /// `None` keeps the current value.
    pub fn set_runtime_config(
        &mut self,
        retries: Option<u32>,
        backoff_unit: Option<Duration>,
        chunk_size: Option<usize>,
    ) {
        if let Some(retries) = retries {
            self.config.retries = retries;
        }
        if let Some(unit) = backoff_unit {
            self.config.backoff_unit = unit;
        }
        if let Some(size) = chunk_size {
            self.config.chunk_size = size;
        }
    }

    /// Change the concurrency cap, including for a batch in flight.
    ///
    /// Shrinking never interrupts running transfers; the extra slots are
    /// retired as they are released. The cap never drops below 1.
    pub fn set_max_concurrency(&mut self, concurrent_downloads: usize) {
        let concurrent_downloads = concurrent_downloads.max(1);
        info!(
            "Concurrency changed from {} to {}",
            self.config.concurrent_downloads, concurrent_downloads
        );
        self.config.concurrent_downloads = concurrent_downloads;
        self.gate.set_capacity(concurrent_downloads);
    }

    /// Cancel every transfer, running or waiting.
    ///
    /// The downloader stays cancelled until [`Downloader::reset_cancellation`].
    pub fn cancel_all(&self) {
        info!("Cancelling all transfers");
        self.cancel.cancel();
    }

    /// Whether [`Downloader::cancel_all`] was called.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Install a fresh cancellation token for subsequent batches.
    pub fn reset_cancellation(&mut self) {
        self.cancel = CancellationToken::new();
    }

    /// The token observed by every transfer of this downloader.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs a batch of transfers.
    ///
    /// Every spec yields exactly one [`Summary`]; errors never escape.
    pub async fn download(&self, specs: &[TransferSpec]) -> BatchResult {
        let total = specs.len();
        info!(
            "Starting batch of {} transfer(s), concurrency {}",
            total,
            self.gate.capacity()
        );
        let specs: Vec<TransferSpec> = specs
            .iter()
            .map(|spec| spec.resolved(&self.config.directory))
            .collect();

        let transport = match self.transport() {
            Ok(transport) => transport,
            Err(e) => {
                error!("Unable to create the HTTP client: {}", e);
                let summaries = specs
                    .into_iter()
                    .map(|spec| {
                        let summary = Summary::new(spec, 0, 0).fail(&e);
                        self.notify(&summary);
                        summary
                    })
                    .collect();
                return BatchResult::from_summaries(summaries);
            }
        };

        let (events, forwarder) = ProgressEvents::forward_to(self.config.progress.clone());
        events.batch(0, total);

        // Transfers sharing a destination run one after another.
        let mut locks: HashMap<PathBuf, Arc<Mutex<()>>> = HashMap::new();
        for spec in &specs {
            locks
                .entry(spec.destination().to_path_buf())
                .or_default();
        }

        let options = self.config.machine_options();
        let summaries = {
            let transport = transport.as_ref();
            let gate = &self.gate;
            let cancel = &self.cancel;
            let events = &events;
            let options = &options;
            let locks = &locks;

            let mut running = stream::iter(specs.iter())
                .map(move |spec| async move {
                    let lock = locks.get(spec.destination()).cloned().unwrap_or_default();
                    let _guard = lock.lock().await;
                    TransferMachine::new(spec, transport, gate, cancel, events, options)
                        .run()
                        .await
                })
                .buffer_unordered(total.max(1));

            let mut summaries = Vec::with_capacity(total);
            while let Some(summary) = running.next().await {
                self.notify(&summary);
                summaries.push(summary);
                events.batch(summaries.len(), total);
            }
            summaries
        };

        drop(events);
        if let Some(forwarder) = forwarder {
            if let Err(e) = forwarder.await {
                error!("Progress forwarder panicked: {}", e);
            }
        }

        let result = BatchResult::from_summaries(summaries);
        info!(
            "Batch completed. Succeeded: {}, Failed: {}",
            result.succeeded(),
            result.failed()
        );
        result
    }

    fn transport(&self) -> crate::Result<Arc<dyn Transport>> {
        if let Some(ref transport) = self.config.transport {
            return Ok(transport.clone());
        }
        let client = create_http_client(&self.config.http_client_config())?;
        Ok(Arc::new(ReqwestTransport::new(client)))
    }

    fn notify(&self, summary: &Summary) {
        if let Some(ref callback) = self.config.on_complete {
            callback(summary);
        }
    }
}
