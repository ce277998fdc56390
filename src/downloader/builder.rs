//! Builder pattern implementation for creating Downloader instances.
//!
//! # Examples
//!
//! ```rust
//! use haul::downloader::DownloaderBuilder;
//! use haul::progress::{ConsoleProgress, StyleOptions};
//! use haul::transfer::Status;
//! use std::path::PathBuf;
//! use std::time::Duration;
//!
//! let downloader = DownloaderBuilder::new()
//!     .directory(PathBuf::from("./downloads"))
//!     .concurrent_downloads(4)
//!     .retries(5)
//!     .timeout(Duration::from_secs(60))
//!     .user_agent("MyApp/1.0")
//!     .progress(ConsoleProgress::new(StyleOptions::default()))
//!     .on_complete(|summary| {
//!         if let Status::Failed(msg) = summary.status() {
//!             eprintln!("{}: {}", summary.spec().label(), msg);
//!         }
//!     })
//!     .build();
//! ```

use super::{config::DownloaderConfig, downloader::Downloader};
use crate::http::Transport;
use crate::progress::ProgressSink;
use crate::transfer::Summary;

use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

/// A builder used to create a [`Downloader`].
///
/// ```rust
/// # fn main()  {
/// use haul::downloader::DownloaderBuilder;
///
/// let d = DownloaderBuilder::new().retries(5).directory("downloads".into()).build();
/// # }
/// ```
#[derive(Default)]
pub struct DownloaderBuilder {
    config: DownloaderConfig,
    cancel: Option<CancellationToken>,
}

impl DownloaderBuilder {
    /// Creates a builder with the default options.
    pub fn new() -> Self {
        DownloaderBuilder::default()
    }

    /// Sets the directory relative destinations are resolved against.
    pub fn directory(mut self, directory: PathBuf) -> Self {
        self.config.directory = directory;
        self
    }

    /// Set the number of attempts per transfer.
    pub fn retries(mut self, retries: u32) -> Self {
        self.config.retries = retries;
        self
    }

    /// Set the number of concurrent transfers.
    pub fn concurrent_downloads(mut self, concurrent_downloads: usize) -> Self {
        self.config.concurrent_downloads = concurrent_downloads;
        self
    }

    /// Set the backoff unit; attempt `n` waits `n * unit` before retrying.
    pub fn backoff_unit(mut self, unit: Duration) -> Self {
        self.config.backoff_unit = unit;
        self
    }

    /// Set the maximum size of a single write or hash read.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.config.chunk_size = chunk_size;
        self
    }

    /// Set the per-request read timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.http.timeout = timeout;
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.http.connect_timeout = timeout;
        self
    }

    /// Route every request through `proxy`.
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.config.http.proxy = Some(proxy.into());
        self
    }

    /// Set the user agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.http.user_agent = user_agent.into();
        self
    }

    /// Enable or disable TLS certificate verification.
    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.config.http.verify_tls = verify;
        self
    }

    /// Report progress to `sink`.
    pub fn progress<S>(mut self, sink: S) -> Self
    where
        S: ProgressSink + 'static,
    {
        self.config.progress = Some(Arc::new(sink));
        self
    }

    /// Report progress to a shared sink.
    pub fn progress_arc(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.config.progress = Some(sink);
        self
    }

    /// Set callback for when each transfer completes.
    ///
    /// The callback will be called as soon as each transfer finishes,
    /// regardless of whether other transfers are still in progress.
    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Summary) + Send + Sync + 'static,
    {
        self.config.on_complete = Some(Arc::new(Box::new(callback)));
        self
    }

    /// Use `transport` instead of a reqwest client.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.config.transport = Some(transport);
        self
    }

    /// Observe an externally owned cancellation token.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Create the [`Downloader`] with the specified options.
    pub fn build(self) -> Downloader {
        Downloader::new(self.config, self.cancel.unwrap_or_default())
    }
}
