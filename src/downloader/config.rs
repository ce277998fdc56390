//! Configuration structures and defaults for the downloader.
//!
//! [`DownloaderConfig`] gathers everything a batch runs with: where files
//! land, how many transfers run at once, the retry policy, the I/O chunk
//! size, the HTTP client settings and the optional collaborators (progress
//! sink, completion callback, custom transport).
//!
//! # Examples
//!
//! ```rust
//! use haul::downloader::CompletionCallback;
//! use haul::transfer::{Status, Summary};
//!
//! let callback: CompletionCallback = Box::new(|summary: &Summary| {
//!     match summary.status() {
//!         Status::Done => println!("✓ {}", summary.spec().label()),
//!         Status::Failed(msg) => println!("✗ {} - {}", summary.spec().label(), msg),
//!         Status::Cancelled => println!("- {}", summary.spec().label()),
//!     }
//! });
//! ```

use crate::http::{HttpClientConfig, Transport};
use crate::progress::ProgressSink;
use crate::transfer::{MachineOptions, Summary};

use std::env::current_dir;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Callback type for transfer completion events.
pub type CompletionCallback = Box<dyn Fn(&Summary) + Send + Sync>;

/// Configuration structure for the downloader.
#[derive(Clone)]
pub struct DownloaderConfig {
    /// Directory relative destinations are resolved against.
    pub directory: PathBuf,
    /// Number of maximum concurrent transfers.
    pub concurrent_downloads: usize,
    /// Number of attempts per transfer.
    pub retries: u32,
    /// Linear backoff unit between attempts.
    pub backoff_unit: Duration,
    /// Maximum size of a single write or hash read.
    pub chunk_size: usize,
    /// HTTP client settings.
    pub http: HttpClientConfig,
    /// Progress sink, `None` for headless operation.
    pub progress: Option<Arc<dyn ProgressSink>>,
    /// Callback for when each transfer completes.
    pub on_complete: Option<Arc<CompletionCallback>>,
    /// Transport replacing the reqwest client built from `http`.
    pub transport: Option<Arc<dyn Transport>>,
}

impl DownloaderConfig {
    /// Settings handed to every transfer state machine.
    pub(crate) fn machine_options(&self) -> MachineOptions {
        MachineOptions {
            max_retries: self.retries,
            backoff_unit: self.backoff_unit,
            chunk_size: self.chunk_size,
        }
    }

    /// HTTP settings with the keep-alive pool sized to the concurrency cap.
    pub(crate) fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            pool_max_idle_per_host: self.concurrent_downloads,
            ..self.http.clone()
        }
    }
}

impl std::fmt::Debug for DownloaderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloaderConfig")
            .field("directory", &self.directory)
            .field("concurrent_downloads", &self.concurrent_downloads)
            .field("retries", &self.retries)
            .field("backoff_unit", &self.backoff_unit)
            .field("chunk_size", &self.chunk_size)
            .field("http", &self.http)
            .field("progress", &self.progress.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .field("transport", &self.transport.is_some())
            .finish()
    }
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            directory: current_dir().unwrap_or_default(),
            concurrent_downloads: 16,
            retries: 3,
            backoff_unit: Duration::from_secs(2),
            chunk_size: 64 * 1024,
            http: HttpClientConfig::default(),
            progress: None,
            on_complete: None,
            transport: None,
        }
    }
}
