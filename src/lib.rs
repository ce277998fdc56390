//! Haul is a crate transferring batches of files over HTTP(S), concurrently,
//! with resume support and optional digest verification.
//!
//! # Quick Start
//!
//! ```rust
//! use std::path::PathBuf;
//! use haul::{downloader::DownloaderBuilder, transfer::TransferSpec, Error};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Error> {
//! let reqwest_rs = "https://github.com/seanmonstar/reqwest/archive/refs/tags/v0.11.9.zip";
//! let specs = vec![TransferSpec::try_from(reqwest_rs)?];
//! let downloader = DownloaderBuilder::new()
//!     .directory(PathBuf::from("output"))
//!     .build();
//! downloader.download(&specs).await;
//! # Ok(())
//! # }
//! ```
//!
//! # How a transfer runs
//!
//! Bytes are written to `<destination>.part` and only renamed onto the
//! destination once they are complete and, when a digest was given,
//! verified. An interrupted transfer leaves its working file behind only
//! while it is still running; the next attempt asks the server for the
//! remaining range. At most `concurrent_downloads` transfers hold a slot of
//! the [`ConcurrencyGate`] at any time.
//!
//! # Module Organization
//!
//! - [`transfer`] - transfer specs, the per-transfer state machine, digests and summaries
//! - [`downloader`] - the `Downloader` and `DownloaderBuilder` running batches
//! - [`gate`] - the resizable FIFO concurrency gate
//! - [`error`] - centralized error handling with the `Error` enum
//! - [`http`] - HTTP client construction and the transport seam
//! - [`progress`] - progress sinks and console progress bars

pub mod downloader;
pub mod error;
pub mod gate;
pub mod http;
pub mod progress;
pub mod transfer;

pub use downloader::{Downloader, DownloaderBuilder};
pub use error::{Error, ErrorClass, Result};
pub use gate::{ConcurrencyGate, GatePermit};
pub use http::{create_http_client, HttpClientConfig, ReqwestTransport, Transport};
pub use progress::{ConsoleProgress, ProgressSink, StyleOptions};
pub use transfer::{
    BatchResult, DigestAlgorithm, Status, Summary, TransferSpec, TransferState,
};
