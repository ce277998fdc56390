//! Downloader module containing batch orchestration, builder pattern, and configuration.
//!
//! This module provides the main [`Downloader`] struct and its associated builder pattern
//! for configuring and executing batches of transfers. It handles the concurrency cap,
//! progress forwarding, cancellation and completion callbacks.
//!
//! # Overview
//!
//! - `downloader` - Core Downloader struct running batches
//! - `builder` - DownloaderBuilder for flexible configuration using the builder pattern
//! - `config` - Configuration structures and callback types
//!
//! # Examples
//!
//! ```rust
//! use haul::downloader::DownloaderBuilder;
//! use haul::transfer::TransferSpec;
//! use std::convert::TryFrom;
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = DownloaderBuilder::new()
//!     .directory(PathBuf::from("./downloads"))
//!     .concurrent_downloads(5)
//!     .retries(3)
//!     .on_complete(|summary| {
//!         println!("Finished: {}", summary.spec().label());
//!     })
//!     .build();
//!
//! let specs = vec![TransferSpec::try_from("https://example.com/file1.zip")?];
//! let result = downloader.download(&specs).await;
//! println!("{}/{} succeeded", result.succeeded(), result.total());
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
#[allow(clippy::module_inception)]
pub mod downloader;

pub use builder::DownloaderBuilder;
pub use config::{CompletionCallback, DownloaderConfig};
pub use downloader::Downloader;
