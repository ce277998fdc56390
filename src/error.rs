//! Error handling for the haul library.
//!
//! This module provides the error type shared by every component of the
//! engine, together with the classification used by the transfer state
//! machine to decide between retrying, giving up and stopping.

use reqwest::StatusCode;
use std::io;
use thiserror::Error;

/// Errors that can happen when using haul.
#[derive(Error, Debug)]
pub enum Error {
    /// Error from an underlying system.
    ///
    /// This variant captures internal errors that don't fit into other categories,
    /// typically representing unexpected system-level failures.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Error from the underlying URL parser or the expected URL format.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// I/O Error.
    ///
    /// Raised while reading or writing the working file, creating the
    /// destination directory or hashing a file.
    #[error("I/O error: {source}")]
    IOError {
        #[from]
        source: io::Error,
    },

    /// Error from the Reqwest library.
    #[error("Reqwest error: {source}")]
    Reqwest {
        #[from]
        source: reqwest::Error,
    },

    /// Error from the middleware stack wrapping the Reqwest client.
    #[error("HTTP client error: {source}")]
    Middleware {
        #[from]
        source: reqwest_middleware::Error,
    },

    /// Network-level failure reported by a custom [`Transport`](crate::http::Transport).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered with a status other than 200 or 206.
    #[error("Unexpected HTTP status {0}")]
    HttpStatus(StatusCode),

    /// The downloaded content does not hash to the expected digest.
    #[error("Digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    /// Publishing the working file onto its final destination failed.
    #[error("Failed to finalize download: {source}")]
    Finalize { source: io::Error },

    /// The operation observed the cancellation signal.
    #[error("Cancelled")]
    Cancelled,
}

/// How the transfer state machine reacts to an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Consumes one attempt, backs off, then retries.
    Retryable,
    /// Retrying is futile, remaining attempts are skipped.
    Fatal,
    /// Cooperative abort, never retried.
    Cancelled,
}

/// Statuses meaning the resource will never become available.
///
/// Every other unexpected status is retried.
pub const FATAL_STATUSES: [StatusCode; 2] = [StatusCode::FORBIDDEN, StatusCode::NOT_FOUND];

impl Error {
    /// Classify the error for the retry loop.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Cancelled => ErrorClass::Cancelled,
            Error::HttpStatus(status) if FATAL_STATUSES.contains(status) => ErrorClass::Fatal,
            Error::Reqwest { source } => match source.status() {
                Some(status) if FATAL_STATUSES.contains(&status) => ErrorClass::Fatal,
                _ => ErrorClass::Retryable,
            },
            Error::Finalize { .. } | Error::InvalidUrl(_) | Error::Internal(_) => ErrorClass::Fatal,
            Error::IOError { .. }
            | Error::Middleware { .. }
            | Error::Transport(_)
            | Error::HttpStatus(_)
            | Error::DigestMismatch { .. } => ErrorClass::Retryable,
        }
    }
}

/// Result type alias for operations that can fail with a haul error.
pub type Result<T> = std::result::Result<T, Error>;
