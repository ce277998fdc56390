//! Integrity verification for transferred files.
//!
//! This module provides the closed set of supported digest algorithms and
//! the streaming file hasher used to verify a working file before it is
//! published.
//!
//! # Supported Algorithms
//!
//! - **MD5**: 32 hexadecimal characters
//! - **SHA-1**: 40 hexadecimal characters
//! - **SHA-256**: 64 hexadecimal characters (default)
//! - **SHA-512**: 128 hexadecimal characters
//!
//! # Examples
//!
//! ```rust
//! use haul::transfer::DigestAlgorithm;
//!
//! assert_eq!(
//!     DigestAlgorithm::detect("d41d8cd98f00b204e9800998ecf8427e"),
//!     Some(DigestAlgorithm::Md5)
//! );
//! assert_eq!("sha512".parse::<DigestAlgorithm>().ok(), Some(DigestAlgorithm::Sha512));
//! assert_eq!(DigestAlgorithm::detect("invalid"), None);
//! ```

use crate::error::{Error, Result};

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tokio::{fs::File, io::AsyncReadExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    /// MD5
    Md5,
    /// SHA-1
    Sha1,
    /// SHA-256
    #[default]
    Sha256,
    /// SHA-512
    Sha512,
}

impl DigestAlgorithm {
    /// Lower-case name of the algorithm.
    pub fn as_str(&self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "md5",
            DigestAlgorithm::Sha1 => "sha1",
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha512 => "sha512",
        }
    }

    /// Length of the digest in hexadecimal characters.
    pub fn hex_len(&self) -> usize {
        match self {
            DigestAlgorithm::Md5 => 32,
            DigestAlgorithm::Sha1 => 40,
            DigestAlgorithm::Sha256 => 64,
            DigestAlgorithm::Sha512 => 128,
        }
    }

    /// Guess the algorithm that produced a hex digest from its length.
    pub fn detect(digest: &str) -> Option<Self> {
        if !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        [
            DigestAlgorithm::Md5,
            DigestAlgorithm::Sha1,
            DigestAlgorithm::Sha256,
            DigestAlgorithm::Sha512,
        ]
        .into_iter()
        .find(|algorithm| algorithm.hex_len() == digest.len())
    }

    fn hasher(self) -> Hasher {
        match self {
            DigestAlgorithm::Md5 => Hasher::Md5(Md5::new()),
            DigestAlgorithm::Sha1 => Hasher::Sha1(Sha1::new()),
            DigestAlgorithm::Sha256 => Hasher::Sha256(Sha256::new()),
            DigestAlgorithm::Sha512 => Hasher::Sha512(Sha512::new()),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "md5" => Ok(DigestAlgorithm::Md5),
            "sha1" => Ok(DigestAlgorithm::Sha1),
            "sha256" => Ok(DigestAlgorithm::Sha256),
            "sha512" => Ok(DigestAlgorithm::Sha512),
            other => Err(Error::Internal(format!(
                "Unsupported digest algorithm: {}",
                other
            ))),
        }
    }
}

/// Incremental hasher for one of the supported algorithms.
enum Hasher {
    Md5(Md5),
    Sha1(Sha1),
    Sha256(Sha256),
    Sha512(Sha512),
}

impl Hasher {
    fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Md5(h) => h.update(data),
            Hasher::Sha1(h) => h.update(data),
            Hasher::Sha256(h) => h.update(data),
            Hasher::Sha512(h) => h.update(data),
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Hasher::Md5(h) => hex::encode(h.finalize()),
            Hasher::Sha1(h) => hex::encode(h.finalize()),
            Hasher::Sha256(h) => hex::encode(h.finalize()),
            Hasher::Sha512(h) => hex::encode(h.finalize()),
        }
    }
}

/// Compute the lower-case hex digest of the file at `path`.
///
/// The file is read `chunk_size` bytes at a time. Cancellation is checked
/// before every read; once it fires, [`Error::Cancelled`] is returned and no
/// digest is produced.
pub async fn digest_file(
    path: &Path,
    algorithm: DigestAlgorithm,
    chunk_size: usize,
    cancel: &CancellationToken,
) -> Result<String> {
    debug!("Computing {} digest of {:?}", algorithm, path);
    let mut file = File::open(path).await?;
    let mut hasher = algorithm.hasher();
    let mut buf = vec![0u8; chunk_size.max(1)];
    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize_hex())
}

/// Check the file at `path` against an expected hex digest, ignoring case.
pub async fn verify_file(
    path: &Path,
    expected: &str,
    algorithm: DigestAlgorithm,
    chunk_size: usize,
    cancel: &CancellationToken,
) -> Result<bool> {
    let actual = digest_file(path, algorithm, chunk_size, cancel).await?;
    Ok(actual.eq_ignore_ascii_case(expected.trim()))
}
