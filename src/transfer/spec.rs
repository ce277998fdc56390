//! Transfer descriptions.
//!
//! This module contains the [`TransferSpec`] struct describing one requested
//! transfer, and the path sanitation applied to every destination.
//!
//! # Examples
//!
//! ```rust
//! use haul::transfer::{DigestAlgorithm, TransferSpec};
//! use reqwest::Url;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Destination derived from the URL
//! let spec = TransferSpec::try_from("https://example.com/file.zip")?;
//! assert_eq!(spec.label(), "file.zip");
//!
//! // Explicit destination with an expected digest
//! let url = Url::parse("https://example.com/download")?;
//! let spec = TransferSpec::new(&url, "out/archive.zip").with_digest(
//!     "E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855",
//!     DigestAlgorithm::Sha256,
//! );
//! assert_eq!(
//!     spec.expected_digest(),
//!     Some("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
//! );
//! # Ok(())
//! # }
//! ```

use super::digest::DigestAlgorithm;
use crate::error::Error;

use reqwest::Url;
use std::convert::TryFrom;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Suffix appended to a destination to name its working file.
pub const WORKING_SUFFIX: &str = ".part";

/// Characters that are not allowed in a file name on common filesystems.
const RESERVED: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replace reserved characters in the final component of `path` with `_`.
///
/// The parent directory structure is left untouched.
///
/// ```rust
/// use haul::transfer::sanitize_path;
/// use std::path::Path;
///
/// assert_eq!(
///     sanitize_path(Path::new("downloads/what?.txt")),
///     Path::new("downloads/what_.txt")
/// );
/// ```
pub fn sanitize_path(path: &Path) -> PathBuf {
    let Some(name) = path.file_name() else {
        return path.to_path_buf();
    };
    let clean: String = name
        .to_string_lossy()
        .chars()
        .map(|c| if RESERVED.contains(&c) { '_' } else { c })
        .collect();
    path.with_file_name(clean)
}

/// Represents a file to be transferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSpec {
    url: Url,
    destination: PathBuf,
    expected_digest: Option<String>,
    algorithm: DigestAlgorithm,
}

impl TransferSpec {
    /// Creates a new [`TransferSpec`] writing to `destination`.
    ///
    /// The destination is sanitized immediately.
    pub fn new(url: &Url, destination: impl AsRef<Path>) -> Self {
        Self {
            url: url.clone(),
            destination: sanitize_path(destination.as_ref()),
            expected_digest: None,
            algorithm: DigestAlgorithm::default(),
        }
    }

    /// Expect the transferred content to hash to `digest` (hex, any case).
    pub fn with_digest(self, digest: impl AsRef<str>, algorithm: DigestAlgorithm) -> Self {
        Self {
            expected_digest: Some(digest.as_ref().trim().to_lowercase()),
            algorithm,
            ..self
        }
    }

    /// URL of the file to download.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Sanitized destination path.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Expected lower-case hex digest, if any.
    pub fn expected_digest(&self) -> Option<&str> {
        self.expected_digest.as_deref()
    }

    /// Digest algorithm used for verification.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Short label used in logs.
    pub fn label(&self) -> String {
        self.destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.destination.display().to_string())
    }

    /// Path of the staging file for this transfer.
    pub fn working_path(&self) -> PathBuf {
        working_path(&self.destination)
    }

    /// Resolve a relative destination against `directory`.
    pub(crate) fn resolved(&self, directory: &Path) -> Self {
        if self.destination.is_absolute() {
            return self.clone();
        }
        Self {
            destination: directory.join(&self.destination),
            ..self.clone()
        }
    }
}

/// Path of the staging file for `destination`.
pub fn working_path(destination: &Path) -> PathBuf {
    let mut name = OsString::from(destination.as_os_str());
    name.push(WORKING_SUFFIX);
    PathBuf::from(name)
}

impl TryFrom<&Url> for TransferSpec {
    type Error = crate::error::Error;

    fn try_from(value: &Url) -> Result<Self, Self::Error> {
        value
            .path_segments()
            .ok_or_else(|| {
                Error::InvalidUrl(format!(
                    "The url \"{}\" does not contain a valid path",
                    value
                ))
            })?
            .next_back()
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                form_urlencoded::parse(segment.as_bytes())
                    .map(|(key, val)| [key, val].concat())
                    .collect::<String>()
            })
            .map(|filename| TransferSpec::new(value, filename))
            .ok_or_else(|| {
                Error::InvalidUrl(format!("The url \"{}\" does not contain a filename", value))
            })
    }
}

impl TryFrom<&str> for TransferSpec {
    type Error = crate::error::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Url::parse(value)
            .map_err(|e| {
                Error::InvalidUrl(format!("The url \"{}\" cannot be parsed: {}", value, e))
            })
            .and_then(|u| TransferSpec::try_from(&u))
    }
}
