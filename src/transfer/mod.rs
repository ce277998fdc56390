//! Transfer module containing everything about a single transfer.
//!
//! # Overview
//!
//! - [`spec`] - [`TransferSpec`] and destination path sanitation
//! - [`digest`] - digest algorithms and file verification
//! - [`machine`] - the per-transfer state machine
//! - [`summary`] - per-transfer outcomes and batch aggregation
//!
//! # Examples
//!
//! ```rust
//! use haul::transfer::{DigestAlgorithm, TransferSpec};
//! use reqwest::Url;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let url = Url::parse("https://example.com/file.iso")?;
//! let spec = TransferSpec::new(&url, "downloads/file.iso")
//!     .with_digest("d41d8cd98f00b204e9800998ecf8427e", DigestAlgorithm::Md5);
//! assert_eq!(spec.working_path().to_str(), Some("downloads/file.iso.part"));
//! # Ok(())
//! # }
//! ```

pub mod digest;
pub mod machine;
pub mod spec;
pub mod summary;

pub use digest::{digest_file, verify_file, DigestAlgorithm};
pub use machine::{MachineOptions, TransferAttempt, TransferMachine, TransferState};
pub use spec::{sanitize_path, working_path, TransferSpec, WORKING_SUFFIX};
pub use summary::{BatchResult, Status, Summary};
