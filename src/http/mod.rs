//! HTTP module containing the transport seam and client setup.
//!
//! # Overview
//!
//! - [`client`] - reqwest client creation and middleware configuration
//! - [`transport`] - the [`Transport`] trait consumed by the transfer state
//!   machine and its reqwest implementation
//!
//! # Examples
//!
//! ```rust
//! use haul::http::{create_http_client, HttpClientConfig, ReqwestTransport};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = create_http_client(&HttpClientConfig::default())?;
//! let transport = ReqwestTransport::new(client);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod transport;

pub use client::{create_http_client, HttpClientConfig, DEFAULT_USER_AGENT};
pub use transport::{ReqwestTransport, Transport, TransportResponse};
