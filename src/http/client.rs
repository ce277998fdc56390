//! HTTP client setup and middleware configuration.
//!
//! This module builds the reqwest client shared by every transfer of a
//! batch: timeouts, proxy, TLS verification, user agent, redirect following
//! and keep-alive pool limits all come from [`HttpClientConfig`]. Requests
//! are traced through [`TracingMiddleware`].
//!
//! No retry middleware is installed: the transfer state machine owns
//! retries, including failures after the response head arrived.
//!
//! # Examples
//!
//! ```rust
//! use haul::http::{create_http_client, HttpClientConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HttpClientConfig {
//!     user_agent: "MyDownloader/1.0".into(),
//!     proxy: Some("http://proxy.example.com:8080".into()),
//!     ..HttpClientConfig::default()
//! };
//! let client = create_http_client(&config)?;
//! # Ok(())
//! # }
//! ```

use crate::error::Result;

use reqwest::{redirect, Proxy};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;
use std::time::Duration;

/// Default user agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("haul/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects followed per request.
const MAX_REDIRECTS: usize = 10;

/// Configuration for HTTP client setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpClientConfig {
    /// Read timeout applied to every request.
    pub timeout: Duration,
    /// Timeout for establishing a connection.
    pub connect_timeout: Duration,
    /// Optional proxy URL used for all schemes.
    pub proxy: Option<String>,
    /// User agent header value.
    pub user_agent: String,
    /// Verify TLS certificates.
    pub verify_tls: bool,
    /// Idle connections kept alive per host.
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            proxy: None,
            user_agent: DEFAULT_USER_AGENT.into(),
            verify_tls: true,
            pool_max_idle_per_host: 16,
        }
    }
}

/// Creates an HTTP client with middleware configuration.
///
/// Fails when the proxy URL cannot be parsed or the TLS backend cannot be
/// initialized.
pub fn create_http_client(config: &HttpClientConfig) -> Result<ClientWithMiddleware> {
    let mut inner_client_builder = reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .read_timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .redirect(redirect::Policy::limited(MAX_REDIRECTS))
        .danger_accept_invalid_certs(!config.verify_tls);

    if let Some(ref proxy) = config.proxy {
        inner_client_builder = inner_client_builder.proxy(Proxy::all(proxy.as_str())?);
    }

    let inner_client = inner_client_builder.build()?;

    let client = ClientBuilder::new(inner_client)
        // Trace HTTP requests. See the tracing crate to make use of these traces.
        .with(TracingMiddleware::default())
        .build();

    Ok(client)
}
