//! The HTTP seam used by the transfer state machine.
//!
//! A [`Transport`] issues a GET for a URL, optionally starting at a byte
//! offset, and hands back the status, the declared content length and the
//! body as a stream of byte chunks. [`ReqwestTransport`] is the production
//! implementation; tests substitute scripted transports.

use crate::error::{Error, Result};

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use reqwest::{header::RANGE, StatusCode, Url};
use reqwest_middleware::ClientWithMiddleware;
use tracing::debug;

/// Response head plus streaming body.
pub struct TransportResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Declared length of this response's body, if any.
    pub content_length: Option<u64>,
    /// Body chunks.
    pub body: BoxStream<'static, Result<Bytes>>,
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Streaming GET requests.
pub trait Transport: Send + Sync {
    /// Request `url`, asking for bytes from `offset` onward when it is not 0.
    fn get<'a>(&'a self, url: &'a Url, offset: u64) -> BoxFuture<'a, Result<TransportResponse>>;
}

/// [`Transport`] backed by a reqwest client with middleware.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: ClientWithMiddleware,
}

impl ReqwestTransport {
    /// Wrap an existing client.
    pub fn new(client: ClientWithMiddleware) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn get<'a>(&'a self, url: &'a Url, offset: u64) -> BoxFuture<'a, Result<TransportResponse>> {
        Box::pin(async move {
            debug!("Fetching {} from offset {}", url, offset);
            let mut req = self.client.get(url.as_str());
            if offset > 0 {
                req = req.header(RANGE, format!("bytes={}-", offset));
            }
            let res = req.send().await?;
            Ok(TransportResponse {
                status: res.status(),
                content_length: res.content_length(),
                body: res.bytes_stream().map_err(Error::from).boxed(),
            })
        })
    }
}
