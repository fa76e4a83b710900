//! Network transport
//!
//! The transport only moves bytes. Interpreting the body is the gateway's job.

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Result, SearchError};

/// Where a request goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    pub url: String,
    pub method: reqwest::Method,
}

impl RequestTarget {
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: reqwest::Method::POST,
        }
    }
}

/// Raw response as received from the network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Undecoded body
    pub body: Vec<u8>,
}

/// A network call that can be aborted through a cancellation token
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send `body` as JSON to `target`.
    ///
    /// Implementations should stop waiting and return
    /// [`SearchError::Cancelled`] once `cancel` fires.
    async fn send(
        &self,
        target: &RequestTarget,
        body: serde_json::Value,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        target: &RequestTarget,
        body: serde_json::Value,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse> {
        debug!("{} {}", target.method, target.url);

        let request = self
            .client
            .request(target.method.clone(), &target.url)
            .json(&body);

        let exchange = async {
            let response = request.send().await?;
            let status = response.status().as_u16();
            let body = response.bytes().await?;
            Ok::<_, SearchError>(TransportResponse {
                status,
                body: body.to_vec(),
            })
        };

        // Dropping the exchange future aborts the underlying connection.
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Request to {} aborted", target.url);
                Err(SearchError::Cancelled)
            }
            result = exchange => result,
        }
    }
}
