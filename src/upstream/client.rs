//! HTTP client for origin fetches.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::time::Duration;
use url::Url;

use crate::config::UpstreamConfig;
use crate::fanout::error::FetchError;
use crate::fanout::scope::{RequestScope, ScopeEnd};
use crate::upstream::Fetcher;

/// reqwest-backed [`Fetcher`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl HttpFetcher {
    /// Build a client with the configured per-fetch and connect timeouts.
    pub fn new(
        config: &UpstreamConfig,
        fetch_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .connect_timeout(connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// Wrap an existing client.
    pub fn from_client(client: reqwest::Client, max_body_bytes: usize) -> Self {
        Self {
            client,
            max_body_bytes,
        }
    }

    async fn get(&self, url: &Url, remaining: Duration) -> Result<Bytes, FetchError> {
        let mut response = self
            .client
            .get(url.clone())
            .timeout(remaining)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url = %url, status = %status, "Origin returned non-success status");
            return Err(FetchError::status(status.as_u16()));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_body_bytes as u64 {
                return Err(self.too_large(status.as_u16()));
            }
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(classify)? {
            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(self.too_large(status.as_u16()));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body.freeze())
    }

    fn too_large(&self, status: u16) -> FetchError {
        FetchError::Upstream {
            status: Some(status),
            cause: format!("response body exceeds {} bytes", self.max_body_bytes),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, scope: &RequestScope) -> Result<Bytes, FetchError> {
        tokio::select! {
            biased;
            end = scope.done() => Err(match end {
                ScopeEnd::Cancelled => FetchError::Cancelled,
                ScopeEnd::DeadlineExceeded => FetchError::Timeout,
            }),
            result = self.get(url, scope.remaining()) => result,
        }
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Upstream {
            status: err.status().map(|s| s.as_u16()),
            cause: err.without_url().to_string(),
        }
    }
}
