//! Logging decorator for [`BatchFetcher`].

use async_trait::async_trait;
use std::time::Instant;

use crate::fanout::{BatchError, FetchedUrl, RequestScope};
use crate::service::BatchFetcher;

/// Logs every batch: `debug` on success, `warn` for caller mistakes,
/// `error` for everything else.
pub struct LoggingMiddleware<S> {
    inner: S,
}

impl<S> LoggingMiddleware<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: BatchFetcher> BatchFetcher for LoggingMiddleware<S> {
    async fn handle_urls(
        &self,
        urls: Vec<String>,
        scope: &RequestScope,
    ) -> Result<Vec<FetchedUrl>, BatchError> {
        let begin = Instant::now();
        let url_count = urls.len();

        let result = self.inner.handle_urls(urls, scope).await;
        let elapsed_ms = begin.elapsed().as_millis() as u64;

        match &result {
            Ok(data) => {
                let bytes: usize = data.iter().map(|d| d.body.len()).sum();
                tracing::debug!(
                    method = "handle_urls",
                    urls = url_count,
                    bytes,
                    elapsed_ms,
                    "Batch fetched"
                );
            }
            Err(e) if e.is_client_error() => {
                tracing::warn!(
                    method = "handle_urls",
                    urls = url_count,
                    kind = e.kind(),
                    error = %e,
                    elapsed_ms,
                    "Batch rejected"
                );
            }
            Err(e) => {
                tracing::error!(
                    method = "handle_urls",
                    urls = url_count,
                    kind = e.kind(),
                    error = %e,
                    elapsed_ms,
                    "Batch failed"
                );
            }
        }

        result
    }
}
