//! Metrics decorator for [`BatchFetcher`].

use async_trait::async_trait;
use std::time::Instant;

use crate::fanout::{BatchError, FetchedUrl, RequestScope};
use crate::observability::metrics;
use crate::service::BatchFetcher;

pub struct InstrumentingMiddleware<S> {
    inner: S,
}

impl<S> InstrumentingMiddleware<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: BatchFetcher> BatchFetcher for InstrumentingMiddleware<S> {
    async fn handle_urls(
        &self,
        urls: Vec<String>,
        scope: &RequestScope,
    ) -> Result<Vec<FetchedUrl>, BatchError> {
        let start_time = Instant::now();
        let result = self.inner.handle_urls(urls, scope).await;

        match &result {
            Ok(_) => metrics::record_batch(false, "ok", start_time),
            Err(e) => metrics::record_batch(true, e.kind(), start_time),
        }

        result
    }
}
