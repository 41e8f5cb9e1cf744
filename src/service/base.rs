//! Validation followed by fan-out.

use async_trait::async_trait;

use crate::fanout::{validate, BatchError, FanOut, FetchedUrl, RequestScope};
use crate::service::BatchFetcher;

/// The undecorated batch fetcher.
#[derive(Clone)]
pub struct FanOutService {
    fan_out: FanOut,
    max_urls: usize,
}

impl FanOutService {
    pub fn new(fan_out: FanOut, max_urls: usize) -> Self {
        Self { fan_out, max_urls }
    }

    pub fn max_urls(&self) -> usize {
        self.max_urls
    }
}

#[async_trait]
impl BatchFetcher for FanOutService {
    async fn handle_urls(
        &self,
        urls: Vec<String>,
        scope: &RequestScope,
    ) -> Result<Vec<FetchedUrl>, BatchError> {
        let batch = validate(urls, self.max_urls)?;
        self.fan_out.fetch(batch, scope).await
    }
}
