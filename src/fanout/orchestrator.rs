//! Fan-out orchestrator.
//!
//! # Responsibilities
//! - Launch one fetch unit per URL, each under its own child scope
//! - Write every result into the slot of its input position
//! - Cancel the request scope on the first failure or on the deadline
//! - Join every unit before returning a single outcome
//!
//! # Failure Policy
//! ```text
//! unit fails      → first failure recorded → request scope cancelled
//!                 → siblings observe cancellation → report Cancelled
//! deadline passes → Timeout recorded        → request scope cancelled
//! all succeed     → slots returned in input order
//! ```
//! The batch outcome is all-or-nothing: bodies that arrived before a
//! failure are discarded.

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::fanout::error::{BatchError, FetchError};
use crate::fanout::scope::{RequestScope, ScopeEnd};
use crate::fanout::validator::{ValidatedBatch, ValidatedUrl};
use crate::upstream::Fetcher;

/// Default per-URL fetch budget.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_millis(500);

/// A successfully fetched URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedUrl {
    /// The URL exactly as submitted.
    pub url: String,
    pub body: Bytes,
}

/// Concurrent, order-preserving, all-or-nothing batch fetcher.
#[derive(Clone)]
pub struct FanOut {
    fetcher: Arc<dyn Fetcher>,
    fetch_timeout: Duration,
}

impl FanOut {
    pub fn new(fetcher: Arc<dyn Fetcher>, fetch_timeout: Duration) -> Self {
        Self {
            fetcher,
            fetch_timeout,
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    /// Fetch every URL of `batch` concurrently under `scope`.
    ///
    /// On failure the request scope is cancelled before this returns.
    pub async fn fetch(
        &self,
        batch: ValidatedBatch,
        scope: &RequestScope,
    ) -> Result<Vec<FetchedUrl>, BatchError> {
        let started = Instant::now();
        let budget = scope.deadline().saturating_duration_since(started);
        let urls = batch.into_urls();
        let mut slots: Vec<Option<Bytes>> = vec![None; urls.len()];
        let mut units = JoinSet::new();

        for (index, url) in urls.iter().enumerate() {
            let unit_scope = scope.child_with_timeout(self.fetch_timeout);
            let fetcher = Arc::clone(&self.fetcher);
            let url = url.clone();
            units.spawn(async move {
                let outcome = run_unit(fetcher.as_ref(), &url, &unit_scope).await;
                (index, outcome)
            });
        }

        let mut failure: Option<BatchError> = None;
        let deadline = tokio::time::sleep_until(scope.deadline());
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;
                joined = units.join_next() => {
                    let Some(joined) = joined else { break };
                    match joined {
                        Ok((index, Ok(body))) => slots[index] = Some(body),
                        Ok((index, Err(err))) => {
                            if failure.is_none() {
                                let terminal = terminal_failure(&urls[index], err, scope, budget);
                                tracing::debug!(
                                    url = %urls[index].as_str(),
                                    error = %terminal,
                                    "Fetch failed, cancelling remaining units"
                                );
                                failure = Some(terminal);
                                scope.cancel();
                            }
                        }
                        Err(join_err) => {
                            if failure.is_none() {
                                tracing::error!(error = %join_err, "Fetch unit ended abnormally");
                                failure = Some(BatchError::Internal(join_err.to_string()));
                                scope.cancel();
                            }
                        }
                    }
                }
                _ = &mut deadline, if failure.is_none() => {
                    tracing::debug!(
                        outstanding = units.len(),
                        "Request deadline reached, cancelling remaining units"
                    );
                    failure = Some(BatchError::Timeout { budget });
                    scope.cancel();
                }
            }
        }

        if let Some(failure) = failure {
            return Err(failure);
        }

        tracing::trace!(
            urls = urls.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Batch fetched"
        );

        urls.into_iter()
            .zip(slots)
            .map(|(url, slot)| match slot {
                Some(body) => Ok(FetchedUrl {
                    url: url.as_str().to_string(),
                    body,
                }),
                None => Err(BatchError::Internal(format!(
                    "no result recorded for {}",
                    url.as_str()
                ))),
            })
            .collect()
    }
}

/// One fetch, abandoned as soon as its scope is cancelled or expires.
async fn run_unit(
    fetcher: &dyn Fetcher,
    url: &ValidatedUrl,
    scope: &RequestScope,
) -> Result<Bytes, FetchError> {
    tokio::select! {
        biased;
        end = scope.done() => Err(match end {
            ScopeEnd::Cancelled => FetchError::Cancelled,
            ScopeEnd::DeadlineExceeded => FetchError::Timeout,
        }),
        result = fetcher.fetch(url.url(), scope) => result,
    }
}

/// Map the first unit failure to the batch's terminal failure.
fn terminal_failure(
    url: &ValidatedUrl,
    err: FetchError,
    scope: &RequestScope,
    budget: Duration,
) -> BatchError {
    match err {
        // A unit timing out at the request deadline is the request timing out.
        FetchError::Timeout if scope.is_expired() => BatchError::Timeout { budget },
        // Nothing inside the batch failed: the scope was cancelled from outside.
        FetchError::Cancelled => BatchError::Cancelled,
        err => BatchError::Fetch {
            url: url.as_str().to_string(),
            source: err,
        },
    }
}
