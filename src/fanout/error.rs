//! Error taxonomy for batch fetching.
//!
//! `FetchError` describes how a single unit of work ended. `BatchError` is the
//! one terminal failure a caller ever sees for a whole batch; per-unit errors
//! are folded into it by the orchestrator.

use std::time::Duration;
use thiserror::Error;

/// Outcome of a single failed fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The unit's own deadline elapsed before the origin answered.
    #[error("fetch timed out")]
    Timeout,

    /// The unit's scope was cancelled (sibling failure, request timeout, shutdown).
    #[error("fetch cancelled")]
    Cancelled,

    /// The origin answered with a non-success status, or the transport failed.
    #[error("upstream failure: {cause}")]
    Upstream {
        /// HTTP status when the origin answered at all.
        status: Option<u16>,
        cause: String,
    },
}

impl FetchError {
    /// Build an upstream failure for a non-success status.
    pub fn status(status: u16) -> Self {
        FetchError::Upstream {
            status: Some(status),
            cause: format!("origin returned status {}", status),
        }
    }

    /// Build an upstream failure for a transport-level problem.
    pub fn transport(cause: impl Into<String>) -> Self {
        FetchError::Upstream {
            status: None,
            cause: cause.into(),
        }
    }
}

/// Terminal failure for a whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("number of urls is zero")]
    EmptyBatch,

    #[error("number of urls {len} exceeds the limit of {max}")]
    BatchTooLarge { len: usize, max: usize },

    #[error("malformed url at position {index} ({url}): {reason}")]
    MalformedUrl {
        index: usize,
        url: String,
        reason: String,
    },

    /// First fetch failure observed, by completion order.
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },

    /// The request deadline elapsed with fetches still outstanding.
    #[error("request deadline of {}ms exceeded", .budget.as_millis())]
    Timeout { budget: Duration },

    /// No processing capacity freed up before the request deadline.
    #[error("no processing capacity available before the request deadline")]
    AdmissionTimeout,

    /// Admission is closed because the process is draining.
    #[error("service is shutting down")]
    ShuttingDown,

    /// The request scope was cancelled from outside the batch.
    #[error("request cancelled")]
    Cancelled,

    /// A fetch unit ended abnormally (panicked or was aborted).
    #[error("internal error: {0}")]
    Internal(String),
}

impl BatchError {
    /// True for failures caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            BatchError::EmptyBatch | BatchError::BatchTooLarge { .. } | BatchError::MalformedUrl { .. }
        )
    }

    /// Short, stable label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            BatchError::EmptyBatch => "empty_batch",
            BatchError::BatchTooLarge { .. } => "batch_too_large",
            BatchError::MalformedUrl { .. } => "malformed_url",
            BatchError::Fetch { .. } => "upstream",
            BatchError::Timeout { .. } => "timeout",
            BatchError::AdmissionTimeout => "admission_timeout",
            BatchError::ShuttingDown => "shutting_down",
            BatchError::Cancelled => "cancelled",
            BatchError::Internal(_) => "internal",
        }
    }
}
