//! Batch fetch service and its decorators.
//!
//! # Data Flow
//! ```text
//! Pipeline::run(urls)
//!     → DeadlinePropagator (root scope)
//!     → AdmissionController (ticket)
//!     → InstrumentingMiddleware → LoggingMiddleware → FanOutService
//!                                                       → validate → FanOut
//! ```
//!
//! # Design Decisions
//! - One trait, `BatchFetcher`; middleware wraps it by composition
//! - The scope is an argument on every call, never stored

pub mod base;
pub mod instrumenting;
pub mod logging;
pub mod pipeline;

use async_trait::async_trait;

use crate::fanout::{BatchError, FetchedUrl, RequestScope};

pub use base::FanOutService;
pub use instrumenting::InstrumentingMiddleware;
pub use logging::LoggingMiddleware;
pub use pipeline::Pipeline;

/// Fetches a raw batch of URLs within a request scope.
#[async_trait]
pub trait BatchFetcher: Send + Sync {
    async fn handle_urls(
        &self,
        urls: Vec<String>,
        scope: &RequestScope,
    ) -> Result<Vec<FetchedUrl>, BatchError>;
}
