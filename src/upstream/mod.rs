//! Upstream fetch capability.
//!
//! # Data Flow
//! ```text
//! orchestrator unit (child scope)
//!     → Fetcher::fetch(url, scope)
//!     → client.rs (reqwest GET, status check, bounded body read)
//!     → bytes | FetchError
//! ```
//!
//! # Design Decisions
//! - One trait at the seam so the orchestrator never sees the transport
//! - Only 2xx responses count as success
//! - Cancellation and deadline of the scope are honoured inside the call

pub mod client;

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use crate::fanout::error::FetchError;
use crate::fanout::scope::RequestScope;

pub use client::HttpFetcher;

/// Performs a single GET bounded by a request scope.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url, scope: &RequestScope) -> Result<Bytes, FetchError>;
}
