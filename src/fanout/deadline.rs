//! Per-request deadline propagation.

use std::time::Duration;

use crate::fanout::scope::RequestScope;

/// Default budget for one inbound request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Hands out one [`RequestScope`] per inbound request, expiring
/// `timeout` after the request arrived.
#[derive(Debug, Clone, Copy)]
pub struct DeadlinePropagator {
    timeout: Duration,
}

impl DeadlinePropagator {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Create the root scope for a request arriving now.
    pub fn scope(&self) -> RequestScope {
        RequestScope::with_timeout(self.timeout)
    }
}

impl Default for DeadlinePropagator {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}
