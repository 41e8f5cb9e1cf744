//! Request scopes: a cancellation signal bound to a deadline.
//!
//! A scope is owned by exactly one pipeline. Children are derived
//! explicitly and never outlive their parent's cancellation: cancelling a
//! scope cancels every scope derived from it, while cancelling a child leaves
//! the parent and its siblings alone. Dropping a scope cancels it, so every
//! exit path of the owning pipeline releases the scope.

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// How a scope ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeEnd {
    Cancelled,
    DeadlineExceeded,
}

#[derive(Debug)]
pub struct RequestScope {
    token: CancellationToken,
    deadline: Instant,
}

impl RequestScope {
    /// Root scope that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline,
        }
    }

    /// Root scope that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Child scope sharing this scope's deadline.
    pub fn child(&self) -> RequestScope {
        RequestScope {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Child scope whose deadline is `min(parent deadline, deadline)`.
    pub fn child_with_deadline(&self, deadline: Instant) -> RequestScope {
        RequestScope {
            token: self.token.child_token(),
            deadline: self.deadline.min(deadline),
        }
    }

    /// Child scope whose deadline is `min(parent deadline, now + timeout)`.
    pub fn child_with_timeout(&self, timeout: Duration) -> RequestScope {
        self.child_with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left until the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Cancel this scope and all of its children. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once this scope (or an ancestor) is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Resolves on cancellation or deadline, whichever comes first.
    pub async fn done(&self) -> ScopeEnd {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => ScopeEnd::Cancelled,
            _ = tokio::time::sleep_until(self.deadline) => ScopeEnd::DeadlineExceeded,
        }
    }

    /// Release the scope, cancelling anything still derived from it.
    pub fn release(self) {
        // Drop does the work.
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn child_deadline_is_capped_by_parent() {
        let parent = RequestScope::with_timeout(Duration::from_millis(100));

        let short = parent.child_with_timeout(Duration::from_millis(20));
        assert_eq!(short.deadline(), Instant::now() + Duration::from_millis(20));

        let long = parent.child_with_timeout(Duration::from_secs(5));
        assert_eq!(long.deadline(), parent.deadline());

        assert_eq!(parent.child().deadline(), parent.deadline());
    }

    #[tokio::test]
    async fn cancel_cascades_to_children_only() {
        let parent = RequestScope::with_timeout(Duration::from_secs(10));
        let a = parent.child();
        let b = parent.child();
        let grandchild = a.child();

        a.cancel();
        assert!(a.is_cancelled());
        assert!(grandchild.is_cancelled());
        assert!(!b.is_cancelled());
        assert!(!parent.is_cancelled());

        parent.cancel();
        parent.cancel();
        assert!(b.is_cancelled());
    }

    #[tokio::test]
    async fn dropping_scope_cancels_children() {
        let parent = RequestScope::with_timeout(Duration::from_secs(10));
        let child = parent.child();
        parent.release();
        assert!(child.is_cancelled());
        child.cancelled().await;
    }

    #[tokio::test(start_paused = true)]
    async fn done_reports_deadline() {
        let scope = RequestScope::with_timeout(Duration::from_millis(50));
        assert!(!scope.is_expired());
        assert_eq!(scope.done().await, ScopeEnd::DeadlineExceeded);
        assert!(scope.is_expired());
        assert_eq!(scope.remaining(), Duration::ZERO);
        // Deadline expiry does not flip the cancellation flag by itself.
        assert!(!scope.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn done_reports_cancellation_first() {
        let scope = RequestScope::with_timeout(Duration::from_millis(50));
        scope.cancel();
        assert_eq!(scope.done().await, ScopeEnd::Cancelled);
    }
}
