//! Process-wide admission control.
//!
//! # Responsibilities
//! - Bound the number of batches processed concurrently
//! - Queue callers (not reject them) while capacity is exhausted
//! - Give up when the caller's own deadline elapses
//! - Stop admitting once the process starts draining
//!
//! Capacity is a counting semaphore; a ticket owns one permit and returns it
//! on drop, so a pipeline that fails, times out or unwinds still releases it.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::fanout::error::BatchError;
use crate::fanout::scope::{RequestScope, ScopeEnd};
use crate::observability::metrics;

/// Default number of batches processed at once.
pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug)]
pub struct AdmissionController {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl AdmissionController {
    pub fn new(capacity: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a slot, bounded by the scope's deadline.
    ///
    /// Fails with `AdmissionTimeout` when the deadline passes first,
    /// `Cancelled` when the scope is cancelled while queued and
    /// `ShuttingDown` once [`close`](Self::close) has been called.
    pub async fn acquire(&self, scope: &RequestScope) -> Result<AdmissionTicket, BatchError> {
        let acquire = Arc::clone(&self.permits).acquire_owned();

        let permit = tokio::select! {
            biased;
            permit = acquire => permit.map_err(|_| BatchError::ShuttingDown)?,
            end = scope.done() => {
                return Err(match end {
                    ScopeEnd::Cancelled => BatchError::Cancelled,
                    ScopeEnd::DeadlineExceeded => {
                        tracing::warn!(
                            capacity = self.capacity,
                            "Admission deadline exceeded while waiting for capacity"
                        );
                        BatchError::AdmissionTimeout
                    }
                });
            }
        };

        metrics::record_admission_in_flight(self.in_flight());
        Ok(AdmissionTicket {
            permit: Some(permit),
            controller: Arc::clone(&self.permits),
            capacity: self.capacity,
        })
    }

    /// Stop admitting new work. Tickets already handed out stay valid.
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Slots currently held by tickets.
    pub fn in_flight(&self) -> usize {
        self.capacity.saturating_sub(self.available())
    }
}

impl Default for AdmissionController {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// One unit of admission capacity, released exactly once.
#[derive(Debug)]
pub struct AdmissionTicket {
    permit: Option<OwnedSemaphorePermit>,
    controller: Arc<Semaphore>,
    capacity: usize,
}

impl AdmissionTicket {
    /// Give the slot back. Equivalent to dropping the ticket.
    pub fn release(mut self) {
        self.return_permit();
    }

    fn return_permit(&mut self) {
        if let Some(permit) = self.permit.take() {
            drop(permit);
            let in_flight = self.capacity.saturating_sub(self.controller.available_permits());
            metrics::record_admission_in_flight(in_flight);
        }
    }
}

impl Drop for AdmissionTicket {
    fn drop(&mut self) {
        self.return_permit();
    }
}
