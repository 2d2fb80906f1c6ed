//! Concurrency gate for answer requests
//!
//! Caps in-flight asks with a semaphore. Requests beyond the cap either
//! fail fast or wait in a bounded queue, depending on the overflow policy.
//! Dropping a waiting or running request releases its slot.

use axiotome_common::config::{AskConfig, OverflowPolicy};
use axiotome_common::errors::{AppError, Result};
use axiotome_common::metrics;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tracing::debug;

/// Admission control for `ask_ai`
pub struct AskGate {
    permits: Arc<Semaphore>,
    max_concurrent: usize,
    policy: OverflowPolicy,
    queue_capacity: usize,
    waiting: Arc<AtomicUsize>,
}

/// Slot held for the lifetime of one answer request
pub struct AskPermit {
    _permit: OwnedSemaphorePermit,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
}

impl Drop for AskPermit {
    fn drop(&mut self) {
        // `_permit` is released after this body runs
        let in_flight = self.max_concurrent - self.permits.available_permits();
        metrics::record_ask_in_flight(in_flight.saturating_sub(1));
    }
}

/// Queue slot; releasing it on drop covers cancelled waiters
struct QueueSlot(Arc<AtomicUsize>);

impl Drop for QueueSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AskGate {
    pub fn new(max_concurrent: usize, policy: OverflowPolicy, queue_capacity: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            policy,
            queue_capacity,
            waiting: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn from_config(config: &AskConfig) -> Self {
        Self::new(config.max_concurrent, config.overflow, config.queue_capacity)
    }

    /// Wait for (or, under `Reject`, try for) an execution slot
    pub async fn acquire(&self) -> Result<AskPermit> {
        match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => return Ok(self.admit(permit)),
            Err(TryAcquireError::Closed) => return Err(self.closed()),
            Err(TryAcquireError::NoPermits) => {}
        }

        if self.policy == OverflowPolicy::Reject {
            debug!(in_flight = self.in_flight(), "Ask rejected at concurrency ceiling");
            return Err(AppError::Busy {
                in_flight: self.in_flight(),
            });
        }

        let queued = self.waiting.fetch_add(1, Ordering::SeqCst);
        let slot = QueueSlot(Arc::clone(&self.waiting));
        if queued >= self.queue_capacity {
            debug!(waiting = queued, "Ask queue full");
            return Err(AppError::Busy {
                in_flight: self.in_flight(),
            });
        }

        debug!(position = queued + 1, "Ask queued");
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| self.closed())?;
        drop(slot);

        Ok(self.admit(permit))
    }

    /// Requests currently holding a slot
    pub fn in_flight(&self) -> usize {
        self.max_concurrent - self.permits.available_permits()
    }

    /// Requests waiting for a slot
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    fn admit(&self, permit: OwnedSemaphorePermit) -> AskPermit {
        metrics::record_ask_in_flight(self.in_flight());
        AskPermit {
            _permit: permit,
            permits: Arc::clone(&self.permits),
            max_concurrent: self.max_concurrent,
        }
    }

    fn closed(&self) -> AppError {
        AppError::Internal {
            message: "Ask gate closed".to_string(),
        }
    }
}
