//! Admission gate for directory expansions.

use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Semaphore, SemaphorePermit};

use crate::context::Context;
use crate::sizer::error::SizeError;

/// Bounds how many directory expansions run at once.
///
/// A bound of 0 admits everything. Admission order is whatever the
/// underlying semaphore gives; only eventual progress is promised.
#[derive(Debug)]
pub struct WorkerLimiter {
    semaphore: Option<Semaphore>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl WorkerLimiter {
    pub fn new(max: usize) -> Self {
        let semaphore = if max == 0 {
            None
        } else {
            Some(Semaphore::new(max.min(Semaphore::MAX_PERMITS)))
        };

        Self {
            semaphore,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Slots currently held.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Most slots ever held at the same time.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Wait for a free slot, or fail once `ctx` is cancelled.
    pub async fn acquire(&self, ctx: &Context) -> Result<WorkerSlot<'_>, SizeError> {
        let permit = match &self.semaphore {
            Some(semaphore) => {
                let permit = ctx.run_until_cancelled(semaphore.acquire()).await?;
                Some(permit.map_err(|_| SizeError::Worker("worker limiter closed".to_string()))?)
            }
            None => match ctx.reason() {
                Some(reason) => return Err(SizeError::Cancelled(reason)),
                None => None,
            },
        };

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        Ok(WorkerSlot {
            _permit: permit,
            active: &self.active,
        })
    }
}

/// One admitted expansion. Dropping it frees the slot.
#[derive(Debug)]
pub struct WorkerSlot<'a> {
    _permit: Option<SemaphorePermit<'a>>,
    active: &'a AtomicUsize,
}

impl Drop for WorkerSlot<'_> {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}
