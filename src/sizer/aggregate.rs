//! Shared running total and first-error latch for one invocation.

use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use crate::context::Context;
use crate::fs::types::SizeResult;
use crate::sizer::error::SizeError;

#[derive(Debug, Default)]
struct State {
    running: SizeResult,
    merges: u64,
    error: Option<SizeError>,
}

/// Merges partial results from concurrent expansions and keeps the first
/// reported error. Reporting any error cancels `scope`.
#[derive(Debug)]
pub struct Aggregation {
    scope: Context,
    state: Mutex<State>,
}

impl Aggregation {
    pub fn new(scope: Context) -> Self {
        Self {
            scope,
            state: Mutex::new(State::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fold one directory's partial result into the running total.
    pub fn merge(&self, partial: SizeResult) {
        let mut state = self.lock();
        // Totals stop mattering once the invocation has failed.
        if state.error.is_none() {
            state.running += partial;
            state.merges += 1;
        }
    }

    /// Record `err` unless an earlier error is already latched.
    pub fn report(&self, err: SizeError) {
        {
            let mut state = self.lock();
            if state.error.is_none() {
                warn!(error = %err, "size aggregation failed");
                state.error = Some(err);
            } else {
                debug!(error = %err, "discarding later error");
            }
        }
        self.scope.cancel();
    }

    /// Directories merged so far.
    pub fn merges(&self) -> u64 {
        self.lock().merges
    }

    /// Final outcome. Call once, after every expansion has finished.
    ///
    /// On failure the running total is dropped and only the latched error
    /// is returned.
    pub fn finish(&self) -> Result<SizeResult, SizeError> {
        let mut state = self.lock();
        match state.error.take() {
            Some(err) => {
                state.running = SizeResult::default();
                Err(err)
            }
            None => Ok(state.running),
        }
    }
}
