//! Cancellable operation context.
//!
//! A `Context` is handed down through every listing and stat call. It can be
//! cancelled explicitly, by a deadline, or by its parent. Child contexts
//! never cancel their parent.

use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Why a context stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// `cancel()` was called on this context or an ancestor.
    Cancelled,
    /// The deadline of this context or an ancestor passed.
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CancelReason::Cancelled => write!(f, "context cancelled"),
            CancelReason::DeadlineExceeded => write!(f, "context deadline exceeded"),
        }
    }
}

struct Inner {
    cause: OnceLock<(CancelReason, Instant)>,
    notify: Notify,
    parent: Option<Context>,
    deadline: Option<Instant>,
}

/// Cheap to clone; all clones observe the same cancellation state.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl Context {
    /// Root context that is only cancelled by an explicit `cancel()`.
    pub fn background() -> Self {
        Self::build(None, None)
    }

    fn build(parent: Option<Context>, deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(Inner {
                cause: OnceLock::new(),
                notify: Notify::new(),
                parent,
                deadline,
            }),
        }
    }

    /// Derived context, cancelled together with `self` or on its own.
    pub fn child(&self) -> Self {
        Self::build(Some(self.clone()), None)
    }

    /// Derived context that expires at `deadline`.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        Self::build(Some(self.clone()), Some(deadline))
    }

    /// Derived context that expires `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Cancel this context and every context derived from it.
    /// Idempotent; the first recorded reason is kept.
    pub fn cancel(&self) {
        // A deadline that already passed, or an ancestor that already
        // stopped, takes precedence over this later cancel.
        if self.cause().is_none() {
            self.record((CancelReason::Cancelled, Instant::now()));
        }
    }

    fn record(&self, cause: (CancelReason, Instant)) {
        if self.inner.cause.set(cause).is_ok() {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.reason().is_some()
    }

    /// The reason this context stopped, if it has.
    pub fn reason(&self) -> Option<CancelReason> {
        self.cause().map(|(reason, _)| reason)
    }

    /// Reason and moment this context stopped. When both the own deadline
    /// and an ancestor apply, the earlier one wins.
    fn cause(&self) -> Option<(CancelReason, Instant)> {
        if let Some(cause) = self.inner.cause.get() {
            return Some(*cause);
        }

        let expired = self
            .inner
            .deadline
            .filter(|deadline| Instant::now() >= *deadline)
            .map(|deadline| (CancelReason::DeadlineExceeded, deadline));
        let inherited = self.inner.parent.as_ref().and_then(Context::cause);

        let first = match (expired, inherited) {
            (Some(own), Some(parent)) if parent.1 <= own.1 => parent,
            (Some(own), _) => own,
            (None, parent) => parent?,
        };
        self.record(first);
        self.inner.cause.get().copied()
    }

    pub fn deadline(&self) -> Option<Instant> {
        let parent = self.inner.parent.as_ref().and_then(Context::deadline);
        match (self.inner.deadline, parent) {
            (Some(own), Some(parent)) => Some(own.min(parent)),
            (own, parent) => own.or(parent),
        }
    }

    /// Resolves once the context is cancelled, by whatever cause.
    pub fn cancelled(&self) -> BoxFuture<'_, CancelReason> {
        async move {
            loop {
                let notified = self.inner.notify.notified();
                tokio::pin!(notified);
                // Register before checking so a concurrent cancel cannot be missed.
                notified.as_mut().enable();

                if let Some(reason) = self.reason() {
                    return reason;
                }

                let parent = async {
                    match &self.inner.parent {
                        Some(parent) => {
                            parent.cancelled().await;
                        }
                        None => std::future::pending::<()>().await,
                    }
                };
                let expiry = async {
                    match self.inner.deadline {
                        Some(deadline) => tokio::time::sleep_until(deadline).await,
                        None => std::future::pending::<()>().await,
                    }
                };

                tokio::select! {
                    _ = notified => {}
                    _ = parent => {}
                    _ = expiry => {}
                }
            }
        }
        .boxed()
    }

    /// Drive `fut` unless the context is or becomes cancelled first.
    ///
    /// Cancellation is checked before `fut` is polled, so an already
    /// cancelled context never starts the operation.
    pub async fn run_until_cancelled<F>(&self, fut: F) -> Result<F::Output, CancelReason>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            reason = self.cancelled() => Err(reason),
            output = fut => Ok(output),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("reason", &self.reason())
            .field("deadline", &self.deadline())
            .finish()
    }
}
