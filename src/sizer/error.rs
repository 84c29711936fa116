//! Error taxonomy for size aggregation.
//!
//! Backing stores report failures as `anyhow::Error`; the sizer wraps them
//! with the path of the entry that failed. Whatever happens first in an
//! invocation is the only error its caller ever sees.

use crate::context::CancelReason;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SizeError {
    /// A directory could not be enumerated.
    #[error("failed to list directory '{path}': {source}")]
    Listing {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// A file could not be measured.
    #[error("failed to stat file '{path}': {source}")]
    Stat {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// The operation context was cancelled or ran past its deadline.
    #[error("size aggregation stopped: {0}")]
    Cancelled(CancelReason),

    /// An expansion task panicked or was aborted.
    #[error("worker task failed: {0}")]
    Worker(String),
}

impl SizeError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, SizeError::Cancelled(_))
    }

    /// Path of the entry that failed, for listing and stat errors.
    pub fn path(&self) -> Option<&str> {
        match self {
            SizeError::Listing { path, .. } | SizeError::Stat { path, .. } => Some(path),
            SizeError::Cancelled(_) | SizeError::Worker(_) => None,
        }
    }
}

impl From<CancelReason> for SizeError {
    fn from(reason: CancelReason) -> Self {
        SizeError::Cancelled(reason)
    }
}
