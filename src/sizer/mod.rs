//! Concurrent directory-tree size aggregation.
//!
//! [`DirSizer`] walks a [`Dir`](crate::fs::Dir) tree with bounded
//! concurrency, merges per-directory totals through an [`Aggregation`], and
//! stops all outstanding work on the first error or on cancellation.

pub mod aggregate;
pub mod error;
pub mod limiter;
pub mod traversal;

pub use aggregate::Aggregation;
pub use error::SizeError;
pub use limiter::{WorkerLimiter, WorkerSlot};
pub use traversal::{DirSizer, SizeReport};
