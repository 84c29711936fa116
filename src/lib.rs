// Library module for dirsize
// Re-exports modules for use in integration tests and the CLI

pub mod config;
pub mod context;
pub mod fs;
pub mod sizer;

pub use config::SizerConfig;
pub use context::{CancelReason, Context};
pub use fs::{Dir, File, Listing, SizeResult};
pub use sizer::{DirSizer, SizeError, SizeReport};
