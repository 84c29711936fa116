pub mod backend;
pub mod local;
pub mod memory;
pub mod types;

pub use backend::{Dir, File};
pub use local::{LocalDir, LocalFile};
pub use memory::{MemDir, MemFile, MemProbe};
pub use types::*;
