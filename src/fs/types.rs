use serde::Serialize;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::sync::Arc;

use crate::fs::backend::{Dir, File};

/// Aggregate byte size and file count over a subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct SizeResult {
    /// Total bytes of all files.
    pub size: u64,
    /// Number of files.
    pub count: u64,
}

impl SizeResult {
    pub fn new(size: u64, count: u64) -> Self {
        Self { size, count }
    }

    /// Result for a single file of `size` bytes.
    pub fn file(size: u64) -> Self {
        Self { size, count: 1 }
    }
}

impl Add for SizeResult {
    type Output = SizeResult;

    fn add(self, rhs: SizeResult) -> SizeResult {
        SizeResult {
            size: self.size + rhs.size,
            count: self.count + rhs.count,
        }
    }
}

impl AddAssign for SizeResult {
    fn add_assign(&mut self, rhs: SizeResult) {
        self.size += rhs.size;
        self.count += rhs.count;
    }
}

impl Sum for SizeResult {
    fn sum<I: Iterator<Item = SizeResult>>(iter: I) -> SizeResult {
        iter.fold(SizeResult::default(), Add::add)
    }
}

/// Immediate contents of a directory.
#[derive(Default)]
pub struct Listing {
    pub dirs: Vec<Arc<dyn Dir>>,
    pub files: Vec<Arc<dyn File>>,
}

impl Listing {
    pub fn new(dirs: Vec<Arc<dyn Dir>>, files: Vec<Arc<dyn File>>) -> Self {
        Self { dirs, files }
    }
}

impl std::fmt::Debug for Listing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listing")
            .field("dirs", &self.dirs.iter().map(|d| d.path()).collect::<Vec<_>>())
            .field("files", &self.files.iter().map(|file| file.path()).collect::<Vec<_>>())
            .finish()
    }
}
