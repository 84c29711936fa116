use anyhow::{Context as _, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use crate::context::Context;
use crate::fs::backend::{Dir, File};
use crate::fs::types::Listing;

/// Directory on the local filesystem.
///
/// Symlinks are never followed: a link is counted as a file with the size of
/// the link itself, so traversal cannot loop.
#[derive(Debug, Clone)]
pub struct LocalDir {
    path: PathBuf,
    include_hidden: bool,
}

impl LocalDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            include_hidden: false,
        }
    }

    /// Also descend into entries whose name starts with `.`.
    pub fn with_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }
}

#[async_trait]
impl Dir for LocalDir {
    async fn list(&self, _ctx: &Context) -> Result<Listing> {
        let mut listing = Listing::default();

        let mut read_dir = tokio::fs::read_dir(&self.path)
            .await
            .with_context(|| format!("Failed to read directory: {}", self.path.display()))?;

        while let Some(entry) = read_dir
            .next_entry()
            .await
            .with_context(|| format!("Failed to read entry in: {}", self.path.display()))?
        {
            let name = entry.file_name();

            // Skip hidden files starting with .
            if !self.include_hidden && name.to_string_lossy().starts_with('.') {
                continue;
            }

            let file_type = entry
                .file_type()
                .await
                .with_context(|| format!("Failed to read file type: {}", entry.path().display()))?;

            if file_type.is_dir() {
                listing.dirs.push(Arc::new(LocalDir {
                    path: entry.path(),
                    include_hidden: self.include_hidden,
                }));
            } else {
                listing.files.push(Arc::new(LocalFile::new(entry.path())));
            }
        }

        Ok(listing)
    }

    fn path(&self) -> String {
        self.path.to_string_lossy().to_string()
    }
}

/// File (or symlink, socket, device node) on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
}

impl LocalFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl File for LocalFile {
    async fn size(&self, _ctx: &Context) -> Result<u64> {
        let metadata = tokio::fs::symlink_metadata(&self.path)
            .await
            .with_context(|| format!("Failed to stat file: {}", self.path.display()))?;
        Ok(metadata.len())
    }

    fn path(&self) -> String {
        self.path.to_string_lossy().to_string()
    }
}
