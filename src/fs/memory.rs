//! In-memory tree backend.
//!
//! Built with a small builder API. Any directory listing or file stat can be
//! made to fail or to take a fixed amount of time, and every handle handed
//! out by a root shares one `MemProbe` that counts calls.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::context::Context;
use crate::fs::backend::{Dir, File};
use crate::fs::types::Listing;

/// Call counters shared by every handle of one in-memory tree.
#[derive(Debug, Default)]
pub struct MemProbe {
    listings: AtomicU64,
    stats: AtomicU64,
    listing_now: AtomicUsize,
    listing_peak: AtomicUsize,
}

impl MemProbe {
    /// Listing calls started.
    pub fn listings(&self) -> u64 {
        self.listings.load(Ordering::SeqCst)
    }

    /// Stat calls started.
    pub fn stats(&self) -> u64 {
        self.stats.load(Ordering::SeqCst)
    }

    /// Highest number of listing calls that were in progress at once.
    pub fn peak_listings(&self) -> usize {
        self.listing_peak.load(Ordering::SeqCst)
    }

    fn enter_listing(&self) -> ListingGuard<'_> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        let now = self.listing_now.fetch_add(1, Ordering::SeqCst) + 1;
        self.listing_peak.fetch_max(now, Ordering::SeqCst);
        ListingGuard { probe: self }
    }
}

struct ListingGuard<'a> {
    probe: &'a MemProbe,
}

impl Drop for ListingGuard<'_> {
    fn drop(&mut self) {
        self.probe.listing_now.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Directory node of an in-memory tree.
#[derive(Debug, Clone, Default)]
pub struct MemDir {
    name: String,
    dirs: Vec<Arc<MemDir>>,
    files: Vec<Arc<MemFile>>,
    failure: Option<String>,
    latency: Option<Duration>,
}

impl MemDir {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a subdirectory.
    pub fn dir(mut self, dir: MemDir) -> Self {
        self.dirs.push(Arc::new(dir));
        self
    }

    /// Add a file of `size` bytes.
    pub fn file(self, name: impl Into<String>, size: u64) -> Self {
        self.with_file(MemFile::new(name, size))
    }

    /// Add a prepared file, e.g. one set up to fail.
    pub fn with_file(mut self, file: MemFile) -> Self {
        self.files.push(Arc::new(file));
        self
    }

    /// Make listing this directory fail with `message`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Make listing this directory take `latency`.
    pub fn slow(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Seal the tree and return its root handle plus the shared probe.
    pub fn into_root(self) -> (Arc<dyn Dir>, Arc<MemProbe>) {
        let probe = Arc::new(MemProbe::default());
        let root = MemDirHandle {
            node: Arc::new(self),
            probe: Arc::clone(&probe),
        };
        (Arc::new(root), probe)
    }
}

/// File node of an in-memory tree.
#[derive(Debug, Clone, Default)]
pub struct MemFile {
    name: String,
    size: u64,
    failure: Option<String>,
    latency: Option<Duration>,
}

impl MemFile {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            ..Self::default()
        }
    }

    /// Make stat-ing this file fail with `message`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Make stat-ing this file take `latency`.
    pub fn slow(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

async fn wait(ctx: &Context, latency: Option<Duration>) -> Result<()> {
    if let Some(latency) = latency {
        ctx.run_until_cancelled(tokio::time::sleep(latency))
            .await
            .map_err(|reason| anyhow!(reason))?;
    }
    Ok(())
}

struct MemDirHandle {
    node: Arc<MemDir>,
    probe: Arc<MemProbe>,
}

#[async_trait]
impl Dir for MemDirHandle {
    async fn list(&self, ctx: &Context) -> Result<Listing> {
        let _guard = self.probe.enter_listing();
        wait(ctx, self.node.latency).await?;

        if let Some(message) = &self.node.failure {
            return Err(anyhow!("{}", message));
        }

        let dirs = self
            .node
            .dirs
            .iter()
            .map(|node| {
                Arc::new(MemDirHandle {
                    node: Arc::clone(node),
                    probe: Arc::clone(&self.probe),
                }) as Arc<dyn Dir>
            })
            .collect();
        let files = self
            .node
            .files
            .iter()
            .map(|file| {
                Arc::new(MemFileHandle {
                    file: Arc::clone(file),
                    probe: Arc::clone(&self.probe),
                }) as Arc<dyn File>
            })
            .collect();

        Ok(Listing::new(dirs, files))
    }

    fn path(&self) -> String {
        self.node.name.clone()
    }
}

struct MemFileHandle {
    file: Arc<MemFile>,
    probe: Arc<MemProbe>,
}

#[async_trait]
impl File for MemFileHandle {
    async fn size(&self, ctx: &Context) -> Result<u64> {
        self.probe.stats.fetch_add(1, Ordering::SeqCst);
        wait(ctx, self.file.latency).await?;

        match &self.file.failure {
            Some(message) => Err(anyhow!("{}", message)),
            None => Ok(self.file.size),
        }
    }

    fn path(&self) -> String {
        self.file.name.clone()
    }
}
