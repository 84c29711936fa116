//! Concurrent traversal that sizes a directory tree.
//!
//! Every directory is expanded by its own tokio task. An expansion holds a
//! limiter slot while it lists the directory and stats its files, then
//! gives the slot back before waiting on the expansions it spawned. A slot
//! is never held while waiting for another slot, so any bound, including 1,
//! makes progress.

use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::config::SizerConfig;
use crate::context::Context;
use crate::fs::backend::Dir;
use crate::fs::types::SizeResult;
use crate::sizer::aggregate::Aggregation;
use crate::sizer::error::SizeError;
use crate::sizer::limiter::WorkerLimiter;

/// Outcome of a successful invocation with traversal statistics.
#[derive(Debug, Clone, Serialize)]
pub struct SizeReport {
    pub result: SizeResult,
    /// Directories listed and merged.
    pub dirs_expanded: u64,
    /// Most expansions that held a worker slot at once.
    pub peak_workers: usize,
    #[serde(serialize_with = "serialize_duration")]
    pub elapsed: Duration,
}

// Helper function to serialize Duration as seconds
fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64())
}

/// State shared by all expansions of one invocation.
struct Walk {
    scope: Context,
    limiter: WorkerLimiter,
    aggregation: Aggregation,
}

/// Computes total size and file count of a directory tree.
#[derive(Debug, Clone)]
pub struct DirSizer {
    max_workers: usize,
}

impl DirSizer {
    /// `max_workers` bounds concurrent directory expansions; 0 is unbounded.
    pub fn new(max_workers: usize) -> Self {
        Self { max_workers }
    }

    pub fn unbounded() -> Self {
        Self::new(0)
    }

    pub fn from_config(config: &SizerConfig) -> Self {
        Self::new(config.max_workers)
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Total size and file count under `root`.
    ///
    /// Returns only after every expansion spawned for this call has
    /// finished. On any listing or stat failure, or if `ctx` is cancelled
    /// before the walk completes, the first error is returned and no
    /// partial total is exposed.
    pub async fn size(&self, ctx: &Context, root: Arc<dyn Dir>) -> Result<SizeResult, SizeError> {
        self.size_with_stats(ctx, root).await.map(|report| report.result)
    }

    /// Like [`DirSizer::size`], with traversal statistics.
    pub async fn size_with_stats(
        &self,
        ctx: &Context,
        root: Arc<dyn Dir>,
    ) -> Result<SizeReport, SizeError> {
        let started = Instant::now();
        let root_path = root.path();
        let scope = ctx.child();

        let walk = Arc::new(Walk {
            scope: scope.clone(),
            limiter: WorkerLimiter::new(self.max_workers),
            aggregation: Aggregation::new(scope),
        });

        debug!(root = %root_path, max_workers = self.max_workers, "Starting size walk");

        // Run the root like any other expansion so a panic in it is caught too.
        let mut tasks = JoinSet::new();
        tasks.spawn(expand(Arc::clone(&walk), root));
        drain(&walk, &mut tasks).await;

        let result = walk.aggregation.finish()?;
        let report = SizeReport {
            result,
            dirs_expanded: walk.aggregation.merges(),
            peak_workers: walk.limiter.peak(),
            elapsed: started.elapsed(),
        };

        info!(
            root = %root_path,
            size = report.result.size,
            count = report.result.count,
            dirs = report.dirs_expanded,
            peak_workers = report.peak_workers,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Size walk completed"
        );

        Ok(report)
    }
}

impl Default for DirSizer {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}

/// Wait for every task in `tasks`, reporting panics as worker errors.
async fn drain(walk: &Walk, tasks: &mut JoinSet<()>) {
    while let Some(joined) = tasks.join_next().await {
        if let Err(err) = joined {
            walk.aggregation.report(SizeError::Worker(err.to_string()));
        }
    }
}

fn expand(walk: Arc<Walk>, dir: Arc<dyn Dir>) -> BoxFuture<'static, ()> {
    async move {
        let mut children = JoinSet::new();
        if let Err(err) = visit(&walk, dir.as_ref(), &mut children).await {
            walk.aggregation.report(err);
        }
        drain(&walk, &mut children).await;
    }
    .boxed()
}

/// List `dir`, spawn its subdirectories, and merge the sizes of its files.
///
/// Subdirectory tasks are spawned right away and wait on the limiter
/// themselves; a spawned task that has not been admitted does no listing or
/// stat work and holds only its handle.
async fn visit(
    walk: &Arc<Walk>,
    dir: &dyn Dir,
    children: &mut JoinSet<()>,
) -> Result<(), SizeError> {
    let _slot = walk.limiter.acquire(&walk.scope).await?;

    let listing = walk
        .scope
        .run_until_cancelled(dir.list(&walk.scope))
        .await?
        .map_err(|source| SizeError::Listing {
            path: dir.path(),
            source,
        })?;

    debug!(
        path = %dir.path(),
        dirs = listing.dirs.len(),
        files = listing.files.len(),
        "Expanding directory"
    );

    for child in listing.dirs {
        children.spawn(expand(Arc::clone(walk), child));
    }

    let mut partial = SizeResult::default();
    for file in &listing.files {
        let size = walk
            .scope
            .run_until_cancelled(file.size(&walk.scope))
            .await?
            .map_err(|source| SizeError::Stat {
                path: file.path(),
                source,
            })?;
        partial += SizeResult::file(size);
    }

    walk.aggregation.merge(partial);
    Ok(())
}
