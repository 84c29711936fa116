// Tests for error propagation and the first-error latch

use async_trait::async_trait;
use dirsize::fs::{MemDir, MemFile};
use dirsize::{Context, Dir, DirSizer, Listing, SizeError};
use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Directory whose listing panics.
struct ExplodingDir;

#[async_trait]
impl Dir for ExplodingDir {
    async fn list(&self, _ctx: &Context) -> anyhow::Result<Listing> {
        panic!("boom")
    }

    fn path(&self) -> String {
        "exploding".to_string()
    }
}

/// Root holding fixed children, so a panicking child can sit beside healthy ones.
struct FixedDir {
    dirs: Vec<Arc<dyn Dir>>,
}

#[async_trait]
impl Dir for FixedDir {
    async fn list(&self, _ctx: &Context) -> anyhow::Result<Listing> {
        Ok(Listing::new(self.dirs.clone(), Vec::new()))
    }

    fn path(&self) -> String {
        "fixed".to_string()
    }
}

#[tokio::test]
async fn test_child_listing_denied() {
    let (root, _) = MemDir::new("root")
        .file("a", 10)
        .dir(MemDir::new("private").failing("denied"))
        .into_root();

    let err = DirSizer::new(4)
        .size(&Context::background(), root)
        .await
        .unwrap_err();

    match &err {
        SizeError::Listing { path, source } => {
            assert_eq!(path, "private");
            assert_eq!(source.to_string(), "denied");
        }
        other => panic!("Expected Listing error, got {:?}", other),
    }
    assert_eq!(err.source().map(|s| s.to_string()), Some("denied".to_string()));
}

#[tokio::test]
async fn test_root_listing_failure() {
    let (root, probe) = MemDir::new("root").failing("unreachable").into_root();

    let err = DirSizer::new(1)
        .size(&Context::background(), root)
        .await
        .unwrap_err();
    assert!(matches!(err, SizeError::Listing { .. }));
    assert_eq!(probe.stats(), 0);
}

#[tokio::test]
async fn test_single_deep_stat_failure_fails_everything() {
    let mut tree = MemDir::new("root");
    for i in 0..50 {
        tree = tree.dir(MemDir::new(format!("ok{}", i)).file("f", 100));
    }
    tree = tree.dir(
        MemDir::new("a").dir(MemDir::new("b").with_file(MemFile::new("broken", 1).failing("EIO"))),
    );
    let (root, _) = tree.into_root();

    let err = DirSizer::new(4)
        .size(&Context::background(), root)
        .await
        .unwrap_err();
    match err {
        SizeError::Stat { path, source } => {
            assert_eq!(path, "broken");
            assert_eq!(source.to_string(), "EIO");
        }
        other => panic!("Expected Stat error, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_failures_yield_exactly_one_error() {
    let mut tree = MemDir::new("root");
    for i in 0..64 {
        tree = tree.dir(MemDir::new(format!("bad{}", i)).failing(format!("failure {}", i)));
    }
    let (root, _) = tree.into_root();

    let err = DirSizer::unbounded()
        .size(&Context::background(), root)
        .await
        .unwrap_err();

    // Later failures may surface as cancellations, but the latched error
    // is always one of the real listing failures.
    match err {
        SizeError::Listing { path, source } => {
            assert!(path.starts_with("bad"));
            assert!(source.to_string().starts_with("failure "));
        }
        other => panic!("Expected Listing error, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failure_stops_slow_siblings() {
    let (root, probe) = MemDir::new("root")
        .dir(MemDir::new("slow").slow(Duration::from_secs(30)).file("never", 1))
        .dir(MemDir::new("bad").failing("denied"))
        .into_root();

    let started = Instant::now();
    let err = DirSizer::new(4)
        .size(&Context::background(), root)
        .await
        .unwrap_err();

    assert!(matches!(err, SizeError::Listing { ref path, .. } if path == "bad"));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(probe.stats(), 0);
}

#[tokio::test]
async fn test_failure_does_not_cancel_caller_context() {
    let (root, _) = MemDir::new("root").failing("denied").into_root();
    let ctx = Context::background();

    assert!(DirSizer::new(2).size(&ctx, root).await.is_err());
    assert!(!ctx.is_cancelled());

    let (root, _) = MemDir::new("root").file("a", 1).into_root();
    assert!(DirSizer::new(2).size(&ctx, root).await.is_ok());
}

#[tokio::test]
async fn test_panicking_listing_is_a_worker_error() {
    let (healthy, _) = MemDir::new("healthy").file("a", 5).file("b", 7).into_root();
    let root = Arc::new(FixedDir {
        dirs: vec![healthy, Arc::new(ExplodingDir)],
    });

    let outcome = DirSizer::new(2)
        .size_with_stats(&Context::background(), root)
        .await;

    match outcome {
        Err(SizeError::Worker(message)) => assert!(message.contains("panicked")),
        Err(other) => panic!("Expected Worker error, got {:?}", other),
        Ok(report) => panic!("Expected no result, got {:?}", report),
    }
}

#[tokio::test]
async fn test_panicking_root_is_a_worker_error() {
    let err = DirSizer::new(1)
        .size(&Context::background(), Arc::new(ExplodingDir))
        .await
        .unwrap_err();
    assert!(matches!(err, SizeError::Worker(_)));
    assert_eq!(err.path(), None);
}
