// Tests for the worker bound and order independence

use dirsize::fs::{MemDir, MemFile};
use dirsize::{Context, DirSizer, SizeResult};
use std::time::Duration;

/// Uneven tree: fan-out 1..=4 per level, three levels deep, varied sizes.
fn uneven_tree(name: &str, depth: u32, seed: u64) -> MemDir {
    let mut dir = MemDir::new(name);
    for i in 0..(seed % 3 + 1) {
        dir = dir.file(format!("{}-f{}", name, i), seed * 7 + i);
    }
    if depth > 0 {
        for i in 0..(seed % 4 + 1) {
            let child = format!("{}/{}", name, i);
            dir = dir.dir(uneven_tree(&child, depth - 1, seed + i + 1));
        }
    }
    dir
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_result_is_independent_of_bound() {
    let mut results = Vec::new();
    for bound in [1usize, 4, 0] {
        let (root, _) = uneven_tree("root", 3, 5).into_root();
        let result = DirSizer::new(bound)
            .size(&Context::background(), root)
            .await
            .unwrap();
        results.push(result);
    }

    assert!(results[0].count > 0);
    assert_eq!(results[0], results[1]);
    assert_eq!(results[1], results[2]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_bound_is_respected_with_slow_listings() {
    for bound in [1usize, 4] {
        let mut tree = MemDir::new("root");
        for i in 0..24 {
            tree = tree.dir(
                MemDir::new(format!("d{}", i))
                    .slow(Duration::from_millis(5))
                    .file("f", 2),
            );
        }
        let (root, probe) = tree.into_root();

        let report = DirSizer::new(bound)
            .size_with_stats(&Context::background(), root)
            .await
            .unwrap();
        assert_eq!(report.result, SizeResult::new(48, 24));
        assert!(report.peak_workers <= bound, "peak {} > bound {}", report.peak_workers, bound);
        assert!(probe.peak_listings() <= bound);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_unbounded_runs_expansions_in_parallel() {
    let mut tree = MemDir::new("root");
    for i in 0..16 {
        tree = tree.dir(MemDir::new(format!("d{}", i)).slow(Duration::from_millis(100)));
    }
    let (root, probe) = tree.into_root();

    let report = DirSizer::unbounded()
        .size_with_stats(&Context::background(), root)
        .await
        .unwrap();
    assert_eq!(report.dirs_expanded, 17);
    assert!(probe.peak_listings() > 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_slow_stats_share_the_bound() {
    let mut tree = MemDir::new("root");
    for i in 0..8 {
        tree = tree.dir(
            MemDir::new(format!("d{}", i))
                .with_file(MemFile::new("slow", 3).slow(Duration::from_millis(5))),
        );
    }
    let (root, _) = tree.into_root();

    let report = DirSizer::new(2)
        .size_with_stats(&Context::background(), root)
        .await
        .unwrap();
    assert_eq!(report.result, SizeResult::new(24, 8));
    assert!(report.peak_workers <= 2);
}
