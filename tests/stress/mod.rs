//! Stress tests for the bounded hashing pool
//!
//! Many small files, a few large ones, and worker counts well above and
//! below the file count.

use ::easyarchive::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::Path;
use std::time::Instant;
use tempfile::TempDir;
use tracing::info;

fn populate(dir: &Path, count: usize, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for i in 0..count {
        let size = rng.random_range(0..4096);
        let content: Vec<u8> = (0..size).map(|_| rng.random()).collect();
        fs::write(dir.join(format!("file_{:04}.dat", i)), content).unwrap();
    }
}

#[test]
fn test_many_files_same_result_for_any_worker_count() {
    let temp_dir = TempDir::new().unwrap();
    populate(temp_dir.path(), 500, 42);

    let reference = FingerprintCollector::new()
        .with_parallel_workers(1)
        .collect(temp_dir.path())
        .unwrap();
    assert_eq!(reference.len(), 500);

    for workers in [2, 8, 32, 64] {
        let start = Instant::now();
        let snapshot = FingerprintCollector::new()
            .with_parallel_workers(workers)
            .collect(temp_dir.path())
            .unwrap();
        info!("{} workers: {:?}", workers, start.elapsed());
        assert_eq!(snapshot, reference, "workers = {}", workers);
    }
}

#[test]
fn test_repeated_collection_is_stable() {
    let temp_dir = TempDir::new().unwrap();
    populate(temp_dir.path(), 200, 7);

    let collector = FingerprintCollector::new().with_parallel_workers(8);
    let first = collector.collect(temp_dir.path()).unwrap();
    for _ in 0..10 {
        let again = collector.collect(temp_dir.path()).unwrap();
        assert_eq!(changed(&first, &again), ChangeResult::Unchanged);
    }
}

#[test]
fn test_large_files_stream_through() {
    let temp_dir = TempDir::new().unwrap();
    let mut rng = StdRng::seed_from_u64(99);

    // A few multi-buffer files next to small ones
    for i in 0..4 {
        let content: Vec<u8> = (0..(3 * 1024 * 1024 + i)).map(|_| rng.random()).collect();
        fs::write(temp_dir.path().join(format!("large_{}.bin", i)), content).unwrap();
    }
    populate(temp_dir.path(), 50, 3);

    let snapshot = FingerprintCollector::new()
        .with_parallel_workers(4)
        .collect(temp_dir.path())
        .unwrap();
    assert_eq!(snapshot.len(), 54);

    let large = fs::read(temp_dir.path().join("large_2.bin")).unwrap();
    let expected = hasher::hash_data(&large);
    assert_eq!(snapshot.get("large_2.bin").unwrap().digest_hex, expected);
}

#[test]
fn test_single_change_among_many_is_detected() {
    let temp_dir = TempDir::new().unwrap();
    populate(temp_dir.path(), 300, 11);

    let collector = FingerprintCollector::new().with_parallel_workers(16);
    let before = collector.collect(temp_dir.path()).unwrap();

    fs::write(temp_dir.path().join("file_0150.dat"), b"flipped").unwrap();
    let after = collector.collect(temp_dir.path()).unwrap();

    let d = diff(&before, &after);
    assert_eq!(d.modified, vec!["file_0150.dat"]);
    assert!(d.added.is_empty() && d.removed.is_empty());
    assert!(changed(&before, &after).is_changed());
}
