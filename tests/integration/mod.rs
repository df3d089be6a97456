//! Integration tests for easyarchive
//!
//! Drive whole archive cycles through the orchestrator against real
//! temporary directories and check what ends up in the state file, the
//! bundle directory and the stand-in remote.

use ::easyarchive::*;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Test harness wiring an orchestrator to temporary directories
pub struct ArchiveTestHarness {
    pub data_dir: TempDir,
    pub work_dir: TempDir,
    pub orchestrator: Orchestrator,
}

impl ArchiveTestHarness {
    pub fn new() -> Self {
        Self::with_collector(FingerprintCollector::new().with_parallel_workers(4))
    }

    pub fn with_collector(collector: FingerprintCollector) -> Self {
        Self::with_parts(collector, Box::new(FailingUploader::never()))
    }

    pub fn with_parts(collector: FingerprintCollector, uploader: Box<dyn Uploader>) -> Self {
        let data_dir = TempDir::new().unwrap();
        let work_dir = TempDir::new().unwrap();
        let orchestrator = Orchestrator::new(
            StateStore::new(work_dir.path().join("config.json")),
            collector,
            Box::new(StagingArchiver::new(work_dir.path().join("bundles"))),
            uploader,
        );
        Self {
            data_dir,
            work_dir,
            orchestrator,
        }
    }

    pub fn data(&self) -> &Path {
        self.data_dir.path()
    }

    pub fn remote(&self) -> PathBuf {
        self.work_dir.path().join("remote")
    }

    pub fn write(&self, name: &str, content: &str) {
        fs::write(self.data().join(name), content).unwrap();
    }

    pub fn configure(&self) {
        self.orchestrator.configure(self.data(), "easyarchive-test").unwrap();
    }

    pub fn raw_state(&self) -> String {
        fs::read_to_string(self.orchestrator.store().path()).unwrap()
    }
}

/// Read one entry of a bundle written by [`StagingArchiver`]
pub fn read_zip_entry(bundle: &Path, name: &str) -> String {
    let mut zip = zip::ZipArchive::new(fs::File::open(bundle).unwrap()).unwrap();
    let mut content = String::new();
    zip.by_name(name).unwrap().read_to_string(&mut content).unwrap();
    content
}

/// Uploads locally, failing the first `failures` attempts
pub struct FailingUploader {
    failures: usize,
    attempts: AtomicUsize,
    inner: Option<LocalUploader>,
}

impl FailingUploader {
    pub fn never() -> Self {
        Self {
            failures: 0,
            attempts: AtomicUsize::new(0),
            inner: None,
        }
    }

    pub fn failing(failures: usize, remote: PathBuf) -> Self {
        Self {
            failures,
            attempts: AtomicUsize::new(0),
            inner: Some(LocalUploader::new(remote)),
        }
    }
}

impl Uploader for FailingUploader {
    fn upload(&self, bucket: &str, archive: &Path) -> Result<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(ArchiveError::upload("remote unavailable"));
        }
        match &self.inner {
            Some(inner) => inner.upload(bucket, archive),
            None => Ok(()),
        }
    }
}

/// Fails on one named file, hashes the rest normally
pub struct PoisonedHasher {
    pub poisoned: String,
}

impl ContentHasher for PoisonedHasher {
    fn hash(&self, path: &Path) -> Result<String> {
        if path.file_name().is_some_and(|n| n.to_string_lossy() == self.poisoned) {
            return Err(ArchiveError::FileRead {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk fault"),
            });
        }
        Sha256Hasher.hash(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    #[traced_test]
    fn test_unconfigured_then_ready() {
        let harness = ArchiveTestHarness::new();
        harness.write("a.txt", "alpha");

        assert_eq!(harness.orchestrator.run().unwrap(), RunOutcome::Unconfigured);
        assert_eq!(harness.orchestrator.state().unwrap(), ArchiveState::Unconfigured);

        harness.configure();
        assert!(matches!(harness.orchestrator.state().unwrap(), ArchiveState::Ready(_)));
        assert!(matches!(
            harness.orchestrator.run().unwrap(),
            RunOutcome::Archived { .. }
        ));
        assert!(logs_contain("Change detected"));
    }

    #[test]
    #[traced_test]
    fn test_full_lifecycle() {
        let harness = ArchiveTestHarness::new();
        harness.write("a.txt", "alpha");
        harness.write("b.txt", "bravo");
        harness.configure();

        // First run archives everything
        let RunOutcome::Archived { files, archive } = harness.orchestrator.run().unwrap() else {
            panic!("first run must archive");
        };
        assert_eq!(files, vec!["a.txt", "b.txt"]);
        assert_eq!(read_zip_entry(&archive, "b.txt"), "bravo");

        // Untouched
        assert_eq!(
            harness.orchestrator.run().unwrap(),
            RunOutcome::Unchanged { file_count: 2 }
        );
        assert!(logs_contain("No changes detected"));

        // Modify: whole current set is archived, not just the delta
        harness.write("a.txt", "alpha v2");
        let RunOutcome::Archived { files, .. } = harness.orchestrator.run().unwrap() else {
            panic!("modification must archive");
        };
        assert_eq!(files, vec!["a.txt", "b.txt"]);

        // Growth
        harness.write("c.txt", "charlie");
        assert!(matches!(harness.orchestrator.run().unwrap(), RunOutcome::Archived { .. }));

        // Shrink
        fs::remove_file(harness.data().join("b.txt")).unwrap();
        let RunOutcome::Archived { files, .. } = harness.orchestrator.run().unwrap() else {
            panic!("removal must archive");
        };
        assert_eq!(files, vec!["a.txt", "c.txt"]);

        let state = harness.orchestrator.store().load().unwrap();
        assert_eq!(state.hashes.filenames(), vec!["a.txt", "c.txt"]);
    }

    #[test]
    fn test_rename_with_same_content_archives() {
        let harness = ArchiveTestHarness::new();
        harness.write("a.txt", "same");
        harness.write("b.txt", "other");
        harness.configure();
        harness.orchestrator.run().unwrap();

        fs::rename(harness.data().join("b.txt"), harness.data().join("c.txt")).unwrap();

        let RunOutcome::Archived { files, .. } = harness.orchestrator.run().unwrap() else {
            panic!("rename must archive");
        };
        assert_eq!(files, vec!["a.txt", "c.txt"]);
    }

    #[test]
    #[traced_test]
    fn test_failed_collection_leaves_state_untouched() {
        let collector = FingerprintCollector::new()
            .with_parallel_workers(4)
            .with_hasher(Arc::new(PoisonedHasher {
                poisoned: "poison.bin".to_string(),
            }));
        let harness = ArchiveTestHarness::with_collector(collector);

        for i in 0..30 {
            harness.write(&format!("file_{:02}.txt", i), &format!("content {}", i));
        }
        harness.configure();
        harness.orchestrator.run().unwrap();
        let saved = harness.raw_state();

        harness.write("file_00.txt", "changed");
        harness.write("poison.bin", "unreadable");

        let err = harness.orchestrator.run().unwrap_err();
        assert!(matches!(err, ArchiveError::FileRead { .. }));
        assert!(err.is_collection_failure());
        assert_eq!(harness.raw_state(), saved);
        assert!(logs_contain("Aborting collection"));
    }

    #[test]
    fn test_failed_upload_retries_next_run() {
        let collector = FingerprintCollector::new().with_parallel_workers(2);
        let remote = TempDir::new().unwrap();
        let harness = ArchiveTestHarness::with_parts(
            collector,
            Box::new(FailingUploader::failing(1, remote.path().to_path_buf())),
        );
        harness.write("a.txt", "alpha");
        harness.configure();
        let configured = harness.raw_state();

        let err = harness.orchestrator.run().unwrap_err();
        assert!(matches!(err, ArchiveError::Upload(_)));
        assert_eq!(harness.raw_state(), configured);

        // Nothing was saved, so the change is still pending
        assert!(matches!(harness.orchestrator.run().unwrap(), RunOutcome::Archived { .. }));
        let uploaded: Vec<_> = fs::read_dir(remote.path().join("easyarchive-test"))
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(uploaded.len(), 1);
        assert_eq!(read_zip_entry(&uploaded[0], "a.txt"), "alpha");
        assert!(!harness.remote().exists());
    }

    #[test]
    fn test_missing_archive_location_is_directory_error() {
        let harness = ArchiveTestHarness::new();
        harness.configure();
        let saved = harness.raw_state();

        let missing = harness.data().to_path_buf();
        fs::remove_dir_all(&missing).unwrap();

        let err = harness.orchestrator.run().unwrap_err();
        assert!(matches!(err, ArchiveError::Directory { ref path, .. } if *path == missing));
        assert_eq!(harness.raw_state(), saved);
    }

    #[test]
    fn test_status_lists_changes() {
        let harness = ArchiveTestHarness::new();
        harness.write("keep.txt", "keep");
        harness.write("edit.txt", "v1");
        harness.write("drop.txt", "drop");
        harness.configure();
        harness.orchestrator.run().unwrap();

        harness.write("edit.txt", "v2");
        harness.write("new.txt", "new");
        fs::remove_file(harness.data().join("drop.txt")).unwrap();

        let report = harness.orchestrator.status().unwrap();
        assert!(report.has_changes());
        assert_eq!(report.diff.added, vec!["new.txt"]);
        assert_eq!(report.diff.modified, vec!["edit.txt"]);
        assert_eq!(report.diff.removed, vec!["drop.txt"]);
    }
}
