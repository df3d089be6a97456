//! Tree fingerprint collection
//!
//! [`FingerprintCollector`] enumerates the regular files of a directory and
//! hashes every one of them on a bounded pool of worker threads, producing a
//! [`FingerprintSnapshot`].
//!
//! ## Collection model
//!
//! - **Enumeration** happens on the calling thread. By default only the top
//!   level of the root is scanned and files are keyed by base name; with
//!   [`FingerprintCollector::with_recursive`] subdirectories are walked and
//!   files are keyed by their `/`-joined relative path.
//! - **Hashing** is fanned out to a dedicated rayon pool of
//!   `parallel_workers` threads. Each task sends its outcome through a
//!   channel to the calling thread, which is the only owner of the result
//!   list.
//! - **Fail-fast**: the first failed task sets a shared cancel flag and
//!   `collect` returns that error immediately. Queued tasks see the flag and
//!   exit without opening their file; running tasks stop at their next chunk.
//!   Nothing waits for stragglers, and no partial snapshot is ever returned.
//!
//! Symbolic links and other non-regular entries are skipped. A file whose
//! name is not valid UTF-8 fails the collection with
//! [`ArchiveError::InvalidFileName`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use easyarchive::FingerprintCollector;
//! use std::path::Path;
//!
//! # fn main() -> easyarchive::Result<()> {
//! let collector = FingerprintCollector::new().with_parallel_workers(8);
//! let snapshot = collector.collect(Path::new("./backups"))?;
//! for entry in &snapshot {
//!     println!("{}  {}", entry.digest_hex, entry.filename);
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::{ArchiveError, Result};
use crate::hasher::{ContentHasher, Sha256Hasher};
use crate::types::{FileDigest, FingerprintSnapshot, ProgressInfo};
use crate::utils;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Instant;
use tracing::{debug, error, instrument, trace, warn};
use walkdir::WalkDir;

/// A file found during enumeration, waiting to be hashed
#[derive(Debug, Clone)]
struct PendingFile {
    path: PathBuf,
    key: String,
    size: u64,
}

/// Collects content fingerprints for a directory
///
/// Holds no state between calls; one collector can be used for any number
/// of roots, from any number of threads.
pub struct FingerprintCollector {
    /// Upper bound on concurrently hashing threads
    parallel_workers: usize,
    /// Walk subdirectories and key by relative path
    recursive: bool,
    /// Digest implementation shared by all workers
    hasher: Arc<dyn ContentHasher>,
}

impl fmt::Debug for FingerprintCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FingerprintCollector")
            .field("parallel_workers", &self.parallel_workers)
            .field("recursive", &self.recursive)
            .finish_non_exhaustive()
    }
}

impl Default for FingerprintCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl FingerprintCollector {
    /// Create a collector with default settings
    ///
    /// - One worker per CPU core
    /// - Flat scanning keyed by base name
    /// - SHA-256 content digests
    pub fn new() -> Self {
        Self {
            parallel_workers: num_cpus::get().max(1),
            recursive: false,
            hasher: Arc::new(Sha256Hasher),
        }
    }

    /// Set the number of hashing workers (minimum 1)
    pub fn with_parallel_workers(mut self, workers: usize) -> Self {
        self.parallel_workers = workers.max(1);
        self
    }

    /// Walk subdirectories, keying files by relative path
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Replace the content hasher
    pub fn with_hasher(mut self, hasher: Arc<dyn ContentHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Configured worker bound
    pub fn parallel_workers(&self) -> usize {
        self.parallel_workers
    }

    /// Whether subdirectories are walked
    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// Fingerprint every regular file under `root`
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::Directory`] if `root` (or, when recursive, any
    ///   subdirectory) is missing, not a directory, or cannot be listed
    /// - [`ArchiveError::InvalidFileName`] if a name is not valid UTF-8
    /// - [`ArchiveError::FileRead`] for the first file that failed to hash
    /// - [`ArchiveError::ThreadPool`] if the worker pool cannot be started
    pub fn collect(&self, root: &Path) -> Result<FingerprintSnapshot> {
        self.collect_inner(root, None)
    }

    /// Fingerprint `root`, reporting each hashed file to `callback`
    ///
    /// The callback runs on the calling thread, once per completed file, in
    /// completion order.
    ///
    /// # Errors
    ///
    /// Same as [`FingerprintCollector::collect`].
    pub fn collect_with_progress<F>(&self, root: &Path, callback: F) -> Result<FingerprintSnapshot>
    where
        F: Fn(ProgressInfo),
    {
        self.collect_inner(root, Some(&callback))
    }

    #[instrument(skip(self, progress), fields(root = %root.display(), workers = self.parallel_workers))]
    fn collect_inner(
        &self,
        root: &Path,
        progress: Option<&dyn Fn(ProgressInfo)>,
    ) -> Result<FingerprintSnapshot> {
        let start = Instant::now();

        let files = self.enumerate(root)?;
        let file_count = files.len();
        debug!("Enumerated {} files", file_count);

        let digests = self.hash_all(files, progress)?;
        let snapshot = FingerprintSnapshot::from_digests(digests);

        let duplicates = snapshot.duplicate_filenames();
        if !duplicates.is_empty() {
            warn!("Snapshot has colliding filenames: {:?}", duplicates);
        }

        debug!(
            "Fingerprinted {} files in {:?}",
            snapshot.len(),
            start.elapsed()
        );
        Ok(snapshot)
    }

    /// List the regular files to hash
    fn enumerate(&self, root: &Path) -> Result<Vec<PendingFile>> {
        let metadata = fs::metadata(root).map_err(|e| ArchiveError::directory(root, e))?;
        if !metadata.is_dir() {
            return Err(ArchiveError::directory(
                root,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
            ));
        }

        if self.recursive {
            self.enumerate_recursive(root)
        } else {
            self.enumerate_flat(root)
        }
    }

    fn enumerate_flat(&self, root: &Path) -> Result<Vec<PendingFile>> {
        let mut files = Vec::new();
        let entries = fs::read_dir(root).map_err(|e| ArchiveError::directory(root, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| ArchiveError::directory(root, e))?;
            let file_type = entry.file_type().map_err(|e| ArchiveError::directory(root, e))?;
            if !file_type.is_file() {
                trace!("Skipping non-regular entry {:?}", entry.path());
                continue;
            }

            let path = entry.path();
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            let key = utils::snapshot_key(&path, root, false)?;
            files.push(PendingFile { path, key, size });
        }

        Ok(files)
    }

    fn enumerate_recursive(&self, root: &Path) -> Result<Vec<PendingFile>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(root).follow_links(false).min_depth(1) {
            let entry = entry.map_err(|e| walk_error(root, e))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path().to_path_buf();
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            let key = utils::snapshot_key(&path, root, true)?;
            files.push(PendingFile { path, key, size });
        }

        Ok(files)
    }

    /// Hash all files on a bounded pool, failing on the first error
    fn hash_all(
        &self,
        files: Vec<PendingFile>,
        progress: Option<&dyn Fn(ProgressInfo)>,
    ) -> Result<Vec<FileDigest>> {
        let total = files.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.parallel_workers.min(total))
            .thread_name(|idx| format!("easyarchive-hash-{}", idx))
            .panic_handler(|_| error!("Hashing worker panicked"))
            .build()
            .map_err(|e| ArchiveError::ThreadPool(e.to_string()))?;

        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel::<Result<(FileDigest, u64)>>();

        for file in files {
            let tx = tx.clone();
            let cancel = Arc::clone(&cancel);
            let hasher = Arc::clone(&self.hasher);

            pool.spawn(move || {
                if cancel.load(Ordering::Acquire) {
                    return;
                }
                let outcome = hasher
                    .hash_cancellable(&file.path, &cancel)
                    .map(|digest_hex| (FileDigest::new(file.key, digest_hex), file.size));
                // The receiver is gone once collection has failed
                let _ = tx.send(outcome);
            });
        }
        drop(tx);

        let mut digests = Vec::with_capacity(total);
        let mut bytes_processed = 0u64;

        for outcome in rx {
            match outcome {
                Ok((digest, size)) => {
                    bytes_processed += size;
                    trace!(
                        "Hashed {} ({})",
                        digest.filename,
                        digest.digest_hex.get(..8).unwrap_or(&digest.digest_hex)
                    );

                    if let Some(callback) = progress {
                        callback(ProgressInfo {
                            operation: "Hashing files".to_string(),
                            current_item: Some(digest.filename.clone()),
                            processed: digests.len() + 1,
                            total: Some(total),
                            bytes_processed,
                        });
                    }
                    digests.push(digest);
                }
                Err(e) => {
                    cancel.store(true, Ordering::Release);
                    warn!("Aborting collection after {} of {} files: {}", digests.len(), total, e);
                    return Err(e);
                }
            }
        }

        // Every task either sent a result or panicked
        if digests.len() != total {
            return Err(ArchiveError::internal(format!(
                "{} of {} hashing tasks produced no result",
                total - digests.len(),
                total
            )));
        }

        Ok(digests)
    }
}

/// Map a walker failure onto the directory that could not be read
fn walk_error(root: &Path, err: walkdir::Error) -> ArchiveError {
    let path = err.path().unwrap_or(root).to_path_buf();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "filesystem loop"));
    ArchiveError::directory(path, source)
}

/// Fingerprint `root` with a default [`FingerprintCollector`]
///
/// # Errors
///
/// Same as [`FingerprintCollector::collect`].
pub fn collect(root: &Path) -> Result<FingerprintSnapshot> {
    FingerprintCollector::new().collect(root)
}
