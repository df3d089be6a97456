//! # easyarchive - Archive a directory whenever its contents change
//!
//! easyarchive watches one directory across runs. Each run fingerprints
//! every file in it, compares the result with the fingerprint saved by the
//! previous run, and when anything changed bundles the directory and uploads
//! the bundle to a bucket.
//!
//! ## Overview
//!
//! The interesting part is the fingerprinting engine:
//!
//! - **Content hashing**: files are streamed through SHA-256, never loaded
//!   whole into memory
//! - **Bounded parallel collection**: a fixed-size worker pool hashes files
//!   concurrently and fails fast on the first unreadable file
//! - **Deterministic comparison**: snapshots are sorted by filename and
//!   compared on both names and digests, so renames are never missed
//!
//! Around it sit the persisted state (`config.json`), the archiver and the
//! uploader, wired together by [`Orchestrator`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use easyarchive::{changed, ChangeResult, FingerprintCollector, FingerprintSnapshot};
//! use std::path::Path;
//!
//! # fn main() -> easyarchive::Result<()> {
//! let collector = FingerprintCollector::new().with_parallel_workers(8);
//!
//! let before = collector.collect(Path::new("./backups"))?;
//! // ... files change ...
//! let after = collector.collect(Path::new("./backups"))?;
//!
//! match changed(&before, &after) {
//!     ChangeResult::Unchanged => println!("Nothing to do"),
//!     ChangeResult::Changed { filenames_to_archive, .. } => {
//!         println!("Archiving {} files", filenames_to_archive.len());
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Full cycle
//!
//! ```rust,no_run
//! use easyarchive::{FingerprintCollector, LocalUploader, Orchestrator, StagingArchiver, StateStore};
//! use std::path::Path;
//!
//! # fn main() -> easyarchive::Result<()> {
//! let orchestrator = Orchestrator::new(
//!     StateStore::new("config.json"),
//!     FingerprintCollector::new(),
//!     Box::new(StagingArchiver::new(".")),
//!     Box::new(LocalUploader::new("./remote")),
//! );
//!
//! orchestrator.configure(Path::new("/home/jack/mybackupfolder"), "easyarchive-demo")?;
//! let outcome = orchestrator.run()?;
//! println!("{:?}", outcome);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All operations return `Result<T, ArchiveError>`. Collection fails with
//! [`ArchiveError::Directory`] when the root cannot be listed and with
//! [`ArchiveError::FileRead`] when a file cannot be hashed; in both cases no
//! partial snapshot is produced and the saved state is left alone.
//!
//! ## Module Organization
//!
//! - [`hasher`]: content digests for single files
//! - [`collector`]: parallel fingerprinting of a directory
//! - [`comparator`]: snapshot comparison and diffs
//! - [`state`]: persisted state and the JSON state store
//! - [`archive`]: bundling and upload backends
//! - [`orchestrator`]: one archive cycle end to end
//! - [`types`]: shared data types
//! - [`error`]: error types

pub mod archive;
pub mod collector;
pub mod comparator;
pub mod error;
pub mod hasher;
pub mod orchestrator;
pub mod state;
pub mod types;

mod utils;

pub use archive::{Archiver, LocalUploader, StagingArchiver, Uploader};
pub use collector::{collect, FingerprintCollector};
pub use comparator::{changed, diff, ChangeResult, SnapshotDiff};
pub use error::{ArchiveError, Result};
pub use hasher::{ContentHasher, Sha256Hasher};
pub use orchestrator::{Orchestrator, RunOutcome, StatusReport};
pub use state::{generate_bucket_name, ArchiveState, PersistedState, StateStore};
pub use types::{FileDigest, FingerprintSnapshot, ProgressInfo};
pub use utils::format_bytes;
