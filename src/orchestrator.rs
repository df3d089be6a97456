//! One archive cycle, end to end
//!
//! [`Orchestrator::run`] drives a single sequential pass:
//!
//! 1. Load the persisted state. Without an archive location and bucket the
//!    run stops at [`RunOutcome::Unconfigured`].
//! 2. Fingerprint the archive location.
//! 3. Compare against the stored fingerprint. Nothing changed means
//!    [`RunOutcome::Unchanged`].
//! 4. Bundle every current file, upload the bundle, and only then persist
//!    the new fingerprint.
//!
//! A failure anywhere before step 4 completes leaves the state file exactly
//! as it was, so the next run retries the whole cycle.

use crate::archive::{Archiver, Uploader};
use crate::collector::FingerprintCollector;
use crate::comparator::{self, ChangeResult, SnapshotDiff};
use crate::error::{ArchiveError, Result};
use crate::state::{ArchiveState, PersistedState, StateStore};
use crate::types::{FingerprintSnapshot, ProgressInfo};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Result of one [`Orchestrator::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// No archive location configured; nothing was done
    Unconfigured,
    /// Contents match the stored fingerprint
    Unchanged {
        /// Number of files fingerprinted
        file_count: usize,
    },
    /// Contents changed and were archived and uploaded
    Archived {
        /// Location of the bundle that was uploaded
        archive: PathBuf,
        /// Files included in the bundle
        files: Vec<String>,
    },
}

/// Current contents compared to the stored fingerprint, without side effects
#[derive(Debug, Clone)]
pub struct StatusReport {
    /// Configured state the comparison was made against
    pub state: PersistedState,
    /// Freshly collected fingerprint
    pub current: FingerprintSnapshot,
    /// Per-file differences
    pub diff: SnapshotDiff,
}

impl StatusReport {
    /// Whether a run would archive
    pub fn has_changes(&self) -> bool {
        comparator::changed(&self.state.hashes, &self.current).is_changed()
    }
}

/// Wires the state store, collector, archiver and uploader together
pub struct Orchestrator {
    store: StateStore,
    collector: FingerprintCollector,
    archiver: Box<dyn Archiver>,
    uploader: Box<dyn Uploader>,
}

impl Orchestrator {
    /// Create an orchestrator
    pub fn new(
        store: StateStore,
        collector: FingerprintCollector,
        archiver: Box<dyn Archiver>,
        uploader: Box<dyn Uploader>,
    ) -> Self {
        Self {
            store,
            collector,
            archiver,
            uploader,
        }
    }

    /// The state store in use
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Current configuration state
    ///
    /// # Errors
    ///
    /// Same as [`StateStore::load`].
    pub fn state(&self) -> Result<ArchiveState> {
        self.store.load_archive_state()
    }

    /// Move to [`ArchiveState::Ready`] with a new location and bucket
    ///
    /// # Errors
    ///
    /// Same as [`StateStore::configure`].
    pub fn configure(&self, archive_location: &Path, bucket_name: &str) -> Result<ArchiveState> {
        self.store
            .configure(archive_location, bucket_name)
            .map(ArchiveState::Ready)
    }

    /// Run one archive cycle
    ///
    /// # Errors
    ///
    /// Collection, archive, upload and save failures propagate unchanged.
    /// The persisted state is never modified on error.
    pub fn run(&self) -> Result<RunOutcome> {
        self.run_inner(None)
    }

    /// Run one archive cycle, reporting hashing progress
    ///
    /// # Errors
    ///
    /// Same as [`Orchestrator::run`].
    pub fn run_with_progress<F>(&self, callback: F) -> Result<RunOutcome>
    where
        F: Fn(ProgressInfo),
    {
        self.run_inner(Some(&callback))
    }

    #[instrument(skip(self, progress), fields(state_file = %self.store.path().display()))]
    fn run_inner(&self, progress: Option<&dyn Fn(ProgressInfo)>) -> Result<RunOutcome> {
        let state = match self.state()? {
            ArchiveState::Unconfigured => {
                info!("The archive file path is not set");
                return Ok(RunOutcome::Unconfigured);
            }
            ArchiveState::Ready(state) => state,
        };

        let current = match progress {
            Some(callback) => self
                .collector
                .collect_with_progress(&state.archive_location, callback)?,
            None => self.collector.collect(&state.archive_location)?,
        };

        match comparator::changed(&state.hashes, &current) {
            ChangeResult::Unchanged => {
                info!("No changes detected");
                Ok(RunOutcome::Unchanged {
                    file_count: current.len(),
                })
            }
            ChangeResult::Changed {
                filenames_to_archive,
                new_snapshot,
            } => {
                info!(
                    "Change detected, archiving {} files",
                    filenames_to_archive.len()
                );
                let archive = self
                    .archiver
                    .archive(&state.archive_location, &filenames_to_archive)?;
                self.uploader.upload(&state.bucket_name, &archive)?;
                self.store.save(&state.with_hashes(new_snapshot))?;

                Ok(RunOutcome::Archived {
                    archive,
                    files: filenames_to_archive,
                })
            }
        }
    }

    /// Compare the archive location against the stored fingerprint
    ///
    /// Nothing is archived, uploaded or saved.
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::NotConfigured`] when no location is set
    /// - Collection errors
    pub fn status(&self) -> Result<StatusReport> {
        let state = match self.state()? {
            ArchiveState::Unconfigured => return Err(ArchiveError::NotConfigured),
            ArchiveState::Ready(state) => state,
        };

        let current = self.collector.collect(&state.archive_location)?;
        let diff = comparator::diff(&state.hashes, &current);
        Ok(StatusReport {
            state,
            current,
            diff,
        })
    }
}
