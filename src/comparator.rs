//! Snapshot comparison
//!
//! Decides whether a freshly collected [`FingerprintSnapshot`] differs from
//! the previously persisted one. Both functions here are pure and total: they
//! never fail and never touch the filesystem.
//!
//! Two snapshots are equal only if they hold the same filenames with the same
//! digests. Comparing digests alone is not enough: replacing `b` with `c`
//! while reusing `b`'s content keeps both the length and the digest sequence
//! identical, yet it is a change.
//!
//! ```rust
//! use easyarchive::comparator::{changed, ChangeResult};
//! use easyarchive::types::{FileDigest, FingerprintSnapshot};
//!
//! let previous = FingerprintSnapshot::from_digests(vec![
//!     FileDigest::new("a", "h1"),
//!     FileDigest::new("b", "h2"),
//! ]);
//! let current = FingerprintSnapshot::from_digests(vec![
//!     FileDigest::new("a", "h1"),
//!     FileDigest::new("c", "h2"),
//! ]);
//!
//! assert!(changed(&previous, &current).is_changed());
//! ```

use crate::types::{FileDigest, FingerprintSnapshot};
use std::cmp::Ordering;

/// Outcome of comparing two snapshots
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeResult {
    /// Same filenames with the same digests
    Unchanged,
    /// Something was added, removed, renamed or modified
    Changed {
        /// Every filename of the current snapshot, in canonical order
        filenames_to_archive: Vec<String>,
        /// The snapshot to persist
        new_snapshot: FingerprintSnapshot,
    },
}

impl ChangeResult {
    /// Check whether a change was detected
    pub fn is_changed(&self) -> bool {
        matches!(self, ChangeResult::Changed { .. })
    }
}

/// Decide whether `current` differs from `previous`
///
/// A different length is always a change. Otherwise entries are compared
/// pairwise in canonical order on both filename and digest. On change the
/// whole current file list is returned for archiving, not just the delta.
pub fn changed(previous: &FingerprintSnapshot, current: &FingerprintSnapshot) -> ChangeResult {
    let differs = previous.len() != current.len()
        || previous
            .iter()
            .zip(current.iter())
            .any(|(old, new)| old.filename != new.filename || old.digest_hex != new.digest_hex);

    if differs {
        ChangeResult::Changed {
            filenames_to_archive: current.filenames(),
            new_snapshot: current.clone(),
        }
    } else {
        ChangeResult::Unchanged
    }
}

/// Per-file differences between two snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    /// Filenames present only in the current snapshot
    pub added: Vec<String>,
    /// Filenames present only in the previous snapshot
    pub removed: Vec<String>,
    /// Filenames present in both with different digests
    pub modified: Vec<String>,
}

impl SnapshotDiff {
    /// Check if there are any changes
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// Get total number of changes
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }
}

/// Compute which files were added, removed or modified
///
/// Merge-walks both snapshots in canonical order, so it runs in linear time.
/// `diff(p, c).is_empty()` holds exactly when `changed(p, c)` is
/// [`ChangeResult::Unchanged`], for snapshots without duplicate filenames.
pub fn diff(previous: &FingerprintSnapshot, current: &FingerprintSnapshot) -> SnapshotDiff {
    let mut result = SnapshotDiff::default();
    let mut old_iter = previous.iter().peekable();
    let mut new_iter = current.iter().peekable();

    loop {
        match (old_iter.peek(), new_iter.peek()) {
            (Some(old), Some(new)) => match compare_names(old, new) {
                Ordering::Less => {
                    result.removed.push(old.filename.clone());
                    old_iter.next();
                }
                Ordering::Greater => {
                    result.added.push(new.filename.clone());
                    new_iter.next();
                }
                Ordering::Equal => {
                    if old.digest_hex != new.digest_hex {
                        result.modified.push(new.filename.clone());
                    }
                    old_iter.next();
                    new_iter.next();
                }
            },
            (Some(old), None) => {
                result.removed.push(old.filename.clone());
                old_iter.next();
            }
            (None, Some(new)) => {
                result.added.push(new.filename.clone());
                new_iter.next();
            }
            (None, None) => break,
        }
    }

    result
}

fn compare_names(a: &FileDigest, b: &FileDigest) -> Ordering {
    a.filename.as_bytes().cmp(b.filename.as_bytes())
}
