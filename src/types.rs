//! Core data types shared across easyarchive
//!
//! - [`FileDigest`]: one file's name and content digest
//! - [`FingerprintSnapshot`]: the sorted set of digests for a directory
//! - [`ProgressInfo`]: what progress callbacks receive during collection
//!
//! ## Examples
//!
//! ```rust
//! use easyarchive::types::{FileDigest, FingerprintSnapshot};
//!
//! let snapshot = FingerprintSnapshot::from_digests(vec![
//!     FileDigest::new("b.txt", "02"),
//!     FileDigest::new("a.txt", "01"),
//! ]);
//!
//! // Always sorted by filename, whatever the input order
//! assert_eq!(snapshot.filenames(), vec!["a.txt", "b.txt"]);
//! ```

use serde::{Deserialize, Serialize};

/// A file's identity and content digest
///
/// Serialized with the field names `Filename` and `Value`, which is the
/// layout of the `Hashes` entries in the state file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileDigest {
    /// Base name (flat mode) or `/`-joined relative path (recursive mode)
    #[serde(rename = "Filename")]
    pub filename: String,
    /// Lowercase hex content digest
    #[serde(rename = "Value")]
    pub digest_hex: String,
}

impl FileDigest {
    /// Create a digest entry
    pub fn new(filename: impl Into<String>, digest_hex: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            digest_hex: digest_hex.into(),
        }
    }
}

/// Fingerprint of a directory at one point in time
///
/// Entries are kept sorted by filename in byte order, then by digest for
/// entries sharing a filename. Every constructor
/// (including deserialization) sorts, so two snapshots of the same files
/// always have the same order no matter how they were produced.
///
/// Serializes as a plain JSON array of [`FileDigest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<FileDigest>")]
pub struct FingerprintSnapshot(Vec<FileDigest>);

impl FingerprintSnapshot {
    /// Build a snapshot from digests in any order
    pub fn from_digests(mut digests: Vec<FileDigest>) -> Self {
        digests.sort_by(|a, b| {
            a.filename
                .as_bytes()
                .cmp(b.filename.as_bytes())
                .then_with(|| a.digest_hex.cmp(&b.digest_hex))
        });
        Self(digests)
    }

    /// Create an empty snapshot
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Number of files
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over entries in canonical order
    pub fn iter(&self) -> std::slice::Iter<'_, FileDigest> {
        self.0.iter()
    }

    /// Entries in canonical order
    pub fn as_slice(&self) -> &[FileDigest] {
        &self.0
    }

    /// Look up the digest recorded for `filename`
    pub fn get(&self, filename: &str) -> Option<&FileDigest> {
        self.0
            .binary_search_by(|d| d.filename.as_bytes().cmp(filename.as_bytes()))
            .ok()
            .map(|idx| &self.0[idx])
    }

    /// All filenames in canonical order
    pub fn filenames(&self) -> Vec<String> {
        self.0.iter().map(|d| d.filename.clone()).collect()
    }

    /// Filenames that occur more than once
    ///
    /// A well-formed snapshot has none. Snapshots loaded from hand-edited
    /// state files may.
    pub fn duplicate_filenames(&self) -> Vec<String> {
        let mut duplicates: Vec<String> = self
            .0
            .windows(2)
            .filter(|pair| pair[0].filename == pair[1].filename)
            .map(|pair| pair[0].filename.clone())
            .collect();
        duplicates.dedup();
        duplicates
    }

    /// Consume the snapshot, returning its entries
    pub fn into_vec(self) -> Vec<FileDigest> {
        self.0
    }
}

impl From<Vec<FileDigest>> for FingerprintSnapshot {
    fn from(digests: Vec<FileDigest>) -> Self {
        Self::from_digests(digests)
    }
}

impl FromIterator<FileDigest> for FingerprintSnapshot {
    fn from_iter<I: IntoIterator<Item = FileDigest>>(iter: I) -> Self {
        Self::from_digests(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a FingerprintSnapshot {
    type Item = &'a FileDigest;
    type IntoIter = std::slice::Iter<'a, FileDigest>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Information passed to progress callbacks
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Operation being performed
    pub operation: String,
    /// Current item being processed
    pub current_item: Option<String>,
    /// Items processed so far
    pub processed: usize,
    /// Total items to process (if known)
    pub total: Option<usize>,
    /// Bytes processed so far
    pub bytes_processed: u64,
}

impl ProgressInfo {
    /// Get progress as a percentage (0-100)
    pub fn percentage(&self) -> Option<f32> {
        match self.total {
            Some(total) if total > 0 => Some((self.processed as f32 / total as f32) * 100.0),
            _ => None,
        }
    }
}
