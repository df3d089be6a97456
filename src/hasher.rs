//! Content hashing
//!
//! The leaf of the fingerprinting engine: turn one file into a lowercase hex
//! digest of its bytes. Files are streamed through the digest in fixed-size
//! chunks, so memory use does not depend on file size.
//!
//! The algorithm is SHA-256. Digests are persisted between runs and compared
//! as hex strings, so the algorithm must never change silently.

use crate::error::{ArchiveError, Result};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// Size of the read buffer used when streaming a file through the digest
pub const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Computes the content digest of a single file
///
/// Implementations must be deterministic: identical bytes always yield the
/// identical digest string. They are shared across hashing workers, hence
/// `Send + Sync`.
pub trait ContentHasher: Send + Sync {
    /// Hash the file at `path`
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::FileRead`] if the file cannot be opened or fully read
    fn hash(&self, path: &Path) -> Result<String>;

    /// Hash the file at `path`, giving up early once `cancel` is set
    ///
    /// The default implementation only checks the flag before starting.
    /// Streaming implementations should also check between chunks.
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::Cancelled`] if `cancel` was observed
    /// - [`ArchiveError::FileRead`] on I/O failure
    fn hash_cancellable(&self, path: &Path, cancel: &AtomicBool) -> Result<String> {
        if cancel.load(Ordering::Acquire) {
            return Err(ArchiveError::Cancelled);
        }
        self.hash(path)
    }
}

/// SHA-256 content hasher (the default)
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl fmt::Display for Sha256Hasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256")
    }
}

impl ContentHasher for Sha256Hasher {
    fn hash(&self, path: &Path) -> Result<String> {
        hash_file_content(path, None)
    }

    fn hash_cancellable(&self, path: &Path, cancel: &AtomicBool) -> Result<String> {
        hash_file_content(path, Some(cancel))
    }
}

/// Hash a file's content using SHA-256
///
/// Streams the file in [`HASH_BUFFER_SIZE`] chunks. When `cancel` is given
/// it is checked before opening the file and between chunks. The file handle
/// is dropped on every return path.
///
/// # Errors
///
/// - [`ArchiveError::FileRead`] if the file cannot be opened or read
/// - [`ArchiveError::Cancelled`] if `cancel` was set
pub fn hash_file_content(path: &Path, cancel: Option<&AtomicBool>) -> Result<String> {
    let is_cancelled = || cancel.is_some_and(|flag| flag.load(Ordering::Acquire));

    if is_cancelled() {
        return Err(ArchiveError::Cancelled);
    }

    let mut file = File::open(path).map_err(|e| ArchiveError::file_read(path, e))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];

    loop {
        if is_cancelled() {
            return Err(ArchiveError::Cancelled);
        }
        let bytes_read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ArchiveError::file_read(path, e)),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Hash in-memory data using SHA-256
///
/// Produces the same digest [`hash_file_content`] would for a file holding
/// exactly these bytes.
pub fn hash_data(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
