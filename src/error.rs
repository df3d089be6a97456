//! Error types for easyarchive
//!
//! Every fallible operation in the crate returns [`Result`], whose error type
//! [`ArchiveError`] separates the two failures the fingerprinting core can
//! produce from the failures of the collaborators around it:
//!
//! - [`ArchiveError::Directory`]: the collection root could not be enumerated
//! - [`ArchiveError::FileRead`]: a file could not be fully read while hashing
//!
//! Both are fatal to a collection run and are never retried internally.

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the easyarchive library
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Main error type for all easyarchive operations
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The collection root is missing, not a directory, or unreadable
    #[error("Cannot enumerate directory {path:?}: {source}")]
    Directory {
        /// Root that failed to enumerate
        path: PathBuf,
        /// Underlying I/O failure
        source: std::io::Error,
    },

    /// A file could not be opened or fully read while hashing
    #[error("Failed to read {path:?}: {source}")]
    FileRead {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O failure
        source: std::io::Error,
    },

    /// I/O errors outside of collection (state file, bundles)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A file name cannot be used as a snapshot key
    #[error("File name {path:?} is not valid UTF-8")]
    InvalidFileName {
        /// File whose name was rejected
        path: PathBuf,
    },

    /// Errors from the zip writer
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Thread pool error
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// The archive location or bucket has not been set
    #[error("Archive location and bucket are not configured")]
    NotConfigured,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Bundle construction failed
    #[error("Archive error: {0}")]
    Archive(String),

    /// Upload to the remote store failed
    #[error("Upload error: {0}")]
    Upload(String),

    /// Hashing was abandoned because another worker already failed
    #[error("Hashing cancelled")]
    Cancelled,

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ArchiveError {
    /// Create a directory enumeration error
    pub fn directory(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArchiveError::Directory {
            path: path.into(),
            source,
        }
    }

    /// Create a file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArchiveError::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Create an archive error with a custom message
    pub fn archive(msg: impl Into<String>) -> Self {
        ArchiveError::Archive(msg.into())
    }

    /// Create an upload error with a custom message
    pub fn upload(msg: impl Into<String>) -> Self {
        ArchiveError::Upload(msg.into())
    }

    /// Create an internal error with a custom message
    pub fn internal(msg: impl Into<String>) -> Self {
        ArchiveError::Internal(msg.into())
    }

    /// Check if this error aborted a fingerprint collection
    pub fn is_collection_failure(&self) -> bool {
        matches!(
            self,
            ArchiveError::Directory { .. }
                | ArchiveError::FileRead { .. }
                | ArchiveError::InvalidFileName { .. }
                | ArchiveError::ThreadPool(_)
        )
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            ArchiveError::NotConfigured => {
                "No archive location is set. Run 'easyarchive init --archive-path <DIR>' first."
                    .to_string()
            }
            ArchiveError::Directory { path, .. } => {
                format!(
                    "Cannot read archive directory {:?}. Check that it exists and is readable.",
                    path
                )
            }
            ArchiveError::FileRead { path, .. } => {
                format!(
                    "Could not read {:?} while fingerprinting. Nothing was archived and the saved state is unchanged.",
                    path
                )
            }
            ArchiveError::InvalidFileName { path } => {
                format!(
                    "{:?} has a name that is not valid UTF-8. Rename it so it can be fingerprinted.",
                    path
                )
            }
            _ => self.to_string(),
        }
    }
}
