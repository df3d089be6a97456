//! Persisted state between runs
//!
//! [`PersistedState`] is the durable record of one archive location: where
//! it is, which bucket it is uploaded to, and the fingerprint of its last
//! archived contents. [`StateStore`] reads and writes it as pretty-printed
//! JSON:
//!
//! ```text
//! {
//!   "Archive Location": "/home/jack/mybackupfolder",
//!   "S3 Bucket": "easyarchive-6f1c...",
//!   "Hashes": [
//!     { "Filename": "notes.txt", "Value": "9f86d0..." }
//!   ]
//! }
//! ```
//!
//! A missing state file is an unconfigured installation, not an error.

use crate::error::{ArchiveError, Result};
use crate::types::FingerprintSnapshot;
use crate::utils;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default state file name
pub const DEFAULT_STATE_FILE: &str = "config.json";

/// Prefix of generated bucket names
pub const BUCKET_PREFIX: &str = "easyarchive";

/// Durable record carried from one run to the next
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    /// Directory whose contents are fingerprinted and archived
    #[serde(rename = "Archive Location", default)]
    pub archive_location: PathBuf,
    /// Remote bucket the archives are uploaded to
    #[serde(rename = "S3 Bucket", default)]
    pub bucket_name: String,
    /// Fingerprint of the last archived contents
    #[serde(rename = "Hashes", default, deserialize_with = "null_as_empty")]
    pub hashes: FingerprintSnapshot,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<FingerprintSnapshot, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<FingerprintSnapshot>::deserialize(deserializer)?.unwrap_or_default())
}

impl PersistedState {
    /// State for a newly configured archive location
    ///
    /// The path is cleaned lexically and the fingerprint starts empty, so the
    /// first run after configuring always archives.
    pub fn configure(archive_location: &Path, bucket_name: impl Into<String>) -> Self {
        Self {
            archive_location: utils::clean_path(archive_location),
            bucket_name: bucket_name.into(),
            hashes: FingerprintSnapshot::empty(),
        }
    }

    /// Both the archive location and the bucket are set
    pub fn is_configured(&self) -> bool {
        !self.archive_location.as_os_str().is_empty() && !self.bucket_name.trim().is_empty()
    }

    /// Copy of this state with a new fingerprint
    pub fn with_hashes(&self, hashes: FingerprintSnapshot) -> Self {
        Self {
            archive_location: self.archive_location.clone(),
            bucket_name: self.bucket_name.clone(),
            hashes,
        }
    }
}

/// Where a state file stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveState {
    /// No usable archive location or bucket yet
    Unconfigured,
    /// Ready to fingerprint and archive
    Ready(PersistedState),
}

impl From<PersistedState> for ArchiveState {
    fn from(state: PersistedState) -> Self {
        if state.is_configured() {
            ArchiveState::Ready(state)
        } else {
            ArchiveState::Unconfigured
        }
    }
}

/// Generate a fresh bucket name of the form `easyarchive-<uuid>`
pub fn generate_bucket_name() -> String {
    format!("{}-{}", BUCKET_PREFIX, uuid::Uuid::new_v4())
}

/// Reads and writes [`PersistedState`] as a JSON file
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Store backed by the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted state
    ///
    /// A missing, empty, or unparsable file yields the default (unconfigured)
    /// state; unparsable content is logged.
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::Io`] if the file exists but cannot be read
    pub fn load(&self) -> Result<PersistedState> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No state file at {:?}", self.path);
                return Ok(PersistedState::default());
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(PersistedState::default());
        }

        match serde_json::from_str::<PersistedState>(&content) {
            Ok(state) => {
                debug!(
                    "Loaded state from {:?} ({} fingerprinted files)",
                    self.path,
                    state.hashes.len()
                );
                Ok(state)
            }
            Err(e) => {
                warn!("Ignoring unreadable state file {:?}: {}", self.path, e);
                Ok(PersistedState::default())
            }
        }
    }

    /// Load the state and classify it
    ///
    /// # Errors
    ///
    /// Same as [`StateStore::load`].
    pub fn load_archive_state(&self) -> Result<ArchiveState> {
        self.load().map(ArchiveState::from)
    }

    /// Persist `state`, replacing the file atomically
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::Json`] if serialization fails
    /// - [`ArchiveError::Io`] if the file cannot be written
    pub fn save(&self, state: &PersistedState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(state)?;
        utils::atomic_write(&self.path, json.as_bytes())?;
        info!(
            "Saved state to {:?} ({} fingerprinted files)",
            self.path,
            state.hashes.len()
        );
        Ok(())
    }

    /// Record a new archive location and bucket, clearing the fingerprint
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::InvalidConfiguration`] if the path or bucket is empty
    /// - Any error from [`StateStore::save`]
    pub fn configure(&self, archive_location: &Path, bucket_name: &str) -> Result<PersistedState> {
        if archive_location.as_os_str().is_empty() {
            return Err(ArchiveError::InvalidConfiguration(
                "archive location is empty".to_string(),
            ));
        }
        if bucket_name.trim().is_empty() {
            return Err(ArchiveError::InvalidConfiguration(
                "bucket name is empty".to_string(),
            ));
        }

        let state = PersistedState::configure(archive_location, bucket_name.trim());
        self.save(&state)?;
        info!("Archive path set to {:?}", state.archive_location);
        Ok(state)
    }
}
