//! Utility functions for easyarchive
//!
//! Small filesystem and formatting helpers shared by the collector, the state
//! store and the CLI:
//!
//! - Atomic file writing for the persisted state
//! - Snapshot keys for collected files (base name or relative path)
//! - Lexical path cleaning for configured archive locations
//! - Human-readable sizes for progress output
//!
//! All functions are thread-safe and can be called concurrently.

use crate::error::{ArchiveError, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Snapshot key for a collected file
///
/// In flat mode the key is the file's base name. In recursive mode it is the
/// path relative to `root`, joined with `/` on every platform so persisted
/// snapshots compare equal across operating systems.
///
/// Names are never converted lossily: two distinct non-UTF-8 names would
/// otherwise collapse into the same key.
///
/// # Errors
///
/// - [`ArchiveError::InvalidFileName`] if any keyed component is not valid UTF-8
/// - [`ArchiveError::Internal`] if `path` has no file name or is not under `root`
pub fn snapshot_key(path: &Path, root: &Path, recursive: bool) -> Result<String> {
    let invalid = || ArchiveError::InvalidFileName {
        path: path.to_path_buf(),
    };

    if !recursive {
        let name = path
            .file_name()
            .ok_or_else(|| ArchiveError::internal(format!("Path {:?} has no file name", path)))?;
        return name.to_str().map(str::to_owned).ok_or_else(invalid);
    }

    let relative = path.strip_prefix(root).map_err(|_| {
        ArchiveError::internal(format!("Path {:?} is not relative to {:?}", path, root))
    })?;

    let parts = relative
        .components()
        .map(|c| c.as_os_str().to_str().ok_or_else(invalid))
        .collect::<Result<Vec<&str>>>()?;
    Ok(parts.join("/"))
}

/// Lexically clean a path
///
/// Removes `.` components and resolves `..` against preceding normal
/// components without touching the filesystem. An empty result becomes `.`.
///
/// ```rust,ignore
/// assert_eq!(clean_path(Path::new("backups/./docs/../")), PathBuf::from("backups"));
/// ```
pub fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    cleaned.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    cleaned.pop();
                } else if !matches!(
                    cleaned.components().next_back(),
                    Some(Component::RootDir) | Some(Component::Prefix(_))
                ) {
                    cleaned.push("..");
                }
            }
            other => cleaned.push(other.as_os_str()),
        }
    }

    if cleaned.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        cleaned
    }
}

/// Human-readable size, e.g. `"3.4 MiB"`
///
/// Exact byte counts below 1 KiB; one decimal above.
pub fn format_bytes(bytes: u64) -> String {
    const STEPS: [(u64, &str); 4] = [
        (1 << 40, "TiB"),
        (1 << 30, "GiB"),
        (1 << 20, "MiB"),
        (1 << 10, "KiB"),
    ];

    STEPS
        .iter()
        .find(|(scale, _)| bytes >= *scale)
        .map(|(scale, unit)| format!("{:.1} {}", bytes as f64 / *scale as f64, unit))
        .unwrap_or_else(|| format!("{} B", bytes))
}

/// Atomic file write (write to temp file then rename)
///
/// The target is either left untouched or fully replaced; readers never see
/// a partially written state file.
///
/// # Errors
///
/// - [`ArchiveError::Io`] if writing the temporary file or the rename fails
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");

    fs::write(&temp_path, content)?;

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }

    Ok(())
}
