//! Archive and upload collaborators
//!
//! The fingerprinting core only decides *whether* to archive. Building the
//! bundle and shipping it somewhere sit behind two small traits so the
//! orchestrator can be driven by any backend:
//!
//! - [`Archiver`]: bundle a list of files from the archive root
//! - [`Uploader`]: ship a bundle to a named bucket
//!
//! The bundled implementations work on the local filesystem.
//! [`StagingArchiver`] writes one deflate-compressed zip named after the
//! current date (`DD-MM-YYYY.zip`), with entries named by snapshot key, and
//! [`LocalUploader`] copies that file into `<remote_root>/<bucket>/`.

use crate::error::{ArchiveError, Result};
use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Extension of bundles written by [`StagingArchiver`]
pub const BUNDLE_EXTENSION: &str = "zip";

/// Bundles files from the archive root
pub trait Archiver: Send + Sync {
    /// Bundle `filenames` (snapshot keys relative to `root`) and return the
    /// location of the bundle
    ///
    /// # Errors
    ///
    /// Any failure must leave the persisted state untouched; the orchestrator
    /// only saves after both archiving and uploading succeed.
    fn archive(&self, root: &Path, filenames: &[String]) -> Result<PathBuf>;
}

/// Ships a bundle to remote storage
pub trait Uploader: Send + Sync {
    /// Upload `archive` into `bucket`
    fn upload(&self, bucket: &str, archive: &Path) -> Result<()>;
}

/// Name for a bundle created now, `DD-MM-YYYY`
pub fn bundle_name() -> String {
    Local::now().format("%d-%m-%Y").to_string()
}

/// Resolve a snapshot key to a path under `root`
fn key_to_path(root: &Path, key: &str) -> Result<PathBuf> {
    let mut path = root.to_path_buf();
    for part in key.split('/') {
        if part.is_empty() || part == "." || part == ".." {
            return Err(ArchiveError::archive(format!("Invalid file key {:?}", key)));
        }
        path.push(part);
    }
    Ok(path)
}

/// Delete a partly written file, keeping the original error
fn discard_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Could not remove partial file {:?}: {}", path, e);
        }
    }
}

/// Writes each run's files into a dated zip
#[derive(Debug, Clone)]
pub struct StagingArchiver {
    output_dir: PathBuf,
}

impl StagingArchiver {
    /// Archiver writing bundles under `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Claim the first free bundle: `DD-MM-YYYY.zip`, then `DD-MM-YYYY-1.zip`, ...
    fn create_bundle(&self) -> Result<(PathBuf, File)> {
        fs::create_dir_all(&self.output_dir)?;
        let base = bundle_name();

        let mut suffix = 0;
        loop {
            let name = match suffix {
                0 => format!("{}.{}", base, BUNDLE_EXTENSION),
                n => format!("{}-{}.{}", base, n, BUNDLE_EXTENSION),
            };
            let candidate = self.output_dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(file) => return Ok((candidate, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => suffix += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn write_entries(file: File, root: &Path, filenames: &[String]) -> Result<u64> {
        let mut zip = ZipWriter::new(BufWriter::new(file));
        let mut bytes = 0;

        for name in filenames {
            let source = key_to_path(root, name)?;
            let mut input = File::open(&source).map_err(|e| {
                ArchiveError::archive(format!("Failed to add {:?} to bundle: {}", source, e))
            })?;
            let size = input.metadata()?.len();

            let options = SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .large_file(size >= u64::from(u32::MAX));
            zip.start_file(name.as_str(), options)?;
            bytes += io::copy(&mut input, &mut zip)?;
        }

        zip.finish()?.flush()?;
        Ok(bytes)
    }
}

impl Archiver for StagingArchiver {
    fn archive(&self, root: &Path, filenames: &[String]) -> Result<PathBuf> {
        let (bundle, file) = self.create_bundle()?;

        let bytes = match Self::write_entries(file, root, filenames) {
            Ok(bytes) => bytes,
            Err(e) => {
                discard_partial(&bundle);
                return Err(e);
            }
        };

        info!(
            "Zipped {} files ({} bytes) into {:?}",
            filenames.len(),
            bytes,
            bundle
        );
        Ok(bundle)
    }
}

/// Copies bundles into a local directory per bucket
#[derive(Debug, Clone)]
pub struct LocalUploader {
    remote_root: PathBuf,
}

impl LocalUploader {
    /// Uploader writing into `remote_root/<bucket>/`
    pub fn new(remote_root: impl Into<PathBuf>) -> Self {
        Self {
            remote_root: remote_root.into(),
        }
    }

    /// Directory holding the uploads of `bucket`
    pub fn bucket_dir(&self, bucket: &str) -> PathBuf {
        self.remote_root.join(bucket)
    }
}

impl Uploader for LocalUploader {
    fn upload(&self, bucket: &str, archive: &Path) -> Result<()> {
        if bucket.is_empty() || bucket.contains(['/', '\\']) {
            return Err(ArchiveError::upload(format!("Invalid bucket name {:?}", bucket)));
        }
        if !archive.is_file() {
            return Err(ArchiveError::upload(format!("Bundle {:?} is not a file", archive)));
        }
        let name = archive
            .file_name()
            .ok_or_else(|| ArchiveError::upload(format!("Bundle {:?} has no name", archive)))?;

        let bucket_dir = self.bucket_dir(bucket);
        fs::create_dir_all(&bucket_dir)
            .map_err(|e| ArchiveError::upload(format!("Unable to create bucket {:?}: {}", bucket, e)))?;

        let target = bucket_dir.join(name);
        debug!("Uploading {:?} to {:?}", archive, target);

        let bytes = match fs::copy(archive, &target) {
            Ok(bytes) => bytes,
            Err(e) => {
                discard_partial(&target);
                return Err(ArchiveError::upload(format!(
                    "Unable to upload {:?} to {:?}: {}",
                    archive, bucket, e
                )));
            }
        };

        info!("Uploaded {:?} to {:?} ({} bytes)", name, bucket, bytes);
        Ok(())
    }
}
