use crate::{StoreError, StoreResult};

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};
use uuid::Uuid;

const RECORDINGS_DIR: &str = "recordings";
const MANIFEST_FILE: &str = "pending-uploads.json";
const MAILBOX_FILE: &str = "mailbox.json";
const MAILBOX_LOCK_FILE: &str = "mailbox.lock";
const CACHEDIR_TAG_FILE: &str = "CACHEDIR.TAG";

/// First line of a Cache Directory Tagging Specification tag file.
pub const CACHEDIR_TAG_SIGNATURE: &str = "Signature: 8a477f597d28d172789f06886806bc55";

/// Filesystem layout for capture output, the upload manifest and the mailbox.
///
/// ```text
/// <root>/
///   CACHEDIR.TAG
///   recordings/<YYYYmmdd_HHMMSS>_<uuid>.wav
///   pending-uploads.json
///   mailbox.json
///   mailbox.lock
/// ```
#[derive(Debug, Clone)]
pub struct RecordingFileStore {
    root: PathBuf,
}

impl RecordingFileStore {
    /// Store rooted at `root`. Nothing is created until [`Self::ensure_layout`].
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Data root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding capture files.
    pub fn recordings_dir(&self) -> PathBuf {
        self.root.join(RECORDINGS_DIR)
    }

    /// Pending-upload manifest.
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// Cross-process control mailbox document.
    pub fn mailbox_path(&self) -> PathBuf {
        self.root.join(MAILBOX_FILE)
    }

    /// Lock file guarding the mailbox.
    pub fn mailbox_lock_path(&self) -> PathBuf {
        self.root.join(MAILBOX_LOCK_FILE)
    }

    /// Create the directory tree and tag the root as excluded from backups.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` when a directory or the tag file cannot be written.
    #[instrument(skip(self), fields(root = ?self.root))]
    pub fn ensure_layout(&self) -> StoreResult<()> {
        let recordings = self.recordings_dir();
        fs::create_dir_all(&recordings).map_err(|e| StoreError::io(&recordings, e))?;

        let tag = self.root.join(CACHEDIR_TAG_FILE);
        if !tag.exists() {
            let contents = format!(
                "{}\n# This file is a cache directory tag created by memo-keeper.\n\
                 # Recordings here are uploaded and removed automatically.\n",
                CACHEDIR_TAG_SIGNATURE
            );
            fs::write(&tag, contents).map_err(|e| StoreError::io(&tag, e))?;
            info!("Data directory tagged for backup exclusion");
        }

        Ok(())
    }

    /// Allocate the path for a new capture file. The file itself is not created.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` when the recordings directory cannot be created.
    pub fn new_recording_path(&self, id: Uuid, created_at: DateTime<Utc>) -> StoreResult<PathBuf> {
        let dir = self.recordings_dir();
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

        let name = format!("{}_{}.wav", created_at.format("%Y%m%d_%H%M%S"), id);
        Ok(dir.join(name))
    }

    /// Whether a capture file is present on disk.
    pub fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    /// Delete a capture file. Returns `Ok(false)` when it was already gone.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` for any failure other than the file being absent.
    pub fn remove_recording(&self, path: &Path) -> StoreResult<bool> {
        match fs::remove_file(path) {
            Ok(()) => {
                debug!(path = ?path, "Recording file removed");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }
}
