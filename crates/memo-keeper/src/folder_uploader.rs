//! Development uploader that copies recordings into a local folder.

use memo_keeper_core::{PendingRecording, UploadOutcome, Uploader};

use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use async_trait::async_trait;
use tracing::{debug, instrument};

/// Mirrors the remote object store under `remote_root`.
///
/// Writes go to a temporary name and are renamed into place, so a repeated
/// upload of the same entry replaces the object atomically.
#[derive(Debug, Clone)]
pub struct FolderUploader {
    remote_root: PathBuf,
}

impl FolderUploader {
    /// Uploader rooted at `remote_root`.
    pub fn new(remote_root: impl Into<PathBuf>) -> Self {
        Self {
            remote_root: remote_root.into(),
        }
    }

    /// Where `remote_path` lands, or `None` if it would escape the root.
    pub fn destination_for(&self, remote_path: &str) -> Option<PathBuf> {
        let relative = Path::new(remote_path);
        let contained = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        (contained && !remote_path.is_empty()).then(|| self.remote_root.join(relative))
    }
}

#[async_trait]
impl Uploader for FolderUploader {
    #[instrument(skip_all, fields(recording_id = %entry.id))]
    async fn upload(&self, entry: &PendingRecording) -> UploadOutcome {
        let Some(destination) = self.destination_for(&entry.remote_destination_path) else {
            return UploadOutcome::PermanentFailure {
                reason: format!(
                    "Invalid remote path {:?}",
                    entry.remote_destination_path
                ),
            };
        };

        match tokio::fs::metadata(&entry.local_file_path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return UploadOutcome::PermanentFailure {
                    reason: format!("{:?} is not a file", entry.local_file_path),
                };
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return UploadOutcome::PermanentFailure {
                    reason: format!("Local file {:?} is missing", entry.local_file_path),
                };
            }
            Err(e) => {
                return UploadOutcome::RetryableFailure {
                    reason: format!("Cannot read {:?}: {}", entry.local_file_path, e),
                };
            }
        }

        if let Some(parent) = destination.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            return UploadOutcome::RetryableFailure {
                reason: format!("Cannot create {:?}: {}", parent, e),
            };
        }

        let partial = destination.with_extension("partial");
        if let Err(e) = tokio::fs::copy(&entry.local_file_path, &partial).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return UploadOutcome::RetryableFailure {
                reason: format!("Copy failed: {}", e),
            };
        }

        if let Err(e) = tokio::fs::rename(&partial, &destination).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return UploadOutcome::RetryableFailure {
                reason: format!("Publish failed: {}", e),
            };
        }

        debug!(destination = ?destination, "Recording copied to remote folder");

        UploadOutcome::Success
    }
}
