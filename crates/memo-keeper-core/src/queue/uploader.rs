use crate::PendingRecording;

use async_trait::async_trait;

/// Result of one upload attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The remote store confirmed the object.
    Success,
    /// Transient failure; the entry stays queued for a later attempt.
    RetryableFailure {
        /// Description of the failure.
        reason: String,
    },
    /// The recording can never be uploaded; the entry and file are dropped.
    PermanentFailure {
        /// Description of the failure, reported to the user.
        reason: String,
    },
}

/// Remote object store client.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Upload `entry.local_file_path` to `entry.remote_destination_path`.
    ///
    /// Must be idempotent per `entry.id`; the same entry may be submitted again
    /// after a restart.
    async fn upload(&self, entry: &PendingRecording) -> UploadOutcome;
}
