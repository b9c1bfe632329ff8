use crate::{FinishedRecording, queue::manifest::timestamp};

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why an entry is being handed to the uploader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UploadTrigger {
    /// The user stopped the recording.
    ExplicitStop,
    /// Found in the manifest on process start.
    RecoveredAfterRestart,
    /// A previous attempt failed with a retryable error.
    Retry,
}

/// A finished recording awaiting confirmed upload.
///
/// The entry exists from the moment capture stops until the uploader removes
/// it, and the local file is never deleted while it does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRecording {
    /// Assigned when capture started; the idempotency key for re-submission.
    pub id: Uuid,
    /// Account the recording belongs to. The manifest is partitioned by it.
    pub owner_id: String,
    /// Display title.
    pub title: String,
    /// When capture started.
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    /// Captured length, absent until known.
    #[serde(default)]
    pub duration_minutes: Option<f64>,
    /// Object key in the remote store.
    pub remote_destination_path: String,
    /// Finalized capture file.
    pub local_file_path: PathBuf,
    /// Why the entry was last submitted.
    pub upload_trigger: UploadTrigger,
}

impl PendingRecording {
    /// Build the durable entry for a file `stop()` just closed.
    pub fn from_finished(
        finished: &FinishedRecording,
        owner_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        let owner_id = owner_id.into();
        Self {
            id: finished.id,
            remote_destination_path: Self::remote_path_for(&owner_id, finished.id),
            owner_id,
            title: title.into(),
            created_at: finished.created_at,
            duration_minutes: Some(finished.duration.as_secs_f64() / 60.0),
            local_file_path: finished.path.clone(),
            upload_trigger: UploadTrigger::ExplicitStop,
        }
    }

    /// Object key the recording is uploaded under.
    pub fn remote_path_for(owner_id: &str, id: Uuid) -> String {
        format!("{}/recordings/{}.wav", owner_id, id)
    }

    /// Same entry with a different trigger.
    pub fn with_trigger(mut self, trigger: UploadTrigger) -> Self {
        self.upload_trigger = trigger;
        self
    }
}
