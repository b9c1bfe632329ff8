//! Memo-keeper Core Library
//!
//! Recording lifecycle and durable upload handoff: a capture session that
//! survives interruptions, a crash-safe pending-upload queue and a
//! cross-process control mailbox.
//!
//! # Example
//!
//! ```no_run
//! use memo_keeper_core::{
//!     CaptureSession, CpalCaptureDevice, DesktopPermission, PendingUploadQueue,
//!     RecordingCoordinator, RecordingFileStore,
//! };
//!
//! use std::{sync::Arc, time::Duration};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let files = RecordingFileStore::new("/tmp/memo-keeper");
//! files.ensure_layout()?;
//!
//! let session = CaptureSession::new(
//!     Box::new(CpalCaptureDevice::new(None)),
//!     Arc::new(DesktopPermission),
//!     files.clone(),
//! )
//! .into_handle();
//! let queue = Arc::new(PendingUploadQueue::new(files.manifest_path()));
//! let (upload_tx, _upload_rx) = tokio::sync::mpsc::channel(16);
//!
//! let coordinator = RecordingCoordinator::new(session, queue, upload_tx, "owner", "Recording");
//! coordinator.start().await?;
//! tokio::time::sleep(Duration::from_secs(3)).await;
//! let pending = coordinator.stop().await?;
//!
//! println!("Queued: {:?}", pending.map(|p| p.id));
//! # Ok(())
//! # }
//! ```

mod capture;
mod coordinator;
mod error;
mod inbox;
mod interruption;
mod queue;
mod relay;
mod storage;

pub use {
    capture::{
        CaptureDevice, CaptureSession, CpalCaptureDevice, DesktopPermission, FinishedRecording,
        METER_INTERVAL, MicrophonePermission, PermissionStatus, SessionHandle, SessionSnapshot,
        SessionState, ensure_microphone_access, normalize_db, spawn_level_meter,
    },
    coordinator::RecordingCoordinator,
    error::{CaptureError, CaptureResult, StoreError, StoreResult},
    inbox::{FailureInbox, Inbox, RouteInbox},
    interruption::{InterruptionEvent, InterruptionMonitor, InterruptionOutcome, RouteChangeReason},
    queue::{
        FailedUpload, MANIFEST_VERSION, PendingRecording, PendingUploadQueue, SubmitOutcome,
        UploadOutcome, UploadPipeline, UploadReport, UploadTrigger, Uploader, read_manifest,
        write_manifest,
    },
    relay::{
        ControlAction, ControlMailbox, ControlMailboxEntry, FileMailbox, RemoteControlRelay,
        RouteAction,
    },
    storage::{CACHEDIR_TAG_SIGNATURE, RecordingFileStore},
};

#[cfg(test)]
mod tests;
