//! Hand-written fakes shared by the core tests.

use crate::{
    CaptureDevice, CaptureError, CaptureResult, CaptureSession, MicrophonePermission,
    PendingRecording, PermissionStatus, RecordingFileStore, SessionHandle, UploadOutcome,
    UploadTrigger, Uploader,
};

use std::{
    collections::VecDeque,
    panic::Location,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use error_location::ErrorLocation;
use uuid::Uuid;

/// Calls recorded by [`FakeDevice`] plus the failures it should inject.
#[derive(Debug)]
pub(crate) struct DeviceScript {
    pub(crate) calls: Vec<&'static str>,
    pub(crate) fail_configure: bool,
    pub(crate) fail_begin: bool,
    pub(crate) fail_reacquire: bool,
    pub(crate) fail_finalize: bool,
    pub(crate) power_db: f32,
}

impl Default for DeviceScript {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            fail_configure: false,
            fail_begin: false,
            fail_reacquire: false,
            fail_finalize: false,
            power_db: -80.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct DeviceControl(Arc<Mutex<DeviceScript>>);

impl DeviceControl {
    pub(crate) fn script(&self) -> MutexGuard<'_, DeviceScript> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.script().calls.clone()
    }

    pub(crate) fn count(&self, call: &str) -> usize {
        self.script().calls.iter().filter(|c| **c == call).count()
    }
}

/// Capture device that writes a small placeholder file instead of audio.
pub(crate) struct FakeDevice {
    control: DeviceControl,
}

impl FakeDevice {
    pub(crate) fn new() -> (Self, DeviceControl) {
        let control = DeviceControl::default();
        (
            Self {
                control: control.clone(),
            },
            control,
        )
    }
}

impl CaptureDevice for FakeDevice {
    #[track_caller]
    fn configure_session(&mut self) -> CaptureResult<()> {
        let mut script = self.control.script();
        script.calls.push("configure");
        if script.fail_configure {
            return Err(CaptureError::DeviceUnavailable {
                reason: "no input".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok(())
    }

    #[track_caller]
    fn begin(&mut self, output: &Path) -> CaptureResult<()> {
        let mut script = self.control.script();
        script.calls.push("begin");
        if script.fail_begin {
            return Err(CaptureError::DeviceUnavailable {
                reason: "input busy".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        std::fs::write(output, b"RIFF").map_err(|e| CaptureError::DeviceUnavailable {
            reason: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    fn suspend(&mut self) {
        self.control.script().calls.push("suspend");
    }

    #[track_caller]
    fn reacquire(&mut self) -> CaptureResult<()> {
        let mut script = self.control.script();
        script.calls.push("reacquire");
        if script.fail_reacquire {
            return Err(CaptureError::DeviceUnavailable {
                reason: "input held by call".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok(())
    }

    #[track_caller]
    fn finalize(&mut self) -> CaptureResult<()> {
        let mut script = self.control.script();
        script.calls.push("finalize");
        if script.fail_finalize {
            return Err(CaptureError::FinalizeFailed {
                reason: "disk full".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok(())
    }

    fn abort(&mut self) {
        self.control.script().calls.push("abort");
    }

    fn input_power_db(&self) -> f32 {
        self.control.script().power_db
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Permission gate with a scripted prompt answer. The answer sticks, like a platform grant.
pub(crate) struct ScriptedPermission {
    status: Mutex<PermissionStatus>,
    grant_on_request: bool,
    requests: AtomicUsize,
}

impl ScriptedPermission {
    pub(crate) fn new(status: PermissionStatus, grant_on_request: bool) -> Self {
        Self {
            status: Mutex::new(status),
            grant_on_request,
            requests: AtomicUsize::new(0),
        }
    }

    pub(crate) fn granted() -> Self {
        Self::new(PermissionStatus::Granted, true)
    }

    pub(crate) fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MicrophonePermission for ScriptedPermission {
    fn status(&self) -> PermissionStatus {
        *self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn request(&self) -> bool {
        self.requests.fetch_add(1, Ordering::SeqCst);
        *self.status.lock().unwrap_or_else(|e| e.into_inner()) = if self.grant_on_request {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        };
        self.grant_on_request
    }
}

/// Uploader that replays queued outcomes, then succeeds.
#[derive(Default)]
pub(crate) struct ScriptedUploader {
    outcomes: Mutex<VecDeque<UploadOutcome>>,
    attempts: Mutex<Vec<(Uuid, UploadTrigger)>>,
}

impl ScriptedUploader {
    pub(crate) fn with_outcomes(outcomes: impl IntoIterator<Item = UploadOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn attempts(&self) -> Vec<(Uuid, UploadTrigger)> {
        self.attempts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl Uploader for ScriptedUploader {
    async fn upload(&self, entry: &PendingRecording) -> UploadOutcome {
        self.attempts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((entry.id, entry.upload_trigger));
        self.outcomes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or(UploadOutcome::Success)
    }
}

/// An idle session over a [`FakeDevice`] storing files under `root`.
pub(crate) fn fake_session(
    root: &Path,
    permission: Arc<dyn MicrophonePermission>,
) -> (SessionHandle, DeviceControl, RecordingFileStore) {
    let files = RecordingFileStore::new(root);
    let (device, control) = FakeDevice::new();
    let session = CaptureSession::new(Box::new(device), permission, files.clone());
    (session.into_handle(), control, files)
}

/// A pending entry whose local file is `local_file_path`.
pub(crate) fn pending_entry(owner_id: &str, local_file_path: PathBuf) -> PendingRecording {
    let id = Uuid::new_v4();
    PendingRecording {
        id,
        owner_id: owner_id.to_string(),
        title: "Recording 2026-03-01 09:30".to_string(),
        created_at: Utc
            .with_ymd_and_hms(2026, 3, 1, 9, 30, 0)
            .single()
            .unwrap_or_default(),
        duration_minutes: Some(1.5),
        remote_destination_path: PendingRecording::remote_path_for(owner_id, id),
        local_file_path,
        upload_trigger: UploadTrigger::ExplicitStop,
    }
}
