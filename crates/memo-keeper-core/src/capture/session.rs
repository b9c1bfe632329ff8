use crate::{
    CaptureError, CaptureResult, RecordingFileStore,
    capture::{
        CaptureDevice, MicrophonePermission, PermissionStatus, SessionSnapshot, SessionState,
        level::normalize_db,
    },
};

use std::{
    panic::Location,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use chrono::{DateTime, Utc};
use error_location::ErrorLocation;
use tokio::{sync::Mutex, time::Instant};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Shared, injected handle to the single capture session.
///
/// The coordinator, the interruption monitor and the level meter all hold a
/// clone; every state change goes through this one mutex.
pub type SessionHandle = Arc<Mutex<CaptureSession>>;

/// A closed capture file returned by [`CaptureSession::stop`].
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedRecording {
    /// Identifier assigned when the session started.
    pub id: Uuid,
    /// Absolute path of the finalized file.
    pub path: PathBuf,
    /// Wall-clock time the session started.
    pub created_at: DateTime<Utc>,
    /// Captured time, excluding paused intervals.
    pub duration: Duration,
}

#[derive(Debug)]
struct ActiveOutput {
    id: Uuid,
    path: PathBuf,
    created_at: DateTime<Utc>,
}

/// Owns the microphone and the recording state machine.
///
/// `Idle -> Recording -> {Paused <-> Recording} -> Idle`. `started_at` is set
/// exactly while `Recording`; `accumulated` only grows within a session and is
/// reset by the next `start()`.
pub struct CaptureSession {
    device: Box<dyn CaptureDevice>,
    permission: Arc<dyn MicrophonePermission>,
    files: RecordingFileStore,
    state: SessionState,
    started_at: Option<Instant>,
    accumulated: Duration,
    input_level: f32,
    output: Option<ActiveOutput>,
    auto_paused: bool,
}

impl CaptureSession {
    /// Create an idle session around a device and permission gate.
    pub fn new(
        device: Box<dyn CaptureDevice>,
        permission: Arc<dyn MicrophonePermission>,
        files: RecordingFileStore,
    ) -> Self {
        Self {
            device,
            permission,
            files,
            state: SessionState::Idle,
            started_at: None,
            accumulated: Duration::ZERO,
            input_level: 0.0,
            output: None,
            auto_paused: false,
        }
    }

    /// Wrap the session in the shared [`SessionHandle`].
    pub fn into_handle(self) -> SessionHandle {
        Arc::new(Mutex::new(self))
    }

    /// Start a new session and return its recording id.
    ///
    /// Never prompts: microphone access must already be granted, which
    /// [`RecordingCoordinator::start`](crate::RecordingCoordinator::start)
    /// arranges without holding the session lock. Any failure leaves the
    /// session `Idle`.
    ///
    /// # Errors
    ///
    /// `AlreadyActive` outside `Idle`, `PermissionDenied` unless access is
    /// granted, `DeviceUnavailable` when the input or output file cannot be
    /// opened.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn start(&mut self) -> CaptureResult<Uuid> {
        if self.state != SessionState::Idle {
            return Err(CaptureError::AlreadyActive {
                state: self.state,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let status = self.permission.status();
        if status != PermissionStatus::Granted {
            warn!(?status, "Microphone access not granted, start refused");
            return Err(CaptureError::PermissionDenied {
                location: ErrorLocation::from(Location::caller()),
            });
        }

        self.device.configure_session()?;

        let id = Uuid::new_v4();
        let created_at = Utc::now();
        let path = self
            .files
            .new_recording_path(id, created_at)
            .map_err(|e| CaptureError::DeviceUnavailable {
                reason: format!("Failed to allocate output file: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        self.device.begin(&path)?;

        self.accumulated = Duration::ZERO;
        self.started_at = Some(Instant::now());
        self.input_level = 0.0;
        self.auto_paused = false;
        self.output = Some(ActiveOutput {
            id,
            path: path.clone(),
            created_at,
        });
        self.state = SessionState::Recording;

        info!(recording_id = %id, output = ?path, "Recording started");

        Ok(id)
    }

    /// Pause at the user's request. Returns `false` when there is nothing to pause.
    ///
    /// Pausing a session that an interruption already paused hands the pause
    /// to the user: it will no longer auto-resume.
    #[instrument(skip(self))]
    pub fn pause(&mut self) -> bool {
        if self.state == SessionState::Paused && self.auto_paused {
            self.auto_paused = false;
            info!(
                recording_id = ?self.recording_id(),
                "Interruption pause taken over by user, auto-resume cancelled"
            );
            return true;
        }
        self.suspend(false)
    }

    /// Pause on behalf of a system interruption, marking the session for auto-resume.
    #[instrument(skip(self))]
    pub fn pause_for_interruption(&mut self) -> bool {
        self.suspend(true)
    }

    /// Resume a paused session. Returns `Ok(false)` when not paused.
    ///
    /// # Errors
    ///
    /// `ResumeFailed` when the input cannot be re-acquired; the session stays `Paused`.
    #[instrument(skip(self))]
    pub fn resume(&mut self) -> CaptureResult<bool> {
        if self.state != SessionState::Paused {
            debug!(state = %self.state, "Resume ignored");
            return Ok(false);
        }

        if let Err(e) = self.device.reacquire() {
            warn!(error = %e, "Failed to re-acquire input, staying paused");
            return Err(CaptureError::ResumeFailed {
                reason: e.to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        self.started_at = Some(Instant::now());
        self.auto_paused = false;
        self.state = SessionState::Recording;

        info!(
            recording_id = ?self.recording_id(),
            accumulated_ms = self.accumulated.as_millis(),
            "Recording resumed"
        );

        Ok(true)
    }

    /// Finalize the output file and return to `Idle`.
    ///
    /// Returns `Ok(None)` when no session is active, so racing stop requests
    /// are harmless. The file is closed before the state becomes `Idle`.
    ///
    /// # Errors
    ///
    /// `FinalizeFailed` when the file could not be closed cleanly. The session
    /// is `Idle` afterwards either way.
    #[instrument(skip(self))]
    pub fn stop(&mut self) -> CaptureResult<Option<FinishedRecording>> {
        if self.state == SessionState::Idle {
            debug!("Stop requested with no active session");
            return Ok(None);
        }

        self.fold_open_run();
        let output = self.output.take();
        let finalized = self.device.finalize();

        self.state = SessionState::Idle;
        self.input_level = 0.0;
        self.auto_paused = false;

        finalized.map_err(|e| {
            error!(error = %e, output = ?output.as_ref().map(|o| &o.path), "Finalize failed");
            CaptureError::FinalizeFailed {
                reason: e.to_string(),
                location: ErrorLocation::from(Location::caller()),
            }
        })?;

        let Some(output) = output else {
            return Ok(None);
        };

        info!(
            recording_id = %output.id,
            duration_ms = self.accumulated.as_millis(),
            output = ?output.path,
            "Recording stopped"
        );

        Ok(Some(FinishedRecording {
            id: output.id,
            path: output.path,
            created_at: output.created_at,
            duration: self.accumulated,
        }))
    }

    /// Abort after a media-service reset.
    ///
    /// Tears the input down without finalizing, discards the partial file,
    /// returns to `Idle` and reconfigures the audio session for later use.
    /// Returns `false` when there was no session to abort.
    #[instrument(skip(self))]
    pub fn hard_reset(&mut self) -> bool {
        if self.state == SessionState::Idle {
            if let Err(e) = self.device.configure_session() {
                warn!(error = %e, "Audio session reconfiguration failed after reset");
            }
            return false;
        }

        self.device.abort();
        self.fold_open_run();
        let output = self.output.take();

        self.state = SessionState::Idle;
        self.input_level = 0.0;
        self.auto_paused = false;

        if let Some(output) = output {
            error!(
                recording_id = %output.id,
                captured_ms = self.accumulated.as_millis(),
                "Media services reset; in-progress recording abandoned"
            );
            if let Err(e) = self.files.remove_recording(&output.path) {
                warn!(error = %e, output = ?output.path, "Failed to discard abandoned recording");
            }
        }

        if let Err(e) = self.device.configure_session() {
            warn!(error = %e, "Audio session reconfiguration failed after reset");
        }

        true
    }

    /// Re-apply the audio session after a route change. Best-effort.
    #[instrument(skip(self))]
    pub fn reapply_route(&mut self) -> bool {
        if self.state != SessionState::Recording {
            return false;
        }

        match self.device.configure_session() {
            Ok(()) => {
                debug!("Audio session re-applied after route change");
                true
            }
            Err(e) => {
                warn!(error = %e, "Route change reconfiguration failed, continuing");
                false
            }
        }
    }

    /// Refresh `input_level` from the device. Forced to 0 unless recording.
    pub fn sample_level(&mut self) {
        self.input_level = match self.state {
            SessionState::Recording => normalize_db(self.device.input_power_db()),
            SessionState::Paused | SessionState::Idle => 0.0,
        };
    }

    /// Captured time, excluding pauses.
    pub fn elapsed(&self) -> Duration {
        self.accumulated + self.started_at.map(|t| t.elapsed()).unwrap_or_default()
    }

    /// The permission gate `start()` consults.
    pub fn permission(&self) -> Arc<dyn MicrophonePermission> {
        Arc::clone(&self.permission)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Most recent normalized input level.
    pub fn input_level(&self) -> f32 {
        self.input_level
    }

    /// Whether the current pause came from a system interruption.
    pub fn is_auto_paused(&self) -> bool {
        self.auto_paused
    }

    /// Id of the active recording, if any.
    pub fn recording_id(&self) -> Option<Uuid> {
        self.output.as_ref().map(|o| o.id)
    }

    /// Path of the in-progress output file, if any.
    pub fn output_path(&self) -> Option<&Path> {
        self.output.as_ref().map(|o| o.path.as_path())
    }

    /// Status view for displays.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            elapsed: self.elapsed(),
            input_level: self.input_level,
            auto_paused: self.auto_paused,
        }
    }

    fn suspend(&mut self, interruption: bool) -> bool {
        if self.state != SessionState::Recording {
            debug!(state = %self.state, "Pause ignored");
            return false;
        }

        self.fold_open_run();
        self.device.suspend();
        self.input_level = 0.0;
        self.auto_paused = interruption;
        self.state = SessionState::Paused;

        info!(
            recording_id = ?self.recording_id(),
            accumulated_ms = self.accumulated.as_millis(),
            interruption,
            "Recording paused"
        );

        true
    }

    fn fold_open_run(&mut self) {
        if let Some(started_at) = self.started_at.take() {
            self.accumulated += started_at.elapsed();
        }
    }
}
