use crate::{
    CaptureResult, ControlAction, ControlMailboxEntry, PendingRecording, PendingUploadQueue,
    RouteAction, RouteInbox, SessionHandle, SessionSnapshot, SessionState,
    ensure_microphone_access,
};

use std::sync::Arc;

use chrono::Local;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Single control path for UI and relay commands.
///
/// Owns the handoff from a stopped session to the upload queue: the entry is
/// made durable before it is given to the upload worker.
pub struct RecordingCoordinator {
    session: SessionHandle,
    queue: Arc<PendingUploadQueue>,
    upload_tx: mpsc::Sender<PendingRecording>,
    routes: RouteInbox,
    owner_id: String,
    title_prefix: String,
}

impl RecordingCoordinator {
    /// Coordinator for `owner_id`'s recordings.
    pub fn new(
        session: SessionHandle,
        queue: Arc<PendingUploadQueue>,
        upload_tx: mpsc::Sender<PendingRecording>,
        owner_id: impl Into<String>,
        title_prefix: impl Into<String>,
    ) -> Self {
        Self {
            session,
            queue,
            upload_tx,
            routes: RouteInbox::new(),
            owner_id: owner_id.into(),
            title_prefix: title_prefix.into(),
        }
    }

    /// Start a new recording, prompting for microphone access if needed.
    ///
    /// The prompt is awaited without the session lock, so status, metering and
    /// interruption handling keep running while it is open.
    ///
    /// # Errors
    ///
    /// Any [`crate::CaptureError`] from the permission gate or the session;
    /// nothing is queued.
    #[instrument(skip(self))]
    pub async fn start(&self) -> CaptureResult<Uuid> {
        let permission = {
            let mut session = self.session.lock().await;
            if session.state() != SessionState::Idle {
                return session.start();
            }
            session.permission()
        };

        ensure_microphone_access(permission.as_ref()).await?;

        // State may have changed while the prompt was open; start() re-checks.
        self.session.lock().await.start()
    }

    /// Pause at the user's request.
    pub async fn pause(&self) -> bool {
        self.session.lock().await.pause()
    }

    /// Resume a paused recording.
    ///
    /// # Errors
    ///
    /// `ResumeFailed` when the input cannot be re-acquired.
    pub async fn resume(&self) -> CaptureResult<bool> {
        self.session.lock().await.resume()
    }

    /// Stop, persist the pending entry and hand it to the upload worker.
    ///
    /// Returns `Ok(None)` when there was no active session; the queue is not
    /// touched in that case.
    ///
    /// # Errors
    ///
    /// `FinalizeFailed` when the file could not be closed. Nothing is queued.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> CaptureResult<Option<PendingRecording>> {
        let finished = self.session.lock().await.stop()?;
        let Some(finished) = finished else {
            return Ok(None);
        };

        let title = format!(
            "{} {}",
            self.title_prefix,
            finished.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        );
        let entry = PendingRecording::from_finished(&finished, self.owner_id.as_str(), title);

        if let Err(e) = self.queue.upsert(entry.clone()).await {
            warn!(recording_id = %entry.id, error = %e, "Pending entry held in memory only");
        }

        if let Err(e) = self.upload_tx.send(entry.clone()).await {
            warn!(
                recording_id = %e.0.id,
                "Upload worker unavailable, entry stays queued for retry"
            );
        }

        info!(
            recording_id = %entry.id,
            duration_minutes = ?entry.duration_minutes,
            "Recording queued for upload"
        );

        Ok(Some(entry))
    }

    /// Execute a relay request. A route instruction is delivered only with `Stop`.
    ///
    /// # Errors
    ///
    /// Errors from `resume()` or `stop()`.
    #[instrument(skip(self))]
    pub async fn apply_control(&self, entry: ControlMailboxEntry) -> CaptureResult<()> {
        match entry.control_action {
            ControlAction::Pause => {
                self.pause().await;
            }
            ControlAction::Resume => {
                self.resume().await?;
            }
            ControlAction::Stop => {
                let stopped = self.stop().await;
                if let Some(route) = entry.route_action {
                    self.routes.push(route);
                    debug!(%route, "Route instruction queued");
                }
                stopped?;
                return Ok(());
            }
        }

        if let Some(route) = entry.route_action {
            debug!(%route, action = %entry.control_action, "Route ignored for non-stop action");
        }

        Ok(())
    }

    /// Next route instruction for the UI.
    pub fn take_route(&self) -> Option<RouteAction> {
        self.routes.take()
    }

    /// Shared route inbox.
    pub fn routes(&self) -> &RouteInbox {
        &self.routes
    }

    /// Current session status.
    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.lock().await.snapshot()
    }

    /// The injected session handle.
    pub fn session(&self) -> SessionHandle {
        Arc::clone(&self.session)
    }

    /// Owner the coordinator queues recordings for.
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }
}
