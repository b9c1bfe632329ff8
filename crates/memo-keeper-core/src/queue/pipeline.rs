use crate::{
    FailureInbox, PendingRecording, PendingUploadQueue, RecordingFileStore, UploadOutcome,
    UploadTrigger, Uploader,
};

use std::{collections::HashSet, sync::Arc, time::Duration};

use tokio::{
    sync::{Mutex, mpsc, watch},
    time::MissedTickBehavior,
};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// What happened to one submitted entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Uploaded; entry and local file removed.
    Uploaded,
    /// Kept in the queue for a later retry.
    Retained {
        /// Why the attempt failed.
        reason: String,
    },
    /// Dropped after a permanent failure.
    Failed {
        /// Why the upload can never succeed.
        reason: String,
    },
    /// Another submission of the same id is still running.
    InFlight,
    /// The entry left the queue before this attempt; nothing was uploaded.
    Settled,
}

/// An entry dropped after a permanent failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedUpload {
    /// Recording id.
    pub id: Uuid,
    /// Reason reported by the uploader.
    pub reason: String,
}

/// Summary of a recovery or retry pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    /// Uploaded and removed.
    pub uploaded: Vec<Uuid>,
    /// Still queued after a retryable failure.
    pub retained: Vec<Uuid>,
    /// Dropped after a permanent failure.
    pub failed: Vec<FailedUpload>,
    /// Entries whose local file was missing; removed without upload.
    pub orphaned: Vec<Uuid>,
}

impl UploadReport {
    /// Whether the pass touched nothing.
    pub fn is_empty(&self) -> bool {
        self.uploaded.is_empty()
            && self.retained.is_empty()
            && self.failed.is_empty()
            && self.orphaned.is_empty()
    }

    fn record(&mut self, id: Uuid, outcome: SubmitOutcome) {
        match outcome {
            SubmitOutcome::Uploaded => self.uploaded.push(id),
            SubmitOutcome::Retained { .. } => self.retained.push(id),
            SubmitOutcome::Failed { reason } => self.failed.push(FailedUpload { id, reason }),
            SubmitOutcome::InFlight | SubmitOutcome::Settled => {}
        }
    }
}

/// Drains the pending queue through an [`Uploader`].
///
/// An entry is durable before the first attempt and is removed only after the
/// uploader reports success or a permanent failure. The local file is deleted
/// only once its entry is gone from the manifest. Every permanent failure is
/// also posted to [`Self::failures`] for the UI.
pub struct UploadPipeline {
    queue: Arc<PendingUploadQueue>,
    uploader: Arc<dyn Uploader>,
    files: RecordingFileStore,
    in_flight: Mutex<HashSet<Uuid>>,
    failures: FailureInbox,
}

impl UploadPipeline {
    /// Pipeline over a shared queue.
    pub fn new(
        queue: Arc<PendingUploadQueue>,
        uploader: Arc<dyn Uploader>,
        files: RecordingFileStore,
    ) -> Self {
        Self {
            queue,
            uploader,
            files,
            in_flight: Mutex::new(HashSet::new()),
            failures: FailureInbox::new(),
        }
    }

    /// Dropped uploads not yet shown to the user.
    pub fn failures(&self) -> &FailureInbox {
        &self.failures
    }

    /// Oldest dropped upload not yet shown to the user.
    pub fn take_failure(&self) -> Option<FailedUpload> {
        self.failures.take()
    }

    /// Persist, upload and settle one entry.
    ///
    /// Entries resubmitted from the queue (any trigger but `ExplicitStop`)
    /// are skipped once another pass has settled them.
    #[instrument(skip(self, entry), fields(recording_id = %entry.id, trigger = ?entry.upload_trigger))]
    pub async fn submit(&self, entry: PendingRecording) -> SubmitOutcome {
        if !self.in_flight.lock().await.insert(entry.id) {
            debug!("Upload already in flight");
            return SubmitOutcome::InFlight;
        }

        let settled = entry.upload_trigger != UploadTrigger::ExplicitStop
            && self.queue.get(entry.id, &entry.owner_id).await.is_none();
        let outcome = if settled {
            debug!("Entry no longer queued, skipping upload");
            SubmitOutcome::Settled
        } else {
            self.attempt(entry.clone()).await
        };

        self.in_flight.lock().await.remove(&entry.id);
        outcome
    }

    /// Resubmit everything left over from a previous run.
    ///
    /// Entries whose file still exists are uploaded with trigger
    /// `RecoveredAfterRestart`; entries whose file is gone are removed.
    #[instrument(skip(self))]
    pub async fn recover(&self, owner_id: &str) -> UploadReport {
        let entries = self.queue.load(owner_id).await;
        if entries.is_empty() {
            debug!("No pending uploads to recover");
            return UploadReport::default();
        }

        info!(count = entries.len(), "Recovering pending uploads");
        let report = self
            .drain(entries, UploadTrigger::RecoveredAfterRestart, owner_id)
            .await;
        info!(
            uploaded = report.uploaded.len(),
            retained = report.retained.len(),
            failed = report.failed.len(),
            orphaned = report.orphaned.len(),
            "Recovery finished"
        );
        report
    }

    /// Retry everything still queued for the owner.
    #[instrument(skip(self))]
    pub async fn retry_pending(&self, owner_id: &str) -> UploadReport {
        let entries = self.queue.entries(owner_id).await;
        if entries.is_empty() {
            return UploadReport::default();
        }

        debug!(count = entries.len(), "Retrying pending uploads");
        self.drain(entries, UploadTrigger::Retry, owner_id).await
    }

    /// Upload finished recordings as they arrive from the coordinator.
    #[instrument(skip_all)]
    pub async fn run_worker(
        self: Arc<Self>,
        mut finished_rx: mpsc::Receiver<PendingRecording>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        info!("Upload worker started");

        loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Upload worker shutting down");
                        break;
                    }
                }
                entry = finished_rx.recv() => {
                    match entry {
                        Some(entry) => {
                            let id = entry.id;
                            let outcome = self.submit(entry).await;
                            debug!(recording_id = %id, ?outcome, "Finished recording processed");
                        }
                        None => {
                            info!("Finished-recording channel closed");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Periodically call [`Self::retry_pending`] until shutdown.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn run_retries(
        self: Arc<Self>,
        owner_id: String,
        period: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; recovery already covered it.
        ticker.tick().await;

        loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        debug!("Retry timer stopped");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let report = self.retry_pending(&owner_id).await;
                    if !report.is_empty() {
                        info!(
                            uploaded = report.uploaded.len(),
                            retained = report.retained.len(),
                            failed = report.failed.len(),
                            "Retry pass finished"
                        );
                    }
                }
            }
        }
    }

    async fn drain(
        &self,
        entries: Vec<PendingRecording>,
        trigger: UploadTrigger,
        owner_id: &str,
    ) -> UploadReport {
        let mut report = UploadReport::default();

        for entry in entries {
            let id = entry.id;

            if !self.files.exists(&entry.local_file_path) {
                error!(
                    recording_id = %id,
                    local_file = ?entry.local_file_path,
                    "Pending upload has no local file, dropping orphaned entry"
                );
                if let Err(e) = self.queue.remove(id, owner_id).await {
                    warn!(recording_id = %id, error = %e, "Failed to persist orphan removal");
                }
                report.orphaned.push(id);
                continue;
            }

            let outcome = self.submit(entry.with_trigger(trigger)).await;
            report.record(id, outcome);
        }

        report
    }

    async fn attempt(&self, entry: PendingRecording) -> SubmitOutcome {
        if let Err(e) = self.queue.upsert(entry.clone()).await {
            warn!(error = %e, "Entry not yet durable, uploading anyway");
        }

        match self.uploader.upload(&entry).await {
            UploadOutcome::Success => {
                info!("Upload confirmed");
                self.settle(&entry).await;
                SubmitOutcome::Uploaded
            }
            UploadOutcome::RetryableFailure { reason } => {
                warn!(%reason, "Upload failed, will retry");
                if let Err(e) = self
                    .queue
                    .upsert(entry.with_trigger(UploadTrigger::Retry))
                    .await
                {
                    warn!(error = %e, "Failed to persist retry trigger");
                }
                SubmitOutcome::Retained { reason }
            }
            UploadOutcome::PermanentFailure { reason } => {
                error!(%reason, "Upload rejected permanently, dropping recording");
                self.settle(&entry).await;
                self.failures.push(FailedUpload {
                    id: entry.id,
                    reason: reason.clone(),
                });
                SubmitOutcome::Failed { reason }
            }
        }
    }

    /// Remove the entry, then its file. The file stays if the removal was not saved.
    async fn settle(&self, entry: &PendingRecording) {
        if let Err(e) = self.queue.remove(entry.id, &entry.owner_id).await {
            warn!(error = %e, "Entry removal not saved, keeping local file");
            return;
        }

        match self.files.remove_recording(&entry.local_file_path) {
            Ok(true) => debug!("Local file deleted"),
            Ok(false) => debug!("Local file already gone"),
            Err(e) => warn!(error = %e, "Failed to delete local file"),
        }
    }
}
