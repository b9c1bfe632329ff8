use crate::{AppCommand, AppResult, ConsoleHandler, FolderUploader, config::Config};

use memo_keeper_core::{
    CaptureError, CaptureSession, CpalCaptureDevice, DesktopPermission, FailedUpload, FileMailbox,
    InterruptionEvent, InterruptionMonitor, PendingRecording, PendingUploadQueue,
    RecordingCoordinator, RecordingFileStore, RemoteControlRelay, SessionSnapshot, SessionState,
    UploadPipeline, UploadReport, spawn_level_meter,
};

use std::{sync::Arc, time::Duration};

use tokio::{
    io::BufReader,
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{error, info, instrument, warn};

const NOTICE_CHECK_INTERVAL: Duration = Duration::from_millis(250);
const TASK_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Main application state.
///
/// Owns the wiring between the console, the coordinator and the background
/// tasks (level meter, interruption monitor, relay poller, upload worker and
/// retry timer). All of them stop when `shutdown_tx` flips to `true`.
pub struct App {
    pub(crate) coordinator: Arc<RecordingCoordinator>,
    pub(crate) pipeline: Arc<UploadPipeline>,
    pub(crate) relay: Arc<RemoteControlRelay>,
    pub(crate) config: Config,
    pub(crate) interruption_rx: Option<mpsc::Receiver<InterruptionEvent>>,
    pub(crate) upload_rx: Option<mpsc::Receiver<PendingRecording>>,
    pub(crate) command_tx: mpsc::Sender<AppCommand>,
    pub(crate) command_rx: mpsc::Receiver<AppCommand>,
    pub(crate) shutdown_tx: watch::Sender<bool>,
}

impl App {
    /// Wire the core components over the configured data directory.
    #[track_caller]
    pub(crate) fn build(config: Config, files: RecordingFileStore) -> AppResult<Self> {
        files.ensure_layout()?;

        let (interruption_tx, interruption_rx) = mpsc::channel(16);
        let device = CpalCaptureDevice::new(Some(interruption_tx));
        let session =
            CaptureSession::new(Box::new(device), Arc::new(DesktopPermission), files.clone())
                .into_handle();

        let queue = Arc::new(PendingUploadQueue::new(files.manifest_path()));
        let uploader = Arc::new(FolderUploader::new(config.remote_root(files.root())));
        let pipeline = Arc::new(UploadPipeline::new(
            Arc::clone(&queue),
            uploader,
            files.clone(),
        ));

        let (upload_tx, upload_rx) = mpsc::channel(32);
        let coordinator = Arc::new(RecordingCoordinator::new(
            session,
            queue,
            upload_tx,
            config.account.owner_id.as_str(),
            config.recording.title_prefix.as_str(),
        ));

        let relay = Arc::new(RemoteControlRelay::new(Arc::new(FileMailbox::for_store(
            &files,
        ))));

        let (command_tx, command_rx) = mpsc::channel(32);
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            coordinator,
            pipeline,
            relay,
            config,
            interruption_rx: Some(interruption_rx),
            upload_rx: Some(upload_rx),
            command_tx,
            command_rx,
            shutdown_tx,
        })
    }

    /// Run the main application event loop.
    #[instrument(skip(self))]
    pub(crate) async fn run(mut self) -> AppResult<()> {
        info!("Memo-keeper starting");

        let owner_id = self.config.account.owner_id.clone();
        let report = self.pipeline.recover(&owner_id).await;
        print_report("Recovered", &report);

        let tasks = self.spawn_background_tasks(owner_id);

        println!("Commands: start, pause, resume, stop, status, quit");

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut notice_ticker = tokio::time::interval(NOTICE_CHECK_INTERVAL);

        loop {
            tokio::select! {
                Some(command) = self.command_rx.recv() => {
                    if command == AppCommand::Shutdown {
                        info!("Shutdown requested");
                        break;
                    }
                    self.handle_command(command).await;
                }

                result = &mut ctrl_c => {
                    if let Err(e) = result {
                        error!(error = ?e, "Failed to listen for Ctrl-C");
                    }
                    info!("Interrupted, shutting down");
                    break;
                }

                _ = notice_ticker.tick() => {
                    while let Some(route) = self.coordinator.take_route() {
                        println!("-> {}", route);
                    }
                    while let Some(failed) = self.pipeline.take_failure() {
                        println!("{}", format_failure(&failed));
                    }
                }
            }
        }

        // A recording still open at exit is finalized and queued, not lost.
        match self.coordinator.stop().await {
            Ok(Some(entry)) => println!("Saved {} before exit", entry.title),
            Ok(None) => {}
            Err(e) => error!(error = ?e, "Failed to stop recording on exit"),
        }

        let _ = self.shutdown_tx.send(true);

        for (name, handle) in tasks {
            match tokio::time::timeout(TASK_JOIN_TIMEOUT, handle).await {
                Ok(Ok(())) => info!(task = name, "Task stopped cleanly"),
                Ok(Err(e)) => error!(task = name, error = ?e, "Task panicked"),
                Err(_) => info!(
                    task = name,
                    "Task did not stop within timeout, will be cleaned up on exit"
                ),
            }
        }

        info!("Memo-keeper shut down successfully");

        Ok(())
    }

    fn spawn_background_tasks(&mut self, owner_id: String) -> Vec<(&'static str, JoinHandle<()>)> {
        let shutdown_rx = self.shutdown_tx.subscribe();
        let mut tasks = Vec::new();

        tasks.push((
            "level-meter",
            spawn_level_meter(self.coordinator.session(), shutdown_rx.clone()),
        ));

        if let Some(interruption_rx) = self.interruption_rx.take() {
            let monitor = InterruptionMonitor::new(self.coordinator.session());
            tasks.push((
                "interruption-monitor",
                tokio::spawn(monitor.run(interruption_rx, shutdown_rx.clone())),
            ));
        }

        let relay = tokio::spawn(Arc::clone(&self.relay).run(
            Arc::clone(&self.coordinator),
            self.config.poll_interval(),
            shutdown_rx.clone(),
        ));
        tasks.push(("relay", relay));

        if let Some(upload_rx) = self.upload_rx.take() {
            let worker = Arc::clone(&self.pipeline).run_worker(upload_rx, shutdown_rx.clone());
            tasks.push(("upload-worker", tokio::spawn(worker)));
        }

        let retries = tokio::spawn(Arc::clone(&self.pipeline).run_retries(
            owner_id,
            self.config.retry_interval(),
            shutdown_rx.clone(),
        ));

        let console = ConsoleHandler::new(self.command_tx.clone());
        let console_shutdown = shutdown_rx;
        let console = tokio::spawn(async move {
            let stdin = BufReader::new(tokio::io::stdin());
            if let Err(e) = console.run(stdin, console_shutdown).await {
                error!(error = ?e, "Console handler error");
            }
        });

        tasks.push(("retry-timer", retries));
        tasks.push(("console", console));

        tasks
    }

    #[instrument(skip(self))]
    async fn handle_command(&self, command: AppCommand) {
        match command {
            AppCommand::Start => match self.coordinator.start().await {
                Ok(id) => println!("Recording ({})", id),
                Err(CaptureError::PermissionDenied { .. }) => {
                    println!("Microphone access is denied. Enable it in system settings.");
                }
                Err(e) => {
                    error!(error = ?e, "Failed to start recording");
                    println!("Could not start: {}", e);
                }
            },
            AppCommand::Pause => {
                if self.coordinator.pause().await {
                    println!("Paused");
                } else {
                    println!("Not recording");
                }
            }
            AppCommand::Resume => match self.coordinator.resume().await {
                Ok(true) => println!("Recording"),
                Ok(false) => println!("Not paused"),
                Err(e) => {
                    warn!(error = ?e, "Resume failed");
                    println!("Could not resume, still paused: {}", e);
                }
            },
            AppCommand::Stop => match self.coordinator.stop().await {
                Ok(Some(entry)) => println!("Saved {} ({})", entry.title, entry.id),
                Ok(None) => println!("No active recording"),
                Err(e) => {
                    error!(error = ?e, "Failed to stop recording");
                    println!("Recording could not be saved: {}", e);
                }
            },
            AppCommand::Status => {
                println!("{}", format_status(&self.coordinator.snapshot().await));
            }
            AppCommand::Shutdown => {}
        }
    }
}

/// One-line status: state, elapsed `mm:ss` and a 20-column level bar.
pub(crate) fn format_status(snapshot: &SessionSnapshot) -> String {
    let secs = snapshot.elapsed.as_secs();
    let filled = (snapshot.input_level.clamp(0.0, 1.0) * 20.0).round() as usize;
    let state = match (snapshot.state, snapshot.auto_paused) {
        (SessionState::Paused, true) => "paused (interrupted)".to_string(),
        (state, _) => state.to_string(),
    };
    format!(
        "{:<20} {:02}:{:02} [{:<20}]",
        state,
        secs / 60,
        secs % 60,
        "#".repeat(filled)
    )
}

fn print_report(label: &str, report: &UploadReport) {
    if report.is_empty() {
        return;
    }
    println!(
        "{}: {} uploaded, {} waiting for retry, {} failed, {} missing",
        label,
        report.uploaded.len(),
        report.retained.len(),
        report.failed.len(),
        report.orphaned.len()
    );
}

/// User-facing notice for an upload that was dropped.
pub(crate) fn format_failure(failed: &FailedUpload) -> String {
    format!(
        "Recording {} could not be uploaded and was discarded: {}",
        failed.id, failed.reason
    )
}
