use crate::{
    SessionHandle,
    interruption::{InterruptionEvent, InterruptionOutcome},
};

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, instrument, warn};

/// Drives the capture session through interruptions without losing the open file.
///
/// A pause the user asked for is never reversed here: only sessions that were
/// paused by [`InterruptionEvent::Began`] are resumed on
/// [`InterruptionEvent::Ended`].
pub struct InterruptionMonitor {
    session: SessionHandle,
}

impl InterruptionMonitor {
    /// Create a monitor for the shared session.
    pub fn new(session: SessionHandle) -> Self {
        Self { session }
    }

    /// Apply one event. Never fails; the outcome is only observable state.
    #[instrument(skip(self))]
    pub async fn handle(&self, event: InterruptionEvent) -> InterruptionOutcome {
        let mut session = self.session.lock().await;

        match event {
            InterruptionEvent::Began => {
                if session.pause_for_interruption() {
                    info!("Interruption began, recording auto-paused");
                    InterruptionOutcome::AutoPaused
                } else {
                    debug!(state = %session.state(), "Interruption began, nothing to pause");
                    InterruptionOutcome::Ignored
                }
            }
            InterruptionEvent::Ended { should_resume } => {
                if !should_resume || !session.is_auto_paused() {
                    debug!(
                        should_resume,
                        auto_paused = session.is_auto_paused(),
                        "Interruption ended, leaving session as-is"
                    );
                    return InterruptionOutcome::Ignored;
                }

                match session.resume() {
                    Ok(true) => {
                        info!("Interruption ended, recording auto-resumed");
                        InterruptionOutcome::AutoResumed
                    }
                    Ok(false) => InterruptionOutcome::Ignored,
                    Err(e) => {
                        warn!(error = %e, "Auto-resume failed, session stays paused");
                        InterruptionOutcome::ResumeFailed(e.to_string())
                    }
                }
            }
            InterruptionEvent::RouteChanged { reason } => {
                if session.reapply_route() {
                    info!(?reason, "Route changed, audio session re-applied");
                    InterruptionOutcome::RouteReapplied
                } else {
                    debug!(?reason, state = %session.state(), "Route change not applied");
                    InterruptionOutcome::Ignored
                }
            }
            InterruptionEvent::MediaServicesReset => {
                let previous_state = session.state();
                if session.hard_reset() {
                    error!(%previous_state, "Media services reset, session aborted");
                    InterruptionOutcome::HardReset
                } else {
                    debug!("Media services reset while idle, session reconfigured");
                    InterruptionOutcome::Ignored
                }
            }
        }
    }

    /// Consume events until the channel closes or shutdown is signalled.
    #[instrument(skip_all)]
    pub async fn run(
        self,
        mut events: mpsc::Receiver<InterruptionEvent>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Interruption monitor shutting down");
                        break;
                    }
                }
                event = events.recv() => {
                    match event {
                        Some(event) => {
                            let outcome = self.handle(event).await;
                            debug!(?event, ?outcome, "Interruption handled");
                        }
                        None => {
                            info!("Interruption source closed");
                            break;
                        }
                    }
                }
            }
        }
    }
}
