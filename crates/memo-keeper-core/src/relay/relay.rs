use crate::{ControlMailbox, ControlMailboxEntry, RecordingCoordinator};

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{Notify, watch},
    time::MissedTickBehavior,
};
use tracing::{debug, error, info, instrument, warn};

/// Main-process consumer of the cross-process control mailbox.
///
/// Each poll atomically reads and clears the mailbox, so a write is executed
/// at most once no matter how often the consumer runs.
pub struct RemoteControlRelay {
    mailbox: Arc<dyn ControlMailbox>,
    wake: Arc<Notify>,
}

impl RemoteControlRelay {
    /// Relay over a mailbox.
    pub fn new(mailbox: Arc<dyn ControlMailbox>) -> Self {
        Self {
            mailbox,
            wake: Arc::new(Notify::new()),
        }
    }

    /// Wake the poll loop early, e.g. when the app returns to the foreground.
    pub fn notify(&self) {
        self.wake.notify_one();
    }

    /// Take the pending entry, if any. Read errors are logged and read as empty.
    pub async fn poll(&self) -> Option<ControlMailboxEntry> {
        match self.mailbox.take().await {
            Ok(entry) => entry,
            Err(e) => {
                error!(error = %e, "Failed to read control mailbox");
                None
            }
        }
    }

    /// Consume one pending entry and dispatch it. Returns the entry executed.
    #[instrument(skip_all)]
    pub async fn drain_into(
        &self,
        coordinator: &RecordingCoordinator,
    ) -> Option<ControlMailboxEntry> {
        let entry = self.poll().await?;

        info!(
            action = %entry.control_action,
            route = ?entry.route_action,
            "Executing remote control request"
        );
        if let Err(e) = coordinator.apply_control(entry).await {
            warn!(action = %entry.control_action, error = %e, "Remote control request failed");
        }

        Some(entry)
    }

    /// Poll every `period` (or on [`Self::notify`]) until shutdown.
    #[instrument(skip_all, fields(period_ms = period.as_millis()))]
    pub async fn run(
        self: Arc<Self>,
        coordinator: Arc<RecordingCoordinator>,
        period: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Remote control relay started");

        loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Remote control relay shutting down");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.drain_into(&coordinator).await;
                }
                _ = self.wake.notified() => {
                    debug!("Relay woken early");
                    self.drain_into(&coordinator).await;
                }
            }
        }
    }
}
