use crate::{
    ControlAction, ControlMailbox, ControlMailboxEntry, FileMailbox, PendingUploadQueue,
    RecordingCoordinator, RemoteControlRelay, RouteAction, SessionState, StoreResult,
    tests::support::{ScriptedPermission, fake_session},
};

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

/// In-process mailbox that counts reads.
#[derive(Default)]
struct MemoryMailbox {
    slot: Mutex<Option<ControlMailboxEntry>>,
    takes: AtomicUsize,
}

#[async_trait]
impl ControlMailbox for MemoryMailbox {
    async fn post(&self, entry: ControlMailboxEntry) -> StoreResult<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(entry);
        Ok(())
    }

    async fn take(&self) -> StoreResult<Option<ControlMailboxEntry>> {
        self.takes.fetch_add(1, Ordering::SeqCst);
        Ok(self.slot.lock().unwrap_or_else(|e| e.into_inner()).take())
    }
}

/// WHAT: A remote stop with a route, consumed twice, stops once and routes once
/// WHY: The mailbox read-then-clear is the only guard against double execution
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_mailbox_stop_with_route_when_drained_twice_then_one_stop_one_route() {
    // Given: A recording session and a stop request in the mailbox
    let dir = tempfile::tempdir().unwrap();
    let (session, control, files) =
        fake_session(dir.path(), Arc::new(ScriptedPermission::granted()));
    let queue = Arc::new(PendingUploadQueue::new(files.manifest_path()));
    let (upload_tx, mut upload_rx) = mpsc::channel(4);
    let coordinator =
        RecordingCoordinator::new(session, Arc::clone(&queue), upload_tx, "owner-a", "Recording");
    coordinator.start().await.unwrap();
    let mailbox = Arc::new(FileMailbox::for_store(&files));
    mailbox
        .post(
            ControlMailboxEntry::new(ControlAction::Stop)
                .with_route(RouteAction::ShowSaveConfirmation),
        )
        .await
        .unwrap();
    let relay = RemoteControlRelay::new(mailbox);

    // When: The consumer runs twice
    let first = relay.drain_into(&coordinator).await;
    let second = relay.drain_into(&coordinator).await;

    // Then: One stop, one queued recording, one route
    assert!(first.is_some());
    assert!(second.is_none());
    assert_eq!(control.count("finalize"), 1);
    assert_eq!(coordinator.snapshot().await.state, SessionState::Idle);
    assert_eq!(queue.load("owner-a").await.len(), 1);
    assert!(upload_rx.try_recv().is_ok());
    assert!(upload_rx.try_recv().is_err());
    assert_eq!(
        coordinator.take_route(),
        Some(RouteAction::ShowSaveConfirmation)
    );
    assert_eq!(coordinator.take_route(), None);
}

/// WHAT: Remote pause and resume drive the session
/// WHY: An out-of-process actor has no other path to the recorder
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_mailbox_pause_then_resume_when_drained_then_session_follows() {
    // Given: A recording session
    let dir = tempfile::tempdir().unwrap();
    let (session, _control, files) =
        fake_session(dir.path(), Arc::new(ScriptedPermission::granted()));
    let queue = Arc::new(PendingUploadQueue::new(files.manifest_path()));
    let (upload_tx, _upload_rx) = mpsc::channel(4);
    let coordinator = RecordingCoordinator::new(session, queue, upload_tx, "owner-a", "Recording");
    coordinator.start().await.unwrap();
    let mailbox = Arc::new(FileMailbox::for_store(&files));
    let relay = RemoteControlRelay::new(Arc::clone(&mailbox) as Arc<dyn ControlMailbox>);

    // When: Pause is posted and drained
    mailbox
        .post(ControlMailboxEntry::new(ControlAction::Pause))
        .await
        .unwrap();
    relay.drain_into(&coordinator).await;
    let after_pause = coordinator.snapshot().await.state;

    // When: Resume is posted and drained
    mailbox
        .post(ControlMailboxEntry::new(ControlAction::Resume))
        .await
        .unwrap();
    relay.drain_into(&coordinator).await;

    // Then: Paused, then recording again
    assert_eq!(after_pause, SessionState::Paused);
    assert_eq!(coordinator.snapshot().await.state, SessionState::Recording);
}

/// WHAT: `notify()` makes the poll loop read the mailbox before the next tick
/// WHY: Returning to the foreground should apply pending requests immediately
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_long_period_when_notified_then_request_applied_early() {
    // Given: A running relay with an hour-long period that has done its first poll
    let dir = tempfile::tempdir().unwrap();
    let (session, _control, files) =
        fake_session(dir.path(), Arc::new(ScriptedPermission::granted()));
    let queue = Arc::new(PendingUploadQueue::new(files.manifest_path()));
    let (upload_tx, _upload_rx) = mpsc::channel(4);
    let coordinator = Arc::new(RecordingCoordinator::new(
        session, queue, upload_tx, "owner-a", "Recording",
    ));
    coordinator.start().await.unwrap();
    let mailbox = Arc::new(MemoryMailbox::default());
    let relay = Arc::new(RemoteControlRelay::new(
        Arc::clone(&mailbox) as Arc<dyn ControlMailbox>
    ));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(Arc::clone(&relay).run(
        Arc::clone(&coordinator),
        Duration::from_secs(3600),
        shutdown_rx,
    ));
    while mailbox.takes.load(Ordering::SeqCst) == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    // When: A pause is posted and the relay is woken
    mailbox
        .post(ControlMailboxEntry::new(ControlAction::Pause))
        .await
        .unwrap();
    relay.notify();
    let applied = tokio::time::timeout(Duration::from_secs(5), async {
        while coordinator.snapshot().await.state != SessionState::Paused {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;

    // Then: The pause landed well before the period and the loop stops on shutdown
    assert!(applied.is_ok());
    shutdown_tx.send(true).unwrap();
    task.await.unwrap();
}
