use crate::{FailedUpload, RouteAction};

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
};

use tracing::error;

/// Post-stop UI instructions waiting for the presentation layer.
pub type RouteInbox = Inbox<RouteAction>;

/// Dropped uploads whose reasons the user has not been shown yet.
pub type FailureInbox = Inbox<FailedUpload>;

/// FIFO of notices produced by background tasks and drained by the UI.
///
/// Clones share the same queue.
#[derive(Debug)]
pub struct Inbox<T> {
    pending: Arc<Mutex<VecDeque<T>>>,
}

impl<T> Inbox<T> {
    /// Empty inbox.
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Queue a notice.
    pub fn push(&self, item: T) {
        self.guard().push_back(item);
    }

    /// Oldest queued notice, if any.
    pub fn take(&self) -> Option<T> {
        self.guard().pop_front()
    }

    /// Number of queued notices.
    pub fn len(&self) -> usize {
        self.guard().len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    fn guard(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.pending.lock().unwrap_or_else(|e| {
            error!("Inbox lock poisoned, recovering: {}", e);
            e.into_inner()
        })
    }
}

impl<T> Default for Inbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Inbox<T> {
    fn clone(&self) -> Self {
        Self {
            pending: Arc::clone(&self.pending),
        }
    }
}
