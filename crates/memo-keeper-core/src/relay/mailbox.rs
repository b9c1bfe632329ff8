use crate::{RecordingFileStore, StoreError, StoreResult};

use std::{
    fmt,
    fs::{self, File, OpenOptions},
    io::{ErrorKind, Write},
    panic::Location,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use error_location::ErrorLocation;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Recording command an external process may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    /// Pause the active recording.
    Pause,
    /// Resume a paused recording.
    Resume,
    /// Stop and queue the recording for upload.
    Stop,
}

impl ControlAction {
    /// Mailbox token.
    pub fn as_token(&self) -> &'static str {
        match self {
            ControlAction::Pause => "pause",
            ControlAction::Resume => "resume",
            ControlAction::Stop => "stop",
        }
    }

    /// Parse a mailbox token.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "pause" => Some(ControlAction::Pause),
            "resume" => Some(ControlAction::Resume),
            "stop" => Some(ControlAction::Stop),
            _ => None,
        }
    }
}

impl fmt::Display for ControlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

/// UI instruction delivered after a remote stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAction {
    /// Ask the user to name or confirm the saved recording.
    ShowSaveConfirmation,
    /// Open the recordings list.
    ShowRecordings,
}

impl RouteAction {
    /// Mailbox token.
    pub fn as_token(&self) -> &'static str {
        match self {
            RouteAction::ShowSaveConfirmation => "show-save-confirmation",
            RouteAction::ShowRecordings => "show-recordings",
        }
    }

    /// Parse a mailbox token.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "show-save-confirmation" => Some(RouteAction::ShowSaveConfirmation),
            "show-recordings" => Some(RouteAction::ShowRecordings),
            _ => None,
        }
    }
}

impl fmt::Display for RouteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

/// One cross-process request. Consumed at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlMailboxEntry {
    /// What to do with the recording.
    pub control_action: ControlAction,
    /// What the UI should show afterwards. Only honoured with `Stop`.
    pub route_action: Option<RouteAction>,
}

impl ControlMailboxEntry {
    /// Entry without a route instruction.
    pub fn new(control_action: ControlAction) -> Self {
        Self {
            control_action,
            route_action: None,
        }
    }

    /// Attach a route instruction.
    pub fn with_route(mut self, route_action: RouteAction) -> Self {
        self.route_action = Some(route_action);
        self
    }
}

/// Single-slot mailbox shared between processes.
#[async_trait]
pub trait ControlMailbox: Send + Sync {
    /// Write an entry, replacing any unconsumed one.
    async fn post(&self, entry: ControlMailboxEntry) -> StoreResult<()>;

    /// Read and clear in one step. `Ok(None)` when the mailbox is empty.
    async fn take(&self) -> StoreResult<Option<ControlMailboxEntry>>;
}

/// On-disk form: two keys, empty string means none.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MailboxDocument {
    #[serde(default)]
    control_action: String,
    #[serde(default)]
    route_action: String,
}

impl MailboxDocument {
    fn is_empty(&self) -> bool {
        self.control_action.is_empty() && self.route_action.is_empty()
    }
}

/// JSON mailbox file guarded by an exclusive `fs2` lock on a sibling lock file.
#[derive(Debug, Clone)]
pub struct FileMailbox {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileMailbox {
    /// Mailbox at explicit paths.
    pub fn new(path: impl Into<PathBuf>, lock_path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_path: lock_path.into(),
        }
    }

    /// Mailbox inside a file store's root.
    pub fn for_store(files: &RecordingFileStore) -> Self {
        Self::new(files.mailbox_path(), files.mailbox_lock_path())
    }

    /// Mailbox document location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn post_blocking(&self, entry: ControlMailboxEntry) -> StoreResult<()> {
        let _lock = MailboxLock::acquire(&self.lock_path)?;

        if let Some(previous) = read_document(&self.path)?
            && !previous.control_action.is_empty()
        {
            warn!(
                previous = %previous.control_action,
                "Replacing unconsumed mailbox entry"
            );
        }

        let document = MailboxDocument {
            control_action: entry.control_action.as_token().to_string(),
            route_action: entry
                .route_action
                .map(|route| route.as_token().to_string())
                .unwrap_or_default(),
        };
        write_document(&self.path, &document)
    }

    fn take_blocking(&self) -> StoreResult<Option<ControlMailboxEntry>> {
        let _lock = MailboxLock::acquire(&self.lock_path)?;

        let document = match read_document(&self.path) {
            Ok(Some(document)) => document,
            Ok(None) => return Ok(None),
            Err(e @ StoreError::Serialization { .. }) => {
                warn!(error = %e, "Unreadable mailbox cleared");
                write_document(&self.path, &MailboxDocument::default())?;
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if document.is_empty() {
            return Ok(None);
        }

        // Clear before interpreting so a bad token is not re-read forever.
        write_document(&self.path, &MailboxDocument::default())?;

        let Some(control_action) = ControlAction::from_token(&document.control_action) else {
            warn!(token = %document.control_action, "Unknown control action discarded");
            return Ok(None);
        };

        let route_action = match document.route_action.as_str() {
            "" => None,
            token => {
                let route = RouteAction::from_token(token);
                if route.is_none() {
                    warn!(token, "Unknown route action discarded");
                }
                route
            }
        };

        Ok(Some(ControlMailboxEntry {
            control_action,
            route_action,
        }))
    }
}

#[async_trait]
impl ControlMailbox for FileMailbox {
    #[instrument(skip(self))]
    async fn post(&self, entry: ControlMailboxEntry) -> StoreResult<()> {
        let mailbox = self.clone();
        tokio::task::spawn_blocking(move || mailbox.post_blocking(entry))
            .await
            .map_err(|e| StoreError::Mailbox {
                reason: format!("Mailbox task failed: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })??;

        info!(action = %entry.control_action, route = ?entry.route_action, "Control request posted");
        Ok(())
    }

    async fn take(&self) -> StoreResult<Option<ControlMailboxEntry>> {
        let mailbox = self.clone();
        let entry = tokio::task::spawn_blocking(move || mailbox.take_blocking())
            .await
            .map_err(|e| StoreError::Mailbox {
                reason: format!("Mailbox task failed: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })??;

        if let Some(entry) = entry.as_ref() {
            debug!(action = %entry.control_action, route = ?entry.route_action, "Control request taken");
        }
        Ok(entry)
    }
}

struct MailboxLock {
    file: File,
}

impl MailboxLock {
    #[track_caller]
    fn acquire(lock_path: &Path) -> StoreResult<Self> {
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(lock_path)
            .map_err(|e| StoreError::io(lock_path, e))?;

        FileExt::lock_exclusive(&file).map_err(|e| StoreError::Mailbox {
            reason: format!("Failed to lock {:?}: {}", lock_path, e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        Ok(Self { file })
    }
}

impl Drop for MailboxLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            debug!("Failed to release mailbox lock: {:?}", e);
        }
    }
}

#[track_caller]
fn read_document(path: &Path) -> StoreResult<Option<MailboxDocument>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };

    if contents.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|e| StoreError::Serialization {
            reason: format!("Failed to parse mailbox: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })
}

#[track_caller]
fn write_document(path: &Path, document: &MailboxDocument) -> StoreResult<()> {
    let contents = serde_json::to_string(document).map_err(|e| StoreError::Serialization {
        reason: format!("Failed to encode mailbox: {}", e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let temp_path = path.with_extension("json.tmp");
    let mut temp_file = File::create(&temp_path).map_err(|e| StoreError::io(&temp_path, e))?;
    temp_file
        .write_all(contents.as_bytes())
        .map_err(|e| StoreError::io(&temp_path, e))?;
    temp_file
        .sync_all()
        .map_err(|e| StoreError::io(&temp_path, e))?;
    drop(temp_file);

    fs::rename(&temp_path, path).map_err(|e| StoreError::io(path, e))
}
