use crate::capture::SessionState;

use std::{panic::Location, path::PathBuf};

use error_location::ErrorLocation;
use thiserror::Error;

/// Capture session errors with source location tracking.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The user denied microphone access. Recoverable only through settings.
    #[error("Microphone permission denied {location}")]
    PermissionDenied {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The capture device could not be opened or configured.
    #[error("Capture device unavailable: {reason} {location}")]
    DeviceUnavailable {
        /// Description of the device failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Re-acquiring the audio session after a pause failed. The session stays paused.
    #[error("Resume failed: {reason} {location}")]
    ResumeFailed {
        /// Description of the re-acquisition failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// `start()` was called while a session was already running.
    #[error("Recording session already active ({state}) {location}")]
    AlreadyActive {
        /// State the session was in when start was requested.
        state: SessionState,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The output file could not be finalized on stop.
    #[error("Failed to finalize recording: {reason} {location}")]
    FinalizeFailed {
        /// Description of the finalization failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

/// Durable storage errors (manifest, recording files, mailbox).
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem operation failed.
    #[error("IO error on {path:?}: {source} {location}")]
    Io {
        /// Path the operation was applied to.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A document could not be encoded or decoded.
    #[error("Serialization error: {reason} {location}")]
    Serialization {
        /// Description of the encoding failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The cross-process mailbox could not be read, written or locked.
    #[error("Mailbox error: {reason} {location}")]
    Mailbox {
        /// Description of the mailbox failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

impl StoreError {
    #[track_caller]
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

/// Result type alias using [`CaptureError`].
pub type CaptureResult<T> = std::result::Result<T, CaptureError>;

/// Result type alias using [`StoreError`].
pub type StoreResult<T> = std::result::Result<T, StoreError>;
