use crate::{CaptureError, CaptureResult};

use std::panic::Location;

use async_trait::async_trait;
use error_location::ErrorLocation;
use tracing::{debug, warn};

/// Microphone authorization as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    /// Access granted.
    Granted,
    /// Access denied by the user; only a settings change can fix it.
    Denied,
    /// Not asked yet; a prompt is required.
    Undetermined,
}

/// Platform microphone permission gate consulted by `start()`.
#[async_trait]
pub trait MicrophonePermission: Send + Sync {
    /// Current authorization without prompting. Reflects the latest prompt answer.
    fn status(&self) -> PermissionStatus;

    /// Prompt the user. Resolves to `true` on grant.
    async fn request(&self) -> bool;
}

/// Desktop hosts have no per-app microphone prompt reachable from cpal.
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopPermission;

#[async_trait]
impl MicrophonePermission for DesktopPermission {
    fn status(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }

    async fn request(&self) -> bool {
        true
    }
}

/// Resolve access before a session starts, prompting when undetermined.
///
/// Must be awaited without the session lock held; the prompt can stay open
/// indefinitely.
///
/// # Errors
///
/// `PermissionDenied` when access is denied or refused at the prompt.
pub async fn ensure_microphone_access(permission: &dyn MicrophonePermission) -> CaptureResult<()> {
    let granted = match permission.status() {
        PermissionStatus::Granted => true,
        PermissionStatus::Denied => false,
        PermissionStatus::Undetermined => {
            debug!("Microphone permission undetermined, requesting");
            permission.request().await
        }
    };

    if granted {
        Ok(())
    } else {
        warn!("Microphone permission denied");
        Err(CaptureError::PermissionDenied {
            location: ErrorLocation::from(Location::caller()),
        })
    }
}
