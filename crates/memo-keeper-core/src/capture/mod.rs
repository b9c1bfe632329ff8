mod cpal_device;
mod device;
pub(crate) mod level;
mod permission;
mod session;
mod state;

pub use {
    cpal_device::CpalCaptureDevice,
    device::CaptureDevice,
    level::{METER_INTERVAL, normalize_db, spawn_level_meter},
    permission::{
        DesktopPermission, MicrophonePermission, PermissionStatus, ensure_microphone_access,
    },
    session::{CaptureSession, FinishedRecording, SessionHandle},
    state::{SessionSnapshot, SessionState},
};
