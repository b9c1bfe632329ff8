use std::{fmt, time::Duration};

/// Lifecycle state of the capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session; the microphone is released.
    Idle,
    /// Capturing audio into the output file.
    Recording,
    /// Session open, output file kept, capture suspended.
    Paused,
}

impl SessionState {
    /// Lowercase label used in logs and status output.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Recording => "recording",
            SessionState::Paused => "paused",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the capture session for status displays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSnapshot {
    /// Current lifecycle state.
    pub state: SessionState,
    /// Captured time, excluding paused intervals.
    pub elapsed: Duration,
    /// Normalized input level, 0.0 to 1.0.
    pub input_level: f32,
    /// Whether the current pause came from a system interruption.
    pub auto_paused: bool,
}
