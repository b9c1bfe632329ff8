/// Why the audio route changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteChangeReason {
    /// A new input became available (e.g. headset plugged in).
    DeviceConnected,
    /// The active input went away.
    DeviceDisconnected,
    /// The platform changed the session configuration.
    ConfigurationChanged,
}

/// System-level events that preempt audio capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptionEvent {
    /// Another audio client took the input (incoming call, alarm).
    Began,
    /// The interruption is over.
    Ended {
        /// The platform considers it appropriate to resume capture.
        should_resume: bool,
    },
    /// Input or output route changed.
    RouteChanged {
        /// What triggered the change.
        reason: RouteChangeReason,
    },
    /// The platform audio service was reset; open streams are gone.
    MediaServicesReset,
}

/// What the monitor did in response to an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterruptionOutcome {
    /// The session was recording and is now paused for auto-resume.
    AutoPaused,
    /// The session resumed after an interruption it was auto-paused for.
    AutoResumed,
    /// Auto-resume was attempted but the input could not be re-acquired.
    ResumeFailed(String),
    /// The audio session configuration was re-applied.
    RouteReapplied,
    /// The session was aborted and reset to idle.
    HardReset,
    /// Nothing to do for the current state.
    Ignored,
}
