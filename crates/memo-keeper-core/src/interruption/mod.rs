mod event;
mod monitor;

pub use {
    event::{InterruptionEvent, InterruptionOutcome, RouteChangeReason},
    monitor::InterruptionMonitor,
};
