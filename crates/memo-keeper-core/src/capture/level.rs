use crate::capture::SessionHandle;

use std::time::Duration;

use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};
use tracing::debug;

/// Level sampling period (8 Hz).
pub const METER_INTERVAL: Duration = Duration::from_millis(125);

/// Lowest dBFS value the meter distinguishes; anything quieter reads as the floor.
pub const METER_FLOOR_DB: f32 = -80.0;

/// Map a dBFS reading onto the 0.0 to 1.0 amplitude scale: `10^(clamp(dB, -80, 0) / 20)`.
pub fn normalize_db(db: f32) -> f32 {
    if db.is_nan() {
        return 0.0;
    }
    10f32.powf(db.clamp(METER_FLOOR_DB, 0.0) / 20.0)
}

/// RMS power of an audio block in dBFS.
pub(crate) fn rms_db(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return METER_FLOOR_DB;
    }
    let energy: f32 = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    let rms = energy.sqrt().max(1e-6);
    20.0 * rms.log10()
}

/// Spawn the periodic sampler that refreshes the session's input level.
///
/// Runs until `shutdown_rx` flips to `true` or its sender is dropped.
pub fn spawn_level_meter(
    session: SessionHandle,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(METER_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    session.lock().await.sample_level();
                }
            }
        }

        debug!("Level meter stopped");
    })
}
