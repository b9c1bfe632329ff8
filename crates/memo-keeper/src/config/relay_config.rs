use crate::config::default_poll_interval_ms;

use serde::{Deserialize, Serialize};

/// Remote control mailbox polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Mailbox poll period in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}
