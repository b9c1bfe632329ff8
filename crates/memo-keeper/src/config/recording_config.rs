use crate::config::default_title_prefix;

use serde::{Deserialize, Serialize};

/// Recording metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Prefix of generated titles, followed by the local start time.
    #[serde(default = "default_title_prefix")]
    pub title_prefix: String,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            title_prefix: default_title_prefix(),
        }
    }
}
