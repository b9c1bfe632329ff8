use crate::config::default_retry_interval_secs;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Upload destination and retry cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Folder standing in for the remote store (None = `<data_dir>/remote`).
    #[serde(default)]
    pub remote_root: Option<PathBuf>,

    /// Seconds between retry passes over retained uploads.
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            remote_root: None,
            retry_interval_secs: default_retry_interval_secs(),
        }
    }
}
