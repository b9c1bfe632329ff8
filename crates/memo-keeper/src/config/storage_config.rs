use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where recordings, the manifest and the mailbox live.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data root override (None = platform data directory).
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}
