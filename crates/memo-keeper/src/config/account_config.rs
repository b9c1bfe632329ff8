use serde::{Deserialize, Serialize};

/// Account the local recordings belong to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Owner id used to partition the pending-upload queue. Generated on first run.
    #[serde(default)]
    pub owner_id: String,
}
