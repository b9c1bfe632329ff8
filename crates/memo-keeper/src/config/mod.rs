mod account_config;
#[allow(clippy::module_inception)]
mod config;
mod recording_config;
mod relay_config;
mod storage_config;
mod upload_config;

pub(crate) use {
    account_config::AccountConfig, config::Config, recording_config::RecordingConfig,
    relay_config::RelayConfig, storage_config::StorageConfig, upload_config::UploadConfig,
};

pub(crate) const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
pub(crate) const DEFAULT_RETRY_INTERVAL_SECS: u64 = 300;
pub(crate) const DEFAULT_TITLE_PREFIX: &str = "Recording";

pub(crate) fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

pub(crate) fn default_retry_interval_secs() -> u64 {
    DEFAULT_RETRY_INTERVAL_SECS
}

pub(crate) fn default_title_prefix() -> String {
    DEFAULT_TITLE_PREFIX.to_string()
}
