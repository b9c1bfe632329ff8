//! Configuration management for memo-keeper.
//!
//! Handles loading and saving TOML configuration files with cross-platform
//! paths and atomic write operations.

use crate::{
    AppError, AppResult,
    config::{AccountConfig, RecordingConfig, RelayConfig, StorageConfig, UploadConfig},
};

use std::{
    fs,
    io::Write,
    panic::Location,
    path::{Path, PathBuf},
    time::Duration,
};

use directories::ProjectDirs;
use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Account settings.
    #[serde(default)]
    pub account: AccountConfig,
    /// Data directory settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Remote control relay settings.
    #[serde(default)]
    pub relay: RelayConfig,
    /// Upload settings.
    #[serde(default)]
    pub upload: UploadConfig,
    /// Recording metadata settings.
    #[serde(default)]
    pub recording: RecordingConfig,
}

impl Config {
    /// Load configuration from the platform config directory, creating it if missing.
    #[track_caller]
    #[instrument]
    pub fn load() -> AppResult<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from `config_path`.
    ///
    /// A missing file yields defaults. A fresh owner id is generated and the
    /// file saved whenever none is recorded yet.
    #[track_caller]
    pub fn load_from(config_path: &Path) -> AppResult<Self> {
        let mut config = if config_path.exists() {
            let contents = fs::read_to_string(config_path).map_err(|e| AppError::ConfigError {
                reason: format!("Failed to read config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

            let config: Config = toml::from_str(&contents).map_err(|e| AppError::ConfigError {
                reason: format!("Failed to parse config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

            info!(config_path = ?config_path, "Configuration loaded");
            config
        } else {
            info!(config_path = ?config_path, "No config found, creating default");
            Config::default()
        };

        if config.ensure_owner_id() {
            config.save_to(config_path)?;
        }

        Ok(config)
    }

    /// Save configuration using the atomic write pattern.
    ///
    /// Writes to a temporary file first, then renames to prevent corruption
    /// if the process crashes during the write.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn save_to(&self, config_path: &Path) -> AppResult<()> {
        let contents = toml::to_string_pretty(self).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if let Some(config_dir) = config_path.parent()
            && !config_dir.exists()
        {
            fs::create_dir_all(config_dir)?;
            debug!(config_dir = ?config_dir, "Created config directory");
        }

        let temp_path = config_path.with_extension("toml.tmp");

        let mut temp_file = fs::File::create(&temp_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to create temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        temp_file
            .write_all(contents.as_bytes())
            .map_err(|e| AppError::ConfigError {
                reason: format!("Failed to write temp config file: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        temp_file.sync_all().map_err(|e| AppError::ConfigError {
            reason: format!("Failed to sync temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        fs::rename(&temp_path, config_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to rename temp config to final: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?config_path, "Configuration saved (atomic write)");

        Ok(())
    }

    /// Assign an owner id if none is set. Returns whether one was generated.
    pub fn ensure_owner_id(&mut self) -> bool {
        if !self.account.owner_id.trim().is_empty() {
            return false;
        }
        self.account.owner_id = Uuid::new_v4().to_string();
        info!(owner_id = %self.account.owner_id, "Generated owner id");
        true
    }

    /// Data root: the configured override or the platform data directory.
    #[track_caller]
    pub fn data_dir(&self) -> AppResult<PathBuf> {
        match self.storage.data_dir.as_ref() {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::project_dirs()?.data_dir().to_path_buf()),
        }
    }

    /// Folder the development uploader copies recordings into.
    pub fn remote_root(&self, data_dir: &Path) -> PathBuf {
        self.upload
            .remote_root
            .clone()
            .unwrap_or_else(|| data_dir.join("remote"))
    }

    /// Mailbox poll period, at least one millisecond.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.relay.poll_interval_ms.max(1))
    }

    /// Retry period for retained uploads, at least one second.
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.upload.retry_interval_secs.max(1))
    }

    #[track_caller]
    fn project_dirs() -> AppResult<ProjectDirs> {
        ProjectDirs::from("com", "memo-keeper", "Memo-Keeper").ok_or_else(|| {
            AppError::ConfigError {
                reason: "Failed to get project directories".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }
        })
    }

    #[track_caller]
    fn config_path() -> AppResult<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }
}
