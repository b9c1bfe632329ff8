use crate::{PendingRecording, StoreError, StoreResult};

use std::{
    fs,
    io::{ErrorKind, Write},
    panic::Location,
    path::Path,
};

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Current on-disk manifest layout.
pub const MANIFEST_VERSION: u32 = 2;

#[derive(Serialize)]
struct ManifestDocument<'a> {
    version: u32,
    entries: &'a [PendingRecording],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredManifest {
    Versioned {
        version: u32,
        entries: Vec<PendingRecording>,
    },
    /// Version 1 stored the entries as a bare array.
    Legacy(Vec<PendingRecording>),
}

/// Read every entry in the manifest. `Ok(None)` when the file does not exist.
///
/// Accepts the legacy bare-array layout and epoch-second dates; both are
/// rewritten canonically by the next [`write_manifest`].
///
/// # Errors
///
/// `StoreError::Io` when the file cannot be read, `StoreError::Serialization`
/// when it is not a manifest.
#[track_caller]
pub fn read_manifest(path: &Path) -> StoreResult<Option<Vec<PendingRecording>>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };

    if contents.trim().is_empty() {
        return Ok(Some(Vec::new()));
    }

    let stored: StoredManifest =
        serde_json::from_str(&contents).map_err(|e| StoreError::Serialization {
            reason: format!("Failed to parse manifest {:?}: {}", path, e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let entries = match stored {
        StoredManifest::Versioned { version, entries } => {
            if version > MANIFEST_VERSION {
                warn!(
                    version,
                    supported = MANIFEST_VERSION,
                    "Manifest written by a newer version, reading known fields only"
                );
            }
            entries
        }
        StoredManifest::Legacy(entries) => {
            info!(count = entries.len(), "Legacy manifest layout found, will migrate on next write");
            entries
        }
    };

    debug!(path = ?path, count = entries.len(), "Manifest read");

    Ok(Some(entries))
}

/// Atomically replace the manifest: temp file, fsync, rename.
///
/// # Errors
///
/// `StoreError::Serialization` if encoding fails, `StoreError::Io` for any
/// filesystem step.
#[track_caller]
pub fn write_manifest(path: &Path, entries: &[PendingRecording]) -> StoreResult<()> {
    let document = ManifestDocument {
        version: MANIFEST_VERSION,
        entries,
    };
    let contents =
        serde_json::to_string_pretty(&document).map_err(|e| StoreError::Serialization {
            reason: format!("Failed to encode manifest: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let temp_path = path.with_extension("json.tmp");

    let mut temp_file = fs::File::create(&temp_path).map_err(|e| StoreError::io(&temp_path, e))?;
    temp_file
        .write_all(contents.as_bytes())
        .map_err(|e| StoreError::io(&temp_path, e))?;
    temp_file
        .sync_all()
        .map_err(|e| StoreError::io(&temp_path, e))?;
    drop(temp_file);

    fs::rename(&temp_path, path).map_err(|e| StoreError::io(path, e))?;

    debug!(path = ?path, count = entries.len(), "Manifest written (atomic)");

    Ok(())
}

/// RFC 3339 dates on write; RFC 3339 strings or Unix epoch seconds on read.
pub(crate) mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StoredDate {
        Text(String),
        EpochSeconds(f64),
    }

    pub(crate) fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match StoredDate::deserialize(deserializer)? {
            StoredDate::Text(text) => DateTime::parse_from_rfc3339(&text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| D::Error::custom(format!("invalid date {:?}: {}", text, e))),
            StoredDate::EpochSeconds(seconds) => from_epoch_seconds(seconds)
                .ok_or_else(|| D::Error::custom(format!("epoch seconds out of range: {}", seconds))),
        }
    }

    fn from_epoch_seconds(seconds: f64) -> Option<DateTime<Utc>> {
        if !seconds.is_finite() {
            return None;
        }
        let whole = seconds.floor();
        let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
        DateTime::from_timestamp(whole as i64, nanos)
    }
}
