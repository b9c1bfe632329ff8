use crate::{
    PendingRecording, StoreError, StoreResult,
    queue::{read_manifest, write_manifest},
};

use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

/// Durable, per-owner list of recordings not yet confirmed uploaded.
///
/// One manifest holds every owner's partition. Each operation runs its
/// load-modify-save cycle under a single async mutex. When a save fails the
/// in-memory view keeps the change and is trusted until the next [`Self::load`].
pub struct PendingUploadQueue {
    manifest_path: PathBuf,
    entries: Mutex<Option<Vec<PendingRecording>>>,
}

impl PendingUploadQueue {
    /// Queue backed by the manifest at `manifest_path`. Nothing is read yet.
    pub fn new(manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            entries: Mutex::new(None),
        }
    }

    /// Manifest location.
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Re-read the manifest and return `owner_id`'s entries.
    ///
    /// Never fails: a missing or unreadable manifest yields an empty list.
    #[instrument(skip(self))]
    pub async fn load(&self, owner_id: &str) -> Vec<PendingRecording> {
        let mut guard = self.entries.lock().await;
        let all = guard.insert(self.read_from_disk());

        let owned: Vec<PendingRecording> = all
            .iter()
            .filter(|entry| entry.owner_id == owner_id)
            .cloned()
            .collect();

        debug!(count = owned.len(), "Pending uploads loaded");

        owned
    }

    /// The owner's entries as currently held in memory, reading the manifest
    /// only if nothing is cached yet.
    pub async fn entries(&self, owner_id: &str) -> Vec<PendingRecording> {
        let mut guard = self.entries.lock().await;
        self.cached(&mut guard)
            .iter()
            .filter(|entry| entry.owner_id == owner_id)
            .cloned()
            .collect()
    }

    /// Look up one entry.
    pub async fn get(&self, id: Uuid, owner_id: &str) -> Option<PendingRecording> {
        let mut guard = self.entries.lock().await;
        self.cached(&mut guard)
            .iter()
            .find(|entry| entry.id == id && entry.owner_id == owner_id)
            .cloned()
    }

    /// Insert or replace by id.
    ///
    /// # Errors
    ///
    /// Returns the save error; the entry is still held in memory.
    #[instrument(skip(self, entry), fields(recording_id = %entry.id, trigger = ?entry.upload_trigger))]
    pub async fn upsert(&self, entry: PendingRecording) -> StoreResult<()> {
        let mut guard = self.entries.lock().await;
        let all = self.cached(&mut guard);

        match all.iter_mut().find(|existing| existing.id == entry.id) {
            Some(existing) => *existing = entry,
            None => all.push(entry),
        }

        self.persist(all)
    }

    /// Delete by id within the owner's partition. Returns whether an entry was removed.
    ///
    /// # Errors
    ///
    /// Returns the save error; the removal is still applied in memory.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: Uuid, owner_id: &str) -> StoreResult<bool> {
        let mut guard = self.entries.lock().await;
        let all = self.cached(&mut guard);

        let before = all.len();
        all.retain(|entry| !(entry.id == id && entry.owner_id == owner_id));
        if all.len() == before {
            debug!("Nothing to remove");
            return Ok(false);
        }

        self.persist(all)?;
        Ok(true)
    }

    /// Rewrite the owner's partition with `entries`. Other owners are untouched.
    ///
    /// Entries belonging to another owner are ignored; duplicate ids keep the last one.
    ///
    /// # Errors
    ///
    /// Returns the save error; the new partition is still held in memory.
    #[instrument(skip(self, entries), fields(count = entries.len()))]
    pub async fn replace(&self, entries: Vec<PendingRecording>, owner_id: &str) -> StoreResult<()> {
        let mut guard = self.entries.lock().await;
        let all = self.cached(&mut guard);

        all.retain(|entry| entry.owner_id != owner_id);

        let mut partition: Vec<PendingRecording> = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.owner_id != owner_id {
                warn!(recording_id = %entry.id, "Skipping entry for another owner");
                continue;
            }
            match partition.iter_mut().find(|existing| existing.id == entry.id) {
                Some(existing) => *existing = entry,
                None => partition.push(entry),
            }
        }
        all.extend(partition);

        self.persist(all)
    }

    fn cached<'a>(&self, guard: &'a mut Option<Vec<PendingRecording>>) -> &'a mut Vec<PendingRecording> {
        guard.get_or_insert_with(|| self.read_from_disk())
    }

    fn read_from_disk(&self) -> Vec<PendingRecording> {
        match read_manifest(&self.manifest_path) {
            Ok(Some(entries)) => entries,
            Ok(None) => Vec::new(),
            Err(e @ StoreError::Serialization { .. }) => {
                error!(error = %e, "Manifest unreadable, starting empty");
                self.quarantine();
                Vec::new()
            }
            Err(e) => {
                error!(error = %e, "Failed to read manifest, starting empty");
                Vec::new()
            }
        }
    }

    /// Move a corrupt manifest aside so the next save does not destroy it.
    fn quarantine(&self) {
        let mut name = self
            .manifest_path
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push(format!(".corrupt-{}", Utc::now().format("%Y%m%d%H%M%S")));
        let target = self.manifest_path.with_file_name(name);

        match fs::rename(&self.manifest_path, &target) {
            Ok(()) => warn!(target = ?target, "Corrupt manifest moved aside"),
            Err(e) => warn!(error = %e, "Failed to move corrupt manifest aside"),
        }
    }

    fn persist(&self, all: &[PendingRecording]) -> StoreResult<()> {
        write_manifest(&self.manifest_path, all).map_err(|e| {
            warn!(error = %e, "Manifest save failed, keeping in-memory view");
            e
        })?;
        debug!(total = all.len(), "Pending uploads saved");
        Ok(())
    }
}
