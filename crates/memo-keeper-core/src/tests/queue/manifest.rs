use crate::{
    MANIFEST_VERSION, PendingUploadQueue, StoreError, UploadTrigger, read_manifest,
    tests::support::pending_entry, write_manifest,
};

use chrono::{TimeZone, Utc};
use serde_json::Value;

/// WHAT: The manifest is a versioned document with camelCase fields and ISO dates
/// WHY: Other clients read the same file; the format is a contract
#[test]
#[allow(clippy::unwrap_used)]
fn given_entries_when_writing_manifest_then_canonical_document() {
    // Given: One pending entry
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pending-uploads.json");
    let entry = pending_entry("owner-a", dir.path().join("a.wav"));

    // When: Writing the manifest
    write_manifest(&path, std::slice::from_ref(&entry)).unwrap();

    // Then: version 2, camelCase keys, RFC 3339 date, no temp file left
    let document: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(document["version"], MANIFEST_VERSION);
    let stored = &document["entries"][0];
    assert_eq!(stored["ownerId"], "owner-a");
    assert_eq!(stored["createdAt"], "2026-03-01T09:30:00Z");
    assert_eq!(stored["uploadTrigger"], "explicitStop");
    assert_eq!(stored["durationMinutes"], 1.5);
    assert!(stored.get("remoteDestinationPath").is_some());
    assert!(!dir.path().join("pending-uploads.json.tmp").exists());
    assert_eq!(read_manifest(&path).unwrap(), Some(vec![entry]));
}

/// WHAT: The legacy bare-array layout with epoch-second dates still loads
/// WHY: Upgrading must not lose recordings queued by an older build
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_legacy_manifest_when_loading_then_migrated_on_next_write() {
    // Given: A bare-array manifest with epoch seconds and no durationMinutes
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pending-uploads.json");
    let legacy = r#"[{
        "id": "6f9619ff-8b86-4011-b42d-00c04fc964ff",
        "ownerId": "owner-a",
        "title": "Recording",
        "createdAt": 1772357400,
        "remoteDestinationPath": "owner-a/recordings/6f9619ff-8b86-4011-b42d-00c04fc964ff.wav",
        "localFilePath": "/tmp/a.wav",
        "uploadTrigger": "explicitStop"
    }]"#;
    std::fs::write(&path, legacy).unwrap();
    let queue = PendingUploadQueue::new(&path);

    // When: Loading, then mutating
    let mut entries = queue.load("owner-a").await;
    assert_eq!(entries.len(), 1);
    let entry = entries.remove(0);
    assert_eq!(
        entry.created_at,
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).single().unwrap()
    );
    assert_eq!(entry.duration_minutes, None);
    queue
        .upsert(entry.with_trigger(UploadTrigger::Retry))
        .await
        .unwrap();

    // Then: The file is rewritten in the versioned layout with an ISO date
    let document: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(document["version"], MANIFEST_VERSION);
    assert_eq!(document["entries"][0]["createdAt"], "2026-03-01T09:30:00Z");
    assert_eq!(document["entries"][0]["uploadTrigger"], "retry");
}

/// WHAT: A missing manifest reads as absent, a garbage one as a serialization error
/// WHY: The queue distinguishes first run from corruption
#[test]
#[allow(clippy::unwrap_used)]
fn given_missing_or_garbage_manifest_when_reading_then_none_or_error() {
    // Given: No manifest, then a garbage manifest
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pending-uploads.json");

    // When/Then: Missing reads as None
    assert!(read_manifest(&path).unwrap().is_none());

    // When/Then: Garbage is a serialization error
    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        read_manifest(&path),
        Err(StoreError::Serialization { .. })
    ));
}
