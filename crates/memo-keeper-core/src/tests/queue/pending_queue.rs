use crate::{PendingUploadQueue, UploadTrigger, tests::support::pending_entry};

use std::{collections::HashSet, sync::Arc};

use tokio::task::JoinSet;
use uuid::Uuid;

/// WHAT: Upserted entries survive a new queue instance
/// WHY: The queue must outlive process termination
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_upserted_entry_when_reloaded_from_disk_then_present() {
    // Given: An entry upserted through one queue
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pending-uploads.json");
    let entry = pending_entry("owner-a", dir.path().join("a.wav"));
    PendingUploadQueue::new(&path)
        .upsert(entry.clone())
        .await
        .unwrap();

    // When: A fresh queue loads the owner's partition
    let loaded = PendingUploadQueue::new(&path).load("owner-a").await;

    // Then: The same entry comes back
    assert_eq!(loaded, vec![entry]);
}

/// WHAT: Upsert replaces an existing entry by id
/// WHY: Retries update the trigger without duplicating the recording
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_existing_entry_when_upserted_again_then_replaced() {
    // Given: A queued entry
    let dir = tempfile::tempdir().unwrap();
    let queue = PendingUploadQueue::new(dir.path().join("pending-uploads.json"));
    let entry = pending_entry("owner-a", dir.path().join("a.wav"));
    queue.upsert(entry.clone()).await.unwrap();

    // When: Upserting it with a new trigger
    queue
        .upsert(entry.clone().with_trigger(UploadTrigger::Retry))
        .await
        .unwrap();

    // Then: One entry with the new trigger
    let loaded = queue.load("owner-a").await;
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].upload_trigger, UploadTrigger::Retry);
}

/// WHAT: Removal is idempotent
/// WHY: Upload confirmation may be delivered more than once
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_queued_entry_when_removed_twice_then_second_is_noop() {
    // Given: A queued entry
    let dir = tempfile::tempdir().unwrap();
    let queue = PendingUploadQueue::new(dir.path().join("pending-uploads.json"));
    let entry = pending_entry("owner-a", dir.path().join("a.wav"));
    queue.upsert(entry.clone()).await.unwrap();

    // When: Removing twice
    let first = queue.remove(entry.id, "owner-a").await.unwrap();
    let second = queue.remove(entry.id, "owner-a").await.unwrap();

    // Then: Removed once, queue empty
    assert!(first);
    assert!(!second);
    assert!(queue.load("owner-a").await.is_empty());
}

/// WHAT: Partitions are isolated per owner
/// WHY: A shared device must not upload one account's audio to another
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_two_owners_when_replacing_one_partition_then_other_untouched() {
    // Given: One entry for each of two owners
    let dir = tempfile::tempdir().unwrap();
    let queue = PendingUploadQueue::new(dir.path().join("pending-uploads.json"));
    let a = pending_entry("owner-a", dir.path().join("a.wav"));
    let b = pending_entry("owner-b", dir.path().join("b.wav"));
    queue.upsert(a.clone()).await.unwrap();
    queue.upsert(b.clone()).await.unwrap();

    // When: Replacing owner-a's partition with a new entry plus a foreign one
    let a2 = pending_entry("owner-a", dir.path().join("a2.wav"));
    let foreign = pending_entry("owner-b", dir.path().join("x.wav"));
    queue
        .replace(vec![a2.clone(), foreign.clone()], "owner-a")
        .await
        .unwrap();

    // Then: owner-a holds only a2; owner-b still holds only b
    assert_eq!(queue.load("owner-a").await, vec![a2]);
    assert_eq!(queue.load("owner-b").await, vec![b]);
    assert!(!queue.remove(a.id, "owner-b").await.unwrap());
    assert!(queue.get(foreign.id, "owner-b").await.is_none());
}

/// WHAT: A missing or corrupt manifest loads as empty and is preserved aside
/// WHY: load never fails, and a corrupt file must not be silently destroyed
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_corrupt_manifest_when_loading_then_empty_and_quarantined() {
    // Given: No manifest, then a corrupt one
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pending-uploads.json");
    let queue = PendingUploadQueue::new(&path);
    assert!(queue.load("owner-a").await.is_empty());
    std::fs::write(&path, "[{ truncated").unwrap();

    // When: Loading
    let loaded = queue.load("owner-a").await;

    // Then: Empty, and the corrupt bytes are kept in a sibling file
    assert!(loaded.is_empty());
    assert!(!path.exists());
    let quarantined = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .any(|e| e.file_name().to_string_lossy().contains(".corrupt-"));
    assert!(quarantined);
}

/// WHAT: A failed save keeps the in-memory view
/// WHY: Write failures are logged; the entry must still reach the uploader
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_unwritable_manifest_when_upserting_then_error_but_entry_kept() {
    // Given: A manifest path whose parent is a regular file
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let queue = PendingUploadQueue::new(blocker.join("pending-uploads.json"));
    let entry = pending_entry("owner-a", dir.path().join("a.wav"));

    // When: Upserting
    let result = queue.upsert(entry.clone()).await;

    // Then: The save fails, the entry is still visible in memory
    assert!(result.is_err());
    assert_eq!(queue.entries("owner-a").await, vec![entry.clone()]);
    assert_eq!(queue.get(entry.id, "owner-a").await, Some(entry));
    assert!(queue.get(Uuid::new_v4(), "owner-a").await.is_none());
}

/// WHAT: Concurrent upserts and removes all land in the saved manifest
/// WHY: Writers are serialized, so no update may be lost to a racing save
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[allow(clippy::unwrap_used)]
async fn given_concurrent_writers_when_reloaded_then_exactly_expected_ids() {
    // Given: Twenty entries upserted concurrently
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pending-uploads.json");
    let queue = Arc::new(PendingUploadQueue::new(&path));
    let first: Vec<_> = (0..20)
        .map(|i| pending_entry("owner-a", dir.path().join(format!("{}.wav", i))))
        .collect();
    let mut writers = JoinSet::new();
    for entry in first.clone() {
        let queue = Arc::clone(&queue);
        writers.spawn(async move { queue.upsert(entry).await.map(|_| ()) });
    }
    while let Some(result) = writers.join_next().await {
        result.unwrap().unwrap();
    }

    // When: Half are removed while ten more are upserted, all at once
    let second: Vec<_> = (20..30)
        .map(|i| pending_entry("owner-a", dir.path().join(format!("{}.wav", i))))
        .collect();
    let mut writers = JoinSet::new();
    for entry in first.iter().step_by(2) {
        let (queue, id) = (Arc::clone(&queue), entry.id);
        writers.spawn(async move { queue.remove(id, "owner-a").await.map(|_| ()) });
    }
    for entry in second.clone() {
        let queue = Arc::clone(&queue);
        writers.spawn(async move { queue.upsert(entry).await });
    }
    while let Some(result) = writers.join_next().await {
        result.unwrap().unwrap();
    }

    // Then: A fresh load sees exactly the survivors and the additions
    let expected: HashSet<Uuid> = first
        .iter()
        .skip(1)
        .step_by(2)
        .chain(second.iter())
        .map(|entry| entry.id)
        .collect();
    let loaded = PendingUploadQueue::new(&path).load("owner-a").await;
    let loaded_ids: HashSet<Uuid> = loaded.iter().map(|entry| entry.id).collect();
    assert_eq!(loaded.len(), 20);
    assert_eq!(loaded_ids, expected);
}
