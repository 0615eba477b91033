use std::sync::{Arc, Mutex};

use super::*;
use crate::storage::{MemoryStorage, StorageError};
use crate::sync::{FeedbackSink, RetryPolicy, SyncError};

/// Decode what the backend holds and compare it with the in-memory list.
fn assert_converged<S: LocalStorage>(store: &FeedbackStore<S>) {
    let raw = store.storage().get(STORAGE_KEY).unwrap().expect("list persisted");
    let persisted = records::decode_list(&raw).unwrap();
    assert_eq!(persisted, store.records());
}

#[derive(Default)]
struct RecordingSink {
    sent: Mutex<Vec<FeedbackRecord>>,
}

#[async_trait::async_trait]
impl FeedbackSink for RecordingSink {
    async fn send(&self, record: &FeedbackRecord) -> Result<(), SyncError> {
        self.sent.lock().unwrap().push(record.clone());
        Ok(())
    }
}

struct UnreachableSink;

#[async_trait::async_trait]
impl FeedbackSink for UnreachableSink {
    async fn send(&self, _record: &FeedbackRecord) -> Result<(), SyncError> {
        Err(SyncError::Sink("connection refused".to_owned()))
    }
}

/// Backend that reads fine but rejects every write.
#[derive(Default)]
struct ReadOnlyStorage;

impl LocalStorage for ReadOnlyStorage {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn set(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::QuotaExceeded { needed: 1, quota: 0 })
    }
}

// =============================================================================
// load
// =============================================================================

#[test]
fn load_empty_backend_starts_empty() {
    let store = FeedbackStore::load(MemoryStorage::new());
    assert!(store.is_empty());
}

#[test]
fn load_unparsable_data_starts_empty() {
    let mut storage = MemoryStorage::new();
    storage.set(STORAGE_KEY, "{not json").unwrap();
    let store = FeedbackStore::load(storage);
    assert!(store.is_empty());
}

#[test]
fn unparsable_list_survives_next_persist() {
    let legacy = r#"[{"id":1714566600000,"rating":4,"comment":"old","createdAt":"2024-05-01T12:30:00.000Z"}]"#;
    let mut storage = MemoryStorage::new();
    storage.set(STORAGE_KEY, legacy).unwrap();

    let mut store = FeedbackStore::load(storage);
    assert!(store.is_empty());
    store.create(5, "fresh");

    assert_eq!(store.storage().get(UNREADABLE_KEY).unwrap().as_deref(), Some(legacy));
    assert_converged(&store);
}

#[test]
fn load_disabled_backend_starts_empty() {
    let store = FeedbackStore::load(MemoryStorage::disabled());
    assert!(store.is_empty());
}

#[test]
fn load_restores_previous_session_in_order() {
    let mut first = FeedbackStore::load(MemoryStorage::new());
    let older = first.create(5, "older");
    let newer = first.create(2, "newer");

    let raw = first.storage().get(STORAGE_KEY).unwrap().unwrap();
    let mut storage = MemoryStorage::new();
    storage.set(STORAGE_KEY, &raw).unwrap();

    let second = FeedbackStore::load(storage);
    assert_eq!(second.records(), [newer, older].as_slice());
}

// =============================================================================
// create / remove
// =============================================================================

#[test]
fn create_remove_scenario() {
    let mut store = FeedbackStore::load(MemoryStorage::new());

    store.create(5, "Great");
    assert_eq!(store.len(), 1);
    assert_eq!(store.records()[0].rating, 5);

    store.create(3, "");
    let ratings: Vec<i32> = store.records().iter().map(|r| r.rating).collect();
    assert_eq!(ratings, vec![3, 5]);

    let first = store.records()[0].id;
    assert!(store.remove(first));
    assert_eq!(store.len(), 1);
    assert_eq!(store.records()[0].rating, 5);
    assert_eq!(store.records()[0].comment, "Great");
}

#[test]
fn create_with_empty_comment_stores_empty_string() {
    let mut store = FeedbackStore::load(MemoryStorage::new());
    let record = store.create(4, "   ");
    assert_eq!(record.comment, "");

    let raw = store.storage().get(STORAGE_KEY).unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json[0]["comment"], serde_json::json!(""));
}

#[test]
fn remove_unknown_id_is_noop() {
    let mut store = FeedbackStore::load(MemoryStorage::new());
    store.create(1, "a");
    store.create(2, "b");
    let before = store.records().to_vec();

    assert!(!store.remove(Uuid::new_v4()));
    assert_eq!(store.records(), before.as_slice());
    assert_converged(&store);
}

#[test]
fn persisted_copy_matches_memory_after_every_mutation() {
    let mut store = FeedbackStore::load(MemoryStorage::new());
    let mut ids = Vec::new();

    for (i, rating) in [5, 1, 4, 2, 3, 5].into_iter().enumerate() {
        let record = store.create(rating, &format!("comment {i}"));
        ids.push(record.id);
        assert_converged(&store);

        if i % 2 == 1 {
            store.remove(ids[i / 2]);
            assert_converged(&store);
        }
    }

    store.remove(Uuid::new_v4());
    assert_converged(&store);
    for id in ids {
        store.remove(id);
        assert_converged(&store);
    }
    assert!(store.is_empty());
}

#[test]
fn disabled_storage_still_updates_memory() {
    let mut store = FeedbackStore::load(MemoryStorage::disabled());
    let record = store.create(5, "offline");
    assert_eq!(store.records(), [record.clone()].as_slice());

    assert!(store.remove(record.id));
    assert!(store.is_empty());
}

#[test]
fn failed_write_keeps_in_memory_list() {
    let mut store = FeedbackStore::load(ReadOnlyStorage);
    store.create(2, "quota");
    store.create(3, "quota again");
    assert_eq!(store.len(), 2);
}

#[test]
fn get_finds_record_by_id() {
    let mut store = FeedbackStore::load(MemoryStorage::new());
    let record = store.create(4, "find me");
    assert_eq!(store.get(record.id), Some(&record));
    assert!(store.get(Uuid::new_v4()).is_none());
}

// =============================================================================
// sync
// =============================================================================

#[tokio::test]
async fn create_dispatches_copy_to_sink() {
    let sink = Arc::new(RecordingSink::default());
    let mut store = FeedbackStore::load(MemoryStorage::new()).with_sync(OfflineFirstSync::new(sink.clone()));

    let record = store.create(5, "Great");
    let outcomes = store.settle().await;

    assert_eq!(outcomes, vec![SyncOutcome::Delivered { id: record.id, attempts: 1 }]);
    assert_eq!(sink.sent.lock().unwrap().as_slice(), [record].as_slice());
    assert!(!store.is_sending());
}

#[tokio::test]
async fn unreachable_remote_does_not_affect_local_state() {
    let sync = OfflineFirstSync::new(Arc::new(UnreachableSink)).with_policy(RetryPolicy::none());
    let mut store = FeedbackStore::load(MemoryStorage::new()).with_sync(sync);

    let record = store.create(3, "offline first");
    assert_eq!(store.records(), [record.clone()].as_slice());
    assert_converged(&store);

    let outcomes = store.settle().await;
    assert_eq!(outcomes.len(), 1);
    assert!(!outcomes[0].is_delivered());
    assert_eq!(store.records(), [record].as_slice());
}

#[tokio::test]
async fn remove_never_calls_sink() {
    let sink = Arc::new(RecordingSink::default());
    let mut store = FeedbackStore::load(MemoryStorage::new()).with_sync(OfflineFirstSync::new(sink.clone()));

    let record = store.create(1, "short lived");
    store.settle().await;
    store.remove(record.id);
    store.settle().await;

    assert_eq!(sink.sent.lock().unwrap().len(), 1);
}

#[test]
fn create_without_runtime_stays_local() {
    let sink = Arc::new(RecordingSink::default());
    let mut store = FeedbackStore::load(MemoryStorage::new()).with_sync(OfflineFirstSync::new(sink.clone()));

    store.create(5, "no runtime");
    assert_eq!(store.len(), 1);
    assert!(!store.is_sending());
    assert!(sink.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn settle_without_sync_is_empty() {
    let mut store = FeedbackStore::load(MemoryStorage::new());
    store.create(5, "local only");
    assert!(store.settle().await.is_empty());
    assert!(!store.is_sending());
}
