//! The client feedback store.
//!
//! DESIGN
//! ======
//! The store is a plain value owned by the front-end's top level and mutated
//! through `&mut self`, so there is one writer and no locking. The list is
//! ordered newest first. Every mutation rewrites the whole list under
//! [`STORAGE_KEY`]; there is no incremental diff.
//!
//! ERROR HANDLING
//! ==============
//! Storage failures are logged and swallowed. A store whose backend is gone
//! keeps working from memory, and `load` on a broken or missing backend
//! starts empty. A stored list that no longer decodes is copied to
//! [`UNREADABLE_KEY`] first, so the next persist cannot destroy it.

use records::FeedbackRecord;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::storage::LocalStorage;
use crate::sync::{OfflineFirstSync, SyncOutcome};

/// Namespaced storage key holding the serialized list.
pub const STORAGE_KEY: &str = "feedbacks_v1";

/// Where an undecodable list is set aside before the store starts empty.
pub const UNREADABLE_KEY: &str = "feedbacks_v1.unreadable";

pub struct FeedbackStore<S: LocalStorage> {
    storage: S,
    records: Vec<FeedbackRecord>,
    sync: Option<OfflineFirstSync>,
}

impl<S: LocalStorage> FeedbackStore<S> {
    /// Read the persisted list from `storage`. Absent, unreadable, or
    /// unparsable data yields an empty store.
    #[must_use]
    pub fn load(mut storage: S) -> Self {
        let records = match storage.get(STORAGE_KEY) {
            Ok(Some(raw)) => match records::decode_list(&raw) {
                Ok(records) => records,
                Err(e) => {
                    warn!(error = %e, key = STORAGE_KEY, backup = UNREADABLE_KEY, "stored feedback unparsable; starting empty");
                    if let Err(e) = storage.set(UNREADABLE_KEY, &raw) {
                        warn!(error = %e, key = UNREADABLE_KEY, "could not set aside unparsable feedback");
                    }
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, key = STORAGE_KEY, "local storage unreadable; starting empty");
                Vec::new()
            }
        };
        debug!(count = records.len(), "feedback store loaded");
        Self { storage, records, sync: None }
    }

    /// Attach a remote sync. Without one the store is purely local.
    #[must_use]
    pub fn with_sync(mut self, sync: OfflineFirstSync) -> Self {
        self.sync = Some(sync);
        self
    }

    /// Records, newest first.
    #[must_use]
    pub fn records(&self) -> &[FeedbackRecord] {
        &self.records
    }

    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&FeedbackRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Create a record, prepend it, persist, and hand a copy to the sync.
    /// Returns without waiting for the sync.
    pub fn create(&mut self, rating: i32, comment: &str) -> FeedbackRecord {
        let record = FeedbackRecord::new(rating, comment);
        self.records.insert(0, record.clone());
        self.persist();

        if let Some(sync) = self.sync.as_mut() {
            sync.dispatch(record.clone());
        }
        record
    }

    /// Drop the record with `id`, then persist. Returns whether a record was
    /// removed; an unknown id leaves the list as it was.
    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        self.persist();
        self.records.len() != before
    }

    /// Write the full list to storage. Failures are logged and ignored.
    pub fn persist(&mut self) {
        let raw = match records::encode_list(&self.records) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "feedback list not serializable; skipping persist");
                return;
            }
        };
        if let Err(e) = self.storage.set(STORAGE_KEY, &raw) {
            warn!(error = %e, key = STORAGE_KEY, count = self.records.len(), "feedback persist failed; keeping in-memory copy");
        }
    }

    /// The "sending" indicator: true while any sync is in flight.
    #[must_use]
    pub fn is_sending(&self) -> bool {
        self.sync.as_ref().is_some_and(OfflineFirstSync::is_sending)
    }

    /// Wait for outstanding syncs and return their outcomes. Nothing in the
    /// store changes as a result.
    pub async fn settle(&mut self) -> Vec<SyncOutcome> {
        match self.sync.as_mut() {
            Some(sync) => sync.settle().await,
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
