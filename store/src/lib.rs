//! Client-side feedback store with offline-first sync.
//!
//! DESIGN
//! ======
//! `FeedbackStore` owns the ordered list of records and mirrors it to a
//! `LocalStorage` backend after every mutation. New records are handed to an
//! optional `OfflineFirstSync`, which posts them to the collection service in
//! the background. Local state is authoritative: nothing the service says
//! flows back into the store.

pub mod storage;
pub mod store;
pub mod sync;

pub use storage::{FileStorage, LocalStorage, MemoryStorage, StorageError};
pub use store::{FeedbackStore, STORAGE_KEY, UNREADABLE_KEY};
pub use sync::{FeedbackSink, HttpSink, OfflineFirstSync, RetryPolicy, SyncError, SyncOutcome};
