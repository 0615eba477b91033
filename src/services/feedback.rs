//! Feedback service — document storage for submitted feedback.
//!
//! DESIGN
//! ======
//! Each record is stored whole, as a JSON document keyed by its id. Route
//! handlers talk to a `FeedbackRepository` trait object so the backing store
//! can be Postgres, an in-process list, or a placeholder for a database that
//! never came up.
//!
//! ERROR HANDLING
//! ==============
//! A failed startup connection is not fatal: the offline repository answers
//! every call with `FeedbackError::Unavailable` so the process stays up and
//! the client keeps working from its local copy.

use async_trait::async_trait;
use records::FeedbackRecord;
use sqlx::PgPool;
use sqlx::types::Json;
use tokio::sync::RwLock;
use uuid::Uuid;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    #[error("feedback not found: {0}")]
    NotFound(Uuid),
    #[error("feedback storage unavailable")]
    Unavailable,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Storage seam for feedback documents. List order is newest first.
#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    /// Store `record`, replacing any existing record with the same id.
    async fn insert(&self, record: FeedbackRecord) -> Result<FeedbackRecord, FeedbackError>;

    async fn list(&self) -> Result<Vec<FeedbackRecord>, FeedbackError>;

    async fn get(&self, id: Uuid) -> Result<FeedbackRecord, FeedbackError>;

    async fn delete(&self, id: Uuid) -> Result<(), FeedbackError>;
}

// =============================================================================
// POSTGRES
// =============================================================================

pub struct PgFeedbackRepository {
    pool: PgPool,
}

impl PgFeedbackRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeedbackRepository for PgFeedbackRepository {
    async fn insert(&self, record: FeedbackRecord) -> Result<FeedbackRecord, FeedbackError> {
        sqlx::query(
            "INSERT INTO feedback (id, doc) VALUES ($1, $2)
             ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc",
        )
        .bind(record.id)
        .bind(Json(&record))
        .execute(&self.pool)
        .await?;
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<FeedbackRecord>, FeedbackError> {
        let rows = sqlx::query_as::<_, (Json<FeedbackRecord>,)>("SELECT doc FROM feedback ORDER BY inserted_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(doc,)| doc.0).collect())
    }

    async fn get(&self, id: Uuid) -> Result<FeedbackRecord, FeedbackError> {
        let row = sqlx::query_as::<_, (Json<FeedbackRecord>,)>("SELECT doc FROM feedback WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|(doc,)| doc.0).ok_or(FeedbackError::NotFound(id))
    }

    async fn delete(&self, id: Uuid) -> Result<(), FeedbackError> {
        let result = sqlx::query("DELETE FROM feedback WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(FeedbackError::NotFound(id));
        }
        Ok(())
    }
}

// =============================================================================
// MEMORY
// =============================================================================

/// In-process store, newest first. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryFeedbackRepository {
    records: RwLock<Vec<FeedbackRecord>>,
}

impl MemoryFeedbackRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeedbackRepository for MemoryFeedbackRepository {
    async fn insert(&self, record: FeedbackRecord) -> Result<FeedbackRecord, FeedbackError> {
        let mut records = self.records.write().await;
        // EDGE: a re-posted id keeps its original position.
        if let Some(existing) = records.iter_mut().find(|r| r.id == record.id) {
            *existing = record.clone();
        } else {
            records.insert(0, record.clone());
        }
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<FeedbackRecord>, FeedbackError> {
        Ok(self.records.read().await.clone())
    }

    async fn get(&self, id: Uuid) -> Result<FeedbackRecord, FeedbackError> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(FeedbackError::NotFound(id))
    }

    async fn delete(&self, id: Uuid) -> Result<(), FeedbackError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(FeedbackError::NotFound(id));
        }
        Ok(())
    }
}

// =============================================================================
// OFFLINE
// =============================================================================

/// Stand-in used when the database could not be reached at startup.
pub struct OfflineFeedbackRepository;

#[async_trait]
impl FeedbackRepository for OfflineFeedbackRepository {
    async fn insert(&self, _record: FeedbackRecord) -> Result<FeedbackRecord, FeedbackError> {
        Err(FeedbackError::Unavailable)
    }

    async fn list(&self) -> Result<Vec<FeedbackRecord>, FeedbackError> {
        Err(FeedbackError::Unavailable)
    }

    async fn get(&self, _id: Uuid) -> Result<FeedbackRecord, FeedbackError> {
        Err(FeedbackError::Unavailable)
    }

    async fn delete(&self, _id: Uuid) -> Result<(), FeedbackError> {
        Err(FeedbackError::Unavailable)
    }
}

#[cfg(test)]
#[path = "feedback_test.rs"]
mod tests;
