//! Shared feedback record model and JSON codec.
//!
//! This crate owns the representation used by both the collection service
//! and the client store. The same JSON encoding travels over HTTP and sits
//! in local storage, so a record read back from either place decodes the
//! same way.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

/// Lowest rating offered by the front-end.
pub const MIN_RATING: i32 = 1;
/// Highest rating offered by the front-end.
pub const MAX_RATING: i32 = 5;
/// Rating preselected on a fresh form.
pub const DEFAULT_RATING: i32 = 5;

/// Error returned by the list codec.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// The payload could not be encoded or decoded as a list of records.
    #[error("invalid feedback JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One user-submitted rating and comment.
///
/// Records are immutable once created: the only lifecycle transitions are
/// creation and deletion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    /// Random v4 identifier, generated by whoever creates the record.
    pub id: Uuid,
    /// Intended range is [`MIN_RATING`]..=[`MAX_RATING`]; not enforced here.
    pub rating: i32,
    /// Free text, possibly empty. Absent on the wire decodes as `""`.
    #[serde(default)]
    pub comment: String,
    /// RFC 3339 timestamp in UTC.
    pub created_at: String,
}

impl FeedbackRecord {
    /// Build a fresh record stamped with a new id and the current time.
    /// The comment is trimmed.
    #[must_use]
    pub fn new(rating: i32, comment: &str) -> Self {
        Self { id: Uuid::new_v4(), rating, comment: comment.trim().to_owned(), created_at: now_rfc3339() }
    }

    /// Parse `created_at` back into a timestamp, if it is well formed.
    #[must_use]
    pub fn created_at_time(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::parse(&self.created_at, &Rfc3339).ok()
    }

    /// Whether the rating falls inside the range the front-end offers.
    #[must_use]
    pub fn has_valid_rating(&self) -> bool {
        (MIN_RATING..=MAX_RATING).contains(&self.rating)
    }
}

/// Current UTC time formatted as RFC 3339.
#[must_use]
pub fn now_rfc3339() -> String {
    // EDGE: formatting only fails for years outside 0..=9999.
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

/// Serialize an ordered sequence of records.
///
/// # Errors
///
/// Returns [`RecordError::Json`] if serialization fails.
pub fn encode_list(records: &[FeedbackRecord]) -> Result<String, RecordError> {
    Ok(serde_json::to_string(records)?)
}

/// Deserialize an ordered sequence of records, preserving order.
///
/// # Errors
///
/// Returns [`RecordError::Json`] if the payload is not a JSON array of
/// records.
pub fn decode_list(raw: &str) -> Result<Vec<FeedbackRecord>, RecordError> {
    Ok(serde_json::from_str(raw)?)
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
