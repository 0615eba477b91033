//! Feedback resource routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use records::FeedbackRecord;
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::services::feedback::FeedbackError;
use crate::state::AppState;

/// Body of `POST /api/feedback`. Only `rating` must be present.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedbackBody {
    pub id: Option<Uuid>,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: Option<String>,
}

impl CreateFeedbackBody {
    /// Fill in whatever the client left out.
    fn into_record(self) -> FeedbackRecord {
        FeedbackRecord {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            rating: self.rating,
            comment: self.comment.unwrap_or_default(),
            created_at: self
                .created_at
                .filter(|ts| !ts.trim().is_empty())
                .unwrap_or_else(records::now_rfc3339),
        }
    }
}

/// `POST /api/feedback` — store a record.
pub async fn create_feedback(
    State(state): State<AppState>,
    Json(body): Json<CreateFeedbackBody>,
) -> Result<(StatusCode, Json<FeedbackRecord>), StatusCode> {
    let record = body.into_record();
    if !record.has_valid_rating() {
        warn!(id = %record.id, rating = record.rating, "rating outside offered range; stored as sent");
    }

    let record = state.feedback.insert(record).await.map_err(feedback_error_to_status)?;

    info!(id = %record.id, rating = record.rating, "feedback stored");
    Ok((StatusCode::CREATED, Json(record)))
}

/// `GET /api/feedback` — list records, newest first.
pub async fn list_feedback(State(state): State<AppState>) -> Result<Json<Vec<FeedbackRecord>>, StatusCode> {
    let records = state.feedback.list().await.map_err(feedback_error_to_status)?;
    Ok(Json(records))
}

/// `GET /api/feedback/:id` — fetch one record.
pub async fn get_feedback(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FeedbackRecord>, StatusCode> {
    let record = state.feedback.get(id).await.map_err(feedback_error_to_status)?;
    Ok(Json(record))
}

/// `DELETE /api/feedback/:id` — remove one record.
pub async fn delete_feedback(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, StatusCode> {
    state.feedback.delete(id).await.map_err(feedback_error_to_status)?;
    info!(%id, "feedback deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn feedback_error_to_status(err: FeedbackError) -> StatusCode {
    match err {
        FeedbackError::NotFound(_) => StatusCode::NOT_FOUND,
        FeedbackError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        FeedbackError::Database(e) => {
            error!(error = %e, "feedback query failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
#[path = "feedback_test.rs"]
mod tests;
