//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the feedback resource under `/api/feedback` plus a health probe.
//! CORS is open to any origin so a front-end served from elsewhere can post
//! directly.

pub mod feedback;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the service router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/feedback", get(feedback::list_feedback).post(feedback::create_feedback))
        .route(
            "/api/feedback/{id}",
            get(feedback::get_feedback).delete(feedback::delete_feedback),
        )
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
