//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the feedback repository chosen at startup.

use std::sync::Arc;

use crate::services::feedback::FeedbackRepository;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; the repository is Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub feedback: Arc<dyn FeedbackRepository>,
}

impl AppState {
    #[must_use]
    pub fn new(feedback: Arc<dyn FeedbackRepository>) -> Self {
        Self { feedback }
    }
}
