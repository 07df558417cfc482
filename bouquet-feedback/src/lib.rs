//! bouquet-feedback library
//!
//! Collects bouquet satisfaction surveys, relays them to a remote collector
//! on a best-effort basis, keeps the local history of every submission and
//! exports it as CSV.
//!
//! Core components, leaf-first: [`schema`] (alias normalization),
//! [`history`] (durable ordered history), [`relay`], [`pipeline`],
//! [`export`] and the [`form`] controller. [`api`] exposes the form contract
//! over HTTP.

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod export;
pub mod form;
pub mod history;
pub mod pipeline;
pub mod record;
pub mod relay;
pub mod schema;
pub mod storage;

pub use error::{SubmissionWarning, SubmitError};
pub use pipeline::{SubmissionOutcome, SubmissionPipeline};
pub use record::{FeedbackRecord, Rating, Satisfaction};
pub use schema::{normalize, Draft};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<SubmissionPipeline>,
    /// Export file name prefix
    pub export_prefix: String,
}

impl AppState {
    pub fn new(pipeline: Arc<SubmissionPipeline>, export_prefix: impl Into<String>) -> Self {
        Self {
            pipeline,
            export_prefix: export_prefix.into(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/api/feedback", post(api::submit_feedback))
        .route("/api/history", get(api::get_history))
        .route("/api/export", get(api::download_export))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
