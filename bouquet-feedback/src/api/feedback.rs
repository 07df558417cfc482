//! Submission and history endpoints

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::error::SubmitError;
use crate::export::ExportError;
use crate::pipeline::SubmissionOutcome;
use crate::record::FeedbackRecord;
use crate::schema::Draft;
use crate::AppState;

/// History listing response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub count: usize,
    pub has_history: bool,
    pub records: Vec<FeedbackRecord>,
}

/// POST /api/feedback
///
/// Accepts a draft in any recognized field layout. Relay and storage
/// problems do not fail the request; they are listed in `warnings`.
pub async fn submit_feedback(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<SubmissionOutcome>, ApiError> {
    let draft = Draft::from_value(body).map_err(SubmitError::from)?;
    let outcome = state.pipeline.submit(&draft).await?;
    Ok(Json(outcome))
}

/// GET /api/history
pub async fn get_history(State(state): State<AppState>) -> Json<HistoryResponse> {
    let records = state.pipeline.history().load().await;
    Json(HistoryResponse {
        count: records.len(),
        has_history: !records.is_empty(),
        records,
    })
}

/// Errors returned to the form
#[derive(Debug)]
pub enum ApiError {
    Submit(SubmitError),
    Export(ExportError),
}

impl From<SubmitError> for ApiError {
    fn from(e: SubmitError) -> Self {
        ApiError::Submit(e)
    }
}

impl From<ExportError> for ApiError {
    fn from(e: ExportError) -> Self {
        ApiError::Export(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Submit(SubmitError::Validation(e)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "error": e.to_string(),
                    "issues": e.issues,
                }),
            ),
            ApiError::Submit(SubmitError::Schema(e)) => {
                warn!(error = %e, "Rejected draft with unrecognized shape");
                (StatusCode::BAD_REQUEST, json!({ "error": e.to_string() }))
            }
            ApiError::Export(e) => {
                error!(error = %e, "Export failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": format!("Export failed: {}", e) }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
