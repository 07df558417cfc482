//! CSV download endpoint

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::api::ApiError;
use crate::export::export_history;
use crate::AppState;

/// GET /api/export
///
/// `200` with the CSV as an attachment, or `204` when the history is empty.
pub async fn download_export(State(state): State<AppState>) -> Result<Response, ApiError> {
    let export = export_history(state.pipeline.history(), &state.export_prefix).await?;

    let Some(export) = export else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    let disposition = format!("attachment; filename=\"{}\"", export.filename);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, export.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.bytes,
    )
        .into_response())
}
