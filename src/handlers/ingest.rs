//! Bulk ingestion handlers

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::models::RecordKind;
use crate::{AppError, AppResult, AppState};

#[derive(Debug, Deserialize, Default)]
pub struct IngestParams {
    /// Keep the aggregate of rows processed before a decode failure
    #[serde(default)]
    pub partial: bool,
}

/// Analyze an uploaded CDR or SMS file
///
/// `POST /api/v1/ingest/:kind` with the raw file as the request body.
pub async fn upload(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(params): Query<IngestParams>,
    body: Bytes,
) -> AppResult<Response> {
    let kind: RecordKind = kind.parse().map_err(AppError::ValidationError)?;

    if body.is_empty() {
        return Err(AppError::ValidationError("No file uploaded".to_string()));
    }

    tracing::info!("Received {} upload ({} bytes)", kind, body.len());

    if params.partial {
        let run = state.pipeline.run_partial(&body, kind).await;
        return Ok(Json(run).into_response());
    }

    let summary = state.pipeline.run(&body, kind).await?;
    Ok(Json(summary).into_response())
}
