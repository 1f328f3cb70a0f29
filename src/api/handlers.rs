use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::config::ExportOptions;
use crate::domains::export::{ExportJob, ExportReport, TreeNode, FULL_EXPORT_JOB_ID};

use super::error::ApiError;
use super::AppState;

/// Body of the synchronous trigger and the preview endpoint. Every option is
/// optional; `category` narrows the run to one category's bindings.
#[derive(Debug, Deserialize)]
pub struct FinaliseRequest {
    #[serde(flatten)]
    pub options: ExportOptions,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /finalise/generate_preview
///
/// Dry run: returns the directory tree an export would produce, without
/// writing anything.
pub async fn generate_preview(
    State(state): State<AppState>,
    Json(req): Json<FinaliseRequest>,
) -> Result<Json<TreeNode>, ApiError> {
    let tree = state
        .exports
        .preview(&req.options, req.category.as_deref())
        .await?;
    Ok(Json(tree))
}

/// POST /finalise/
///
/// Runs the whole pipeline before responding.
pub async fn run_finalise(
    State(state): State<AppState>,
    Json(req): Json<FinaliseRequest>,
) -> Result<Json<ExportReport>, ApiError> {
    let report = state
        .exports
        .run(&req.options, req.category.as_deref())
        .await?;
    Ok(Json(report))
}

/// GET /finalise/schedule/:category
///
/// Schedules a background export of one category, or of everything when the
/// path segment is "all". Options come from the query string; 423 when a
/// live job already covers the same scope.
pub async fn schedule_finalise(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(options): Query<ExportOptions>,
) -> Result<Json<ExportJob>, ApiError> {
    let category = if category == FULL_EXPORT_JOB_ID {
        None
    } else {
        Some(category)
    };
    let job = state
        .exports
        .schedule(&options, category.as_deref())
        .await?;
    Ok(Json(job))
}

/// GET /finalise/jobs/:id
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ExportJob>, ApiError> {
    let job = state.exports.job_status(&id).await?;
    Ok(Json(job))
}

/// DELETE /finalise/jobs/:id
///
/// Clears a finished job record so the id can be polled fresh. A live job
/// answers 423.
pub async fn remove_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.exports.remove_job(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /finalise/download/zip
///
/// Streams the current archive; 404 until an export has completed.
pub async fn download_archive(State(state): State<AppState>) -> Result<Response, ApiError> {
    let bytes = state.exports.archive_bytes().await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/zip"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"dataset.zip\"",
            ),
        ],
        bytes,
    )
        .into_response())
}
