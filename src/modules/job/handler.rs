use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;

use crate::common::response::{ApiError, ApiResponse, ApiSuccess};
use crate::modules::job::dto::JobStatusResponse;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/jobs/{job_id}",
    params(
        ("job_id" = String, Path, description = "Intake-relative source path without its extension, e.g. `2024/a`")
    ),
    responses(
        (status = 200, description = "Job status", body = ApiResponse<JobStatusResponse>),
        (status = 404, description = "No status recorded for this job"),
        (status = 500, description = "Internal Server Error")
    ),
    tag = "Jobs"
)]
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    match state.jobs.get(&job_id).await {
        Ok(Some(record)) => ApiSuccess(
            ApiResponse::success(JobStatusResponse::from(record), "Job retrieved successfully"),
            StatusCode::OK,
        )
        .into_response(),
        Ok(None) => ApiError::not_found("Job not found").into_response(),
        Err(e) => {
            error!(job_id, error = %e, "Failed to read job status");
            ApiError::internal(e.to_string()).into_response()
        }
    }
}
