use axum::{body::Bytes, extract::State, http::StatusCode, response::IntoResponse};
use tracing::{info, warn};

use crate::common::response::{ApiError, ApiResponse, ApiSuccess};
use crate::modules::transcode::dto::EventResultResponse;
use crate::modules::transcode::events::decode_trigger;
use crate::state::AppState;

/// Push trigger. Accepts an S3/MinIO bucket notification, a finalize
/// notification or a plain upload event and processes every object it names
/// before answering.
#[utoipa::path(
    post,
    path = "/api/v1/events",
    request_body(content = crate::modules::transcode::events::UploadEvent, description = "Upload event or bucket notification"),
    responses(
        (status = 200, description = "Every event handled", body = ApiResponse<Vec<EventResultResponse>>),
        (status = 400, description = "Unrecognized payload"),
        (status = 503, description = "Transient failure, redeliver the event", body = ApiResponse<Vec<EventResultResponse>>)
    ),
    tag = "Events"
)]
pub async fn receive_event(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let events = match decode_trigger(&body) {
        Ok(events) => events,
        Err(e) => {
            warn!(error = %e, "Rejected trigger payload");
            return ApiError::bad_request(e.to_string()).into_response();
        }
    };

    info!(count = events.len(), "📨 Trigger received");

    let mut results = Vec::with_capacity(events.len());
    let mut retry = false;
    for event in &events {
        let result = state.orchestrator.handle_upload(event).await;
        retry |= result.is_err();
        results.push(EventResultResponse::new(&event.object_path, &result));
    }

    if retry {
        return ApiSuccess(
            ApiResponse::failure(results, "Transient failure, retry later"),
            StatusCode::SERVICE_UNAVAILABLE,
        )
        .into_response();
    }

    ApiSuccess(
        ApiResponse::success(results, "Events processed"),
        StatusCode::OK,
    )
    .into_response()
}
