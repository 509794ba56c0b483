use utoipa::OpenApi;

use crate::modules::job::dto::JobStatusResponse;
use crate::modules::job::model::JobStatus;
use crate::modules::transcode::dto::EventResultResponse;
use crate::modules::transcode::events::UploadEvent;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::job::handler::get_job,
        crate::modules::transcode::handler::receive_event,
    ),
    components(
        schemas(JobStatus, JobStatusResponse, UploadEvent, EventResultResponse)
    ),
    tags(
        (name = "Jobs", description = "Transcode job status"),
        (name = "Events", description = "Upload event intake")
    )
)]
pub struct ApiDoc;
