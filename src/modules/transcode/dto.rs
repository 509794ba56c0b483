use serde::Serialize;
use utoipa::ToSchema;

use super::error::PipelineError;
use super::orchestrator::Outcome;

/// Result of one upload event carried by a trigger delivery.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventResultResponse {
    pub object_path: String,
    /// One of `skipped`, `completed`, `failed` or `retry`.
    pub outcome: String,
    pub job_id: Option<String>,
    pub output_path: Option<String>,
    pub detail: Option<String>,
}

impl EventResultResponse {
    pub fn new(object_path: &str, result: &Result<Outcome, PipelineError>) -> Self {
        let object_path = object_path.to_string();
        match result {
            Ok(Outcome::Skipped { reason }) => Self {
                object_path,
                outcome: "skipped".to_string(),
                job_id: None,
                output_path: None,
                detail: Some(reason.to_string()),
            },
            Ok(Outcome::Completed {
                job_id,
                output_path,
            }) => Self {
                object_path,
                outcome: "completed".to_string(),
                job_id: Some(job_id.clone()),
                output_path: Some(output_path.clone()),
                detail: None,
            },
            Ok(Outcome::Failed { job_id, error }) => Self {
                object_path,
                outcome: "failed".to_string(),
                job_id: Some(job_id.clone()),
                output_path: None,
                detail: Some(error.clone()),
            },
            Err(e) => Self {
                object_path,
                outcome: "retry".to_string(),
                job_id: None,
                output_path: None,
                detail: Some(e.to_string()),
            },
        }
    }
}
