use serde::Serialize;
use time::OffsetDateTime;
use utoipa::ToSchema;

use super::model::{JobRecord, JobStatus};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub source_path: String,
    pub output_path: Option<String>,
    pub error_message: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: OffsetDateTime,
}

impl From<JobRecord> for JobStatusResponse {
    fn from(record: JobRecord) -> Self {
        Self {
            job_id: record.job_id,
            status: record.status,
            source_path: record.source_path,
            output_path: record.output_path,
            error_message: record.error_message,
            updated_at: record.updated_at,
        }
    }
}
