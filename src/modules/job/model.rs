use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status {:?}", other)),
        }
    }
}

/// Status record kept per job id in the metadata store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub job_id: String,
    pub status: JobStatus,
    pub source_path: String,
    pub output_path: Option<String>,
    pub error_message: Option<String>,
    pub updated_at: OffsetDateTime,
}

impl JobRecord {
    /// Whether this write may replace `existing`.
    ///
    /// A `completed` record only accepts another `completed` write for the
    /// same source, and no write may carry an older timestamp than the stored
    /// one. A different source sharing the job id is a new job, so its
    /// writes are never hidden behind another file's result.
    pub fn supersedes(&self, existing: &JobRecord) -> bool {
        if existing.status == JobStatus::Completed
            && self.status != JobStatus::Completed
            && self.source_path == existing.source_path
        {
            return false;
        }
        self.updated_at >= existing.updated_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    /// The stored record won; nothing was written.
    Rejected,
}

/// Current UTC time truncated to the microsecond precision Postgres keeps.
pub fn timestamp() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_nanosecond(now.nanosecond() / 1_000 * 1_000)
        .unwrap_or(now)
}
