use std::sync::Arc;

use tracing::debug;

use super::model::{JobRecord, JobStatus, WriteOutcome, timestamp};
use super::store::{JobStore, JobStoreError};

/// Writes job status transitions. Every write is an upsert stamped with the
/// current time, so retries are safe and a finished job cannot regress.
#[derive(Clone)]
pub struct JobTracker {
    store: Arc<dyn JobStore>,
}

impl JobTracker {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    pub async fn mark_processing(
        &self,
        job_id: &str,
        source_path: &str,
    ) -> Result<WriteOutcome, JobStoreError> {
        self.write(job_id, source_path, JobStatus::Processing, None, None)
            .await
    }

    pub async fn mark_completed(
        &self,
        job_id: &str,
        source_path: &str,
        output_path: &str,
    ) -> Result<WriteOutcome, JobStoreError> {
        self.write(
            job_id,
            source_path,
            JobStatus::Completed,
            Some(output_path.to_string()),
            None,
        )
        .await
    }

    pub async fn mark_failed(
        &self,
        job_id: &str,
        source_path: &str,
        error_message: &str,
    ) -> Result<WriteOutcome, JobStoreError> {
        self.write(
            job_id,
            source_path,
            JobStatus::Failed,
            None,
            Some(error_message.to_string()),
        )
        .await
    }

    pub async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, JobStoreError> {
        self.store.get(job_id).await
    }

    async fn write(
        &self,
        job_id: &str,
        source_path: &str,
        status: JobStatus,
        output_path: Option<String>,
        error_message: Option<String>,
    ) -> Result<WriteOutcome, JobStoreError> {
        let outcome = self
            .store
            .upsert(JobRecord {
                job_id: job_id.to_string(),
                status,
                source_path: source_path.to_string(),
                output_path,
                error_message,
                updated_at: timestamp(),
            })
            .await?;

        if outcome == WriteOutcome::Rejected {
            debug!(job_id, %status, "Status write rejected by newer or completed record");
        }
        Ok(outcome)
    }
}
