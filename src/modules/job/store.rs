use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use super::model::{JobRecord, WriteOutcome};

#[derive(Debug, Error)]
pub enum JobStoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt job record {job_id}: {reason}")]
    Corrupt { job_id: String, reason: String },
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Inserts or replaces the record unless the stored one supersedes it.
    async fn upsert(&self, record: JobRecord) -> Result<WriteOutcome, JobStoreError>;

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, JobStoreError>;
}

/// Process-local status store with the same write guard as the database one.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    records: RwLock<HashMap<String, JobRecord>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn upsert(&self, record: JobRecord) -> Result<WriteOutcome, JobStoreError> {
        let mut records = self.records.write().await;
        let mut record = record;
        if let Some(existing) = records.get(&record.job_id) {
            if !record.supersedes(existing) {
                return Ok(WriteOutcome::Rejected);
            }
            // Same carry-over as the database upsert.
            if record.output_path.is_none() && record.source_path == existing.source_path {
                record.output_path = existing.output_path.clone();
            }
        }
        records.insert(record.job_id.clone(), record);
        Ok(WriteOutcome::Applied)
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, JobStoreError> {
        Ok(self.records.read().await.get(job_id).cloned())
    }
}
