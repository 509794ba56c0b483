use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use super::model::{JobRecord, WriteOutcome};
use super::store::{JobStore, JobStoreError};

#[derive(Debug, FromRow)]
struct JobRow {
    job_id: String,
    status: String,
    source_path: String,
    output_path: Option<String>,
    error_message: Option<String>,
    updated_at: OffsetDateTime,
}

impl TryFrom<JobRow> for JobRecord {
    type Error = JobStoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|reason| JobStoreError::Corrupt {
            job_id: row.job_id.clone(),
            reason,
        })?;

        Ok(JobRecord {
            job_id: row.job_id,
            status,
            source_path: row.source_path,
            output_path: row.output_path,
            error_message: row.error_message,
            updated_at: row.updated_at,
        })
    }
}

/// Status records in the `transcode_jobs` table.
#[derive(Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for JobRepository {
    async fn upsert(&self, record: JobRecord) -> Result<WriteOutcome, JobStoreError> {
        // The WHERE clause mirrors JobRecord::supersedes: zero affected rows
        // means the stored record won.
        let result = sqlx::query(
            r#"
            INSERT INTO transcode_jobs (job_id, status, source_path, output_path, error_message, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (job_id) DO UPDATE
            SET
                status = EXCLUDED.status,
                source_path = EXCLUDED.source_path,
                output_path = CASE
                    WHEN transcode_jobs.source_path = EXCLUDED.source_path
                        THEN COALESCE(EXCLUDED.output_path, transcode_jobs.output_path)
                    ELSE EXCLUDED.output_path
                END,
                error_message = EXCLUDED.error_message,
                updated_at = EXCLUDED.updated_at
            WHERE transcode_jobs.updated_at <= EXCLUDED.updated_at
              AND (
                  transcode_jobs.status <> 'completed'
                  OR EXCLUDED.status = 'completed'
                  OR transcode_jobs.source_path <> EXCLUDED.source_path
              )
            "#,
        )
        .bind(&record.job_id)
        .bind(record.status.as_str())
        .bind(&record.source_path)
        .bind(&record.output_path)
        .bind(&record.error_message)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            Ok(WriteOutcome::Rejected)
        } else {
            Ok(WriteOutcome::Applied)
        }
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, JobStoreError> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT job_id, status, source_path, output_path, error_message, updated_at
            FROM transcode_jobs
            WHERE job_id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(JobRecord::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::job::model::{JobStatus, timestamp};
    use time::Duration;

    fn record(status: JobStatus, source_path: &str, updated_at: OffsetDateTime) -> JobRecord {
        JobRecord {
            job_id: "2024/a".to_string(),
            status,
            source_path: source_path.to_string(),
            output_path: None,
            error_message: None,
            updated_at,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_completed_job_is_not_downgraded(pool: PgPool) {
        let repo = JobRepository::new(pool);
        let t0 = timestamp();
        let mut done = record(JobStatus::Completed, "videos/uploads/2024/a.mp4", t0);
        done.output_path = Some("videos/encoded/2024/a.mp4".to_string());

        assert_eq!(repo.upsert(done).await.unwrap(), WriteOutcome::Applied);
        let retry = record(
            JobStatus::Processing,
            "videos/uploads/2024/a.mp4",
            t0 + Duration::seconds(5),
        );
        assert_eq!(repo.upsert(retry).await.unwrap(), WriteOutcome::Rejected);

        let stored = repo.get("2024/a").await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.output_path.as_deref(), Some("videos/encoded/2024/a.mp4"));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_older_write_is_rejected(pool: PgPool) {
        let repo = JobRepository::new(pool);
        let t0 = timestamp();
        let source = "videos/uploads/2024/a.mp4";

        assert_eq!(
            repo.upsert(record(JobStatus::Failed, source, t0)).await.unwrap(),
            WriteOutcome::Applied
        );
        let stale = record(JobStatus::Processing, source, t0 - Duration::seconds(1));
        assert_eq!(repo.upsert(stale).await.unwrap(), WriteOutcome::Rejected);

        let stored = repo.get("2024/a").await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.updated_at, t0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_processing_keeps_earlier_output_of_same_source(pool: PgPool) {
        let repo = JobRepository::new(pool);
        let t0 = timestamp();
        let source = "videos/uploads/2024/a.mp4";
        let mut failed = record(JobStatus::Failed, source, t0);
        failed.output_path = Some("videos/encoded/2024/a.mp4".to_string());

        repo.upsert(failed).await.unwrap();
        let retry = record(JobStatus::Processing, source, t0 + Duration::seconds(1));
        assert_eq!(repo.upsert(retry).await.unwrap(), WriteOutcome::Applied);

        let stored = repo.get("2024/a").await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Processing);
        assert_eq!(stored.output_path.as_deref(), Some("videos/encoded/2024/a.mp4"));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_other_source_replaces_completed_job(pool: PgPool) {
        let repo = JobRepository::new(pool);
        let t0 = timestamp();
        let mut done = record(JobStatus::Completed, "videos/uploads/2024/a.mp4", t0);
        done.output_path = Some("videos/encoded/2024/a.mp4".to_string());

        repo.upsert(done).await.unwrap();
        let other = record(
            JobStatus::Processing,
            "videos/uploads/2024/a.mov",
            t0 + Duration::seconds(1),
        );
        assert_eq!(repo.upsert(other).await.unwrap(), WriteOutcome::Applied);

        let stored = repo.get("2024/a").await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Processing);
        assert_eq!(stored.source_path, "videos/uploads/2024/a.mov");
        assert_eq!(stored.output_path, None);
    }
}
