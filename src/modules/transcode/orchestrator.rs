use std::path::PathBuf;
use std::sync::Arc;

use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::infrastructure::storage::ObjectStore;
use crate::modules::encoder::Encoder;
use crate::modules::encoder::profile::EncodeProfile;
use crate::modules::job::model::{JobStatus, WriteOutcome};
use crate::modules::job::service::JobTracker;
use crate::modules::job::store::JobStoreError;

use super::error::{PipelineError, Stage};
use super::events::UploadEvent;
use super::paths::{AcceptedObject, PathPolicy, SkipReason};
use super::scratch::ScratchSpace;

pub const OUTPUT_CONTENT_TYPE: &str = "video/mp4";

/// How a single upload event ended, when it did not need redelivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Skipped { reason: SkipReason },
    Completed { job_id: String, output_path: String },
    /// Terminal failure, already recorded in the status store.
    Failed { job_id: String, error: String },
}

/// Drives one upload through download, encode, upload and status reporting.
///
/// Holds no per-object state, so duplicate or overlapping deliveries of the
/// same event are safe: they write the same destination object and the
/// status store refuses to regress a completed job.
pub struct TranscodeOrchestrator {
    store: Arc<dyn ObjectStore>,
    encoder: Arc<dyn Encoder>,
    jobs: JobTracker,
    paths: PathPolicy,
    profile: EncodeProfile,
    scratch_root: PathBuf,
}

impl TranscodeOrchestrator {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        encoder: Arc<dyn Encoder>,
        jobs: JobTracker,
        paths: PathPolicy,
        profile: EncodeProfile,
        scratch_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            encoder,
            jobs,
            paths,
            profile,
            scratch_root: scratch_root.into(),
        }
    }

    /// Processes one upload event.
    ///
    /// Returns `Err` only for failures worth redelivering; everything else,
    /// including terminal failures, comes back as an [`Outcome`].
    pub async fn handle_upload(&self, event: &UploadEvent) -> Result<Outcome, PipelineError> {
        let span = info_span!(
            "transcode",
            run_id = %Uuid::new_v4(),
            bucket = %event.bucket,
            object_path = %event.object_path,
        );
        self.run(event).instrument(span).await
    }

    async fn run(&self, event: &UploadEvent) -> Result<Outcome, PipelineError> {
        debug!(stage = %Stage::Received, size_bytes = event.size_bytes, "Upload event received");

        let accepted = match self.paths.accept(&event.object_path) {
            Ok(accepted) => accepted,
            Err(reason) => {
                info!(%reason, "Skipping object");
                return Ok(Outcome::Skipped { reason });
            }
        };
        info!(stage = %Stage::Validated, job_id = %accepted.job_id, "📦 Accepted upload for transcoding");

        let scratch = ScratchSpace::create(&self.scratch_root, &accepted.source_path)
            .await
            .inspect_err(|e| warn!(error = %e, "Could not create scratch space"))?;

        let result = self.process(event, &accepted, &scratch).await;
        scratch.cleanup().await;

        self.finalize(&accepted, result).await
    }

    async fn process(
        &self,
        event: &UploadEvent,
        accepted: &AcceptedObject,
        scratch: &ScratchSpace,
    ) -> Result<(), PipelineError> {
        info!("⬇️ Downloading source object");
        let bytes = self
            .store
            .download(&event.bucket, &accepted.source_path, scratch.input())
            .await
            .map_err(PipelineError::from_download)?;
        info!(stage = %Stage::Downloaded, bytes, "Source downloaded");

        self.record(
            JobStatus::Processing,
            self.jobs
                .mark_processing(&accepted.job_id, &accepted.source_path)
                .await,
        );

        let encoded = self
            .encoder
            .encode(scratch.input(), scratch.output(), &self.profile)
            .await?;
        info!(
            stage = %Stage::Encoded,
            output_bytes = encoded.output_bytes,
            elapsed_secs = encoded.elapsed.as_secs_f64(),
            "Encode finished"
        );

        info!(destination = %accepted.destination_path, "⬆️ Uploading encoded output");
        self.store
            .upload(
                &encoded.output_path,
                &event.bucket,
                &accepted.destination_path,
                OUTPUT_CONTENT_TYPE,
            )
            .await
            .map_err(PipelineError::from_upload)?;
        info!(stage = %Stage::Uploaded, "Output published");

        Ok(())
    }

    async fn finalize(
        &self,
        accepted: &AcceptedObject,
        result: Result<(), PipelineError>,
    ) -> Result<Outcome, PipelineError> {
        match result {
            Ok(()) => {
                // The artifact is already durable; a lost status write only
                // costs observability.
                self.record(
                    JobStatus::Completed,
                    self.jobs
                        .mark_completed(
                            &accepted.job_id,
                            &accepted.source_path,
                            &accepted.destination_path,
                        )
                        .await,
                );
                info!(stage = %Stage::Finalized, "✅ Transcode completed");
                Ok(Outcome::Completed {
                    job_id: accepted.job_id.clone(),
                    output_path: accepted.destination_path.clone(),
                })
            }
            Err(err) => {
                if err.is_recorded() {
                    self.record(
                        JobStatus::Failed,
                        self.jobs
                            .mark_failed(&accepted.job_id, &accepted.source_path, &err.to_string())
                            .await,
                    );
                }

                if err.is_retryable() {
                    warn!(stage = %Stage::Finalized, error = %err, "Transient failure, requesting redelivery");
                    return Err(err);
                }

                error!(stage = %Stage::Finalized, error = %err, "❌ Transcode failed");
                Ok(Outcome::Failed {
                    job_id: accepted.job_id.clone(),
                    error: err.to_string(),
                })
            }
        }
    }

    fn record(&self, status: JobStatus, result: Result<WriteOutcome, JobStoreError>) {
        match result {
            Ok(WriteOutcome::Applied) => debug!(%status, "Status recorded"),
            Ok(WriteOutcome::Rejected) => info!(%status, "Status unchanged, job already finished"),
            Err(e) => warn!(%status, error = %e, "Status write failed"),
        }
    }
}
