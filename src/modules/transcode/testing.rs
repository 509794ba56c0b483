//! In-process fakes for exercising the pipeline without ffmpeg or a network.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use crate::infrastructure::storage::local::LocalObjectStore;
use crate::infrastructure::storage::{ObjectStore, StorageError, StorageResult};
use crate::modules::encoder::error::EncodeError;
use crate::modules::encoder::profile::EncodeProfile;
use crate::modules::encoder::{EncodeResult, Encoder};
use crate::modules::job::model::{JobRecord, WriteOutcome};
use crate::modules::job::service::JobTracker;
use crate::modules::job::store::{JobStore, JobStoreError, MemoryJobStore};

use super::events::UploadEvent;
use super::orchestrator::TranscodeOrchestrator;
use super::paths::PathPolicy;

pub const BUCKET: &str = "media";

#[derive(Debug, Clone, Copy)]
pub enum EncoderBehavior {
    /// Writes `encoded:` followed by the input bytes.
    Copy,
    Fail {
        exit_code: i32,
        stderr: &'static str,
    },
    Timeout,
}

pub struct FakeEncoder {
    behavior: EncoderBehavior,
    pub calls: AtomicUsize,
}

impl FakeEncoder {
    pub fn new(behavior: EncoderBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Encoder for FakeEncoder {
    async fn encode(
        &self,
        input: &Path,
        output: &Path,
        _profile: &EncodeProfile,
    ) -> Result<EncodeResult, EncodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            EncoderBehavior::Copy => {
                let mut data = b"encoded:".to_vec();
                data.extend(tokio::fs::read(input).await?);
                tokio::fs::write(output, &data).await?;
                Ok(EncodeResult {
                    output_path: output.to_path_buf(),
                    output_bytes: data.len() as u64,
                    elapsed: Duration::from_millis(1),
                })
            }
            EncoderBehavior::Fail { exit_code, stderr } => Err(EncodeError::Failed {
                exit_code: Some(exit_code),
                stderr_tail: stderr.to_string(),
            }),
            EncoderBehavior::Timeout => Err(EncodeError::Timeout { timeout_secs: 540 }),
        }
    }
}

/// Local store that can be switched into an outage per direction.
pub struct FlakyStore {
    inner: LocalObjectStore,
    pub download_unavailable: AtomicBool,
    pub upload_unavailable: AtomicBool,
    pub downloads: AtomicUsize,
    pub uploads: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: LocalObjectStore) -> Self {
        Self {
            inner,
            download_unavailable: AtomicBool::new(false),
            upload_unavailable: AtomicBool::new(false),
            downloads: AtomicUsize::new(0),
            uploads: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ObjectStore for FlakyStore {
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> StorageResult<u64> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if self.download_unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::StorageUnavailable("connection reset".to_string()));
        }
        self.inner.download(bucket, key, dest).await
    }

    async fn upload(
        &self,
        src: &Path,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> StorageResult<()> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.upload_unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::StorageUnavailable("503 slow down".to_string()));
        }
        self.inner.upload(src, bucket, key, content_type).await
    }
}

/// Status store whose every call fails.
pub struct FailingJobStore;

#[async_trait]
impl JobStore for FailingJobStore {
    async fn upsert(&self, _record: JobRecord) -> Result<WriteOutcome, JobStoreError> {
        Err(JobStoreError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn get(&self, _job_id: &str) -> Result<Option<JobRecord>, JobStoreError> {
        Err(JobStoreError::Database(sqlx::Error::PoolTimedOut))
    }
}

/// A wired orchestrator over a temporary directory.
pub struct Harness {
    root: TempDir,
    pub store: Arc<FlakyStore>,
    pub encoder: Arc<FakeEncoder>,
    pub jobs: JobTracker,
    pub orchestrator: Arc<TranscodeOrchestrator>,
}

impl Harness {
    pub async fn new(behavior: EncoderBehavior) -> Self {
        Self::build(behavior, Arc::new(MemoryJobStore::new()), None).await
    }

    pub async fn build(
        behavior: EncoderBehavior,
        job_store: Arc<dyn JobStore>,
        max_object_bytes: Option<u64>,
    ) -> Self {
        let root = TempDir::new().unwrap();
        let mut local = LocalObjectStore::new(root.path().join("store")).await.unwrap();
        if let Some(bytes) = max_object_bytes {
            local = local.with_max_object_bytes(bytes);
        }

        let store = Arc::new(FlakyStore::new(local));
        let encoder = Arc::new(FakeEncoder::new(behavior));
        let jobs = JobTracker::new(job_store);
        let orchestrator = Arc::new(Self::orchestrator(
            store.clone(),
            encoder.clone(),
            jobs.clone(),
            root.path(),
        ));

        Self {
            root,
            store,
            encoder,
            jobs,
            orchestrator,
        }
    }

    /// Second orchestrator over the same store, status records and scratch
    /// root, with its own encoder.
    pub fn sharing(other: &Harness, behavior: EncoderBehavior) -> TranscodeOrchestrator {
        Self::orchestrator(
            other.store.clone(),
            Arc::new(FakeEncoder::new(behavior)),
            other.jobs.clone(),
            other.root.path(),
        )
    }

    fn orchestrator(
        store: Arc<FlakyStore>,
        encoder: Arc<FakeEncoder>,
        jobs: JobTracker,
        root: &Path,
    ) -> TranscodeOrchestrator {
        TranscodeOrchestrator::new(
            store,
            encoder,
            jobs,
            PathPolicy::new("videos/uploads/", "videos/encoded/"),
            EncodeProfile::default(),
            root.join("scratch"),
        )
    }

    pub fn event(object_path: &str) -> UploadEvent {
        UploadEvent {
            bucket: BUCKET.to_string(),
            object_path: object_path.to_string(),
            size_bytes: 0,
        }
    }

    pub fn object(&self, key: &str) -> PathBuf {
        self.root.path().join("store").join(BUCKET).join(key)
    }

    pub async fn put_source(&self, key: &str, content: &[u8]) {
        let path = self.object(key);
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(path, content).await.unwrap();
    }

    /// Entries left behind in the scratch root.
    pub fn scratch_entries(&self) -> usize {
        match std::fs::read_dir(self.root.path().join("scratch")) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }
}
