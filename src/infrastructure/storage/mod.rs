//! Object store access used by the transcode pipeline.
//!
//! Every call performs its I/O when invoked; nothing is cached. Uploads
//! overwrite the addressed object (last write wins).

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

pub mod local;
pub mod s3;

#[derive(Debug, Error)]
pub enum StorageError {
    /// The addressed object does not exist. Not retryable.
    #[error("object not found: {bucket}/{key}")]
    ObjectNotFound { bucket: String, key: String },

    /// Transient backend or network failure. Retryable by redelivery.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The backend refused the write for capacity reasons. Not retryable.
    #[error("storage quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("invalid object key: {0}")]
    InvalidKey(String),
}

impl StorageError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Downloads `bucket/key` into `dest`, returning the number of bytes written.
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> StorageResult<u64>;

    /// Uploads the file at `src` as `bucket/key` with the given content type.
    async fn upload(
        &self,
        src: &Path,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> StorageResult<()>;
}
