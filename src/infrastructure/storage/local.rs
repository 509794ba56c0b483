use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use super::{ObjectStore, StorageError, StorageResult};

/// Filesystem-backed object store laid out as `<root>/<bucket>/<key>`.
#[derive(Clone, Debug)]
pub struct LocalObjectStore {
    root: PathBuf,
    max_object_bytes: Option<u64>,
}

impl LocalObjectStore {
    pub async fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::StorageUnavailable(format!(
                "failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;

        info!("✅ Local object store at {}", root.display());
        Ok(Self {
            root,
            max_object_bytes: None,
        })
    }

    /// Rejects uploads larger than `bytes` with [`StorageError::QuotaExceeded`].
    pub fn with_max_object_bytes(mut self, bytes: u64) -> Self {
        self.max_object_bytes = Some(bytes);
        self
    }

    pub fn object_path(&self, bucket: &str, key: &str) -> StorageResult<PathBuf> {
        validate_segment(bucket)?;
        validate_segment(key)?;
        Ok(self.root.join(bucket).join(key))
    }
}

fn validate_segment(value: &str) -> StorageResult<()> {
    let path = Path::new(value);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if value.is_empty() || escapes {
        return Err(StorageError::InvalidKey(value.to_string()));
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> StorageResult<u64> {
        let path = self.object_path(bucket, key)?;
        match fs::copy(&path, dest).await {
            Ok(bytes) => {
                debug!(bucket, key, bytes, "Object copied from local store");
                Ok(bytes)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(e) => Err(StorageError::StorageUnavailable(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn upload(
        &self,
        src: &Path,
        bucket: &str,
        key: &str,
        _content_type: &str,
    ) -> StorageResult<()> {
        let path = self.object_path(bucket, key)?;

        if let Some(limit) = self.max_object_bytes {
            let size = fs::metadata(src)
                .await
                .map_err(|e| StorageError::StorageUnavailable(e.to_string()))?
                .len();
            if size > limit {
                return Err(StorageError::QuotaExceeded(format!(
                    "{} bytes exceeds the {} byte object limit",
                    size, limit
                )));
            }
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::StorageUnavailable(e.to_string()))?;
        }

        // Stage next to the destination so the final rename is atomic.
        let staging = path.with_file_name(format!(".{}.partial", Uuid::new_v4().simple()));
        if let Err(e) = fs::copy(src, &staging).await {
            let _ = fs::remove_file(&staging).await;
            return Err(StorageError::StorageUnavailable(format!(
                "failed to write {}: {}",
                path.display(),
                e
            )));
        }
        if let Err(e) = fs::rename(&staging, &path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(StorageError::StorageUnavailable(format!(
                "failed to publish {}: {}",
                path.display(),
                e
            )));
        }

        debug!(bucket, key, "Object written to local store");
        Ok(())
    }
}
