use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::config::Builder;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::put_object::PutObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{Client, config::BehaviorVersion, config::Credentials, config::Region};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::{ObjectStore, StorageError, StorageResult};

/// Error codes S3-compatible backends use when a write is refused for capacity.
const QUOTA_CODES: &[&str] = &[
    "QuotaExceeded",
    "EntityTooLarge",
    "XMinioStorageFull",
    "XMinioAdminBucketQuotaExceeded",
];

#[derive(Clone)]
pub struct StorageService {
    client: Client,
}

impl StorageService {
    pub fn new(endpoint: &str, region: &str, access_key: &str, secret_key: &str) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "static");

        let config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .endpoint_url(endpoint)
            .credentials_provider(credentials)
            .force_path_style(true) // Required for MinIO
            .build();

        let client = Client::from_conf(config);

        info!("✅ S3 client configured for {}", endpoint);

        Self { client }
    }
}

#[async_trait]
impl ObjectStore for StorageService {
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> StorageResult<u64> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify_get_error(bucket, key, e))?;

        let mut file = tokio::fs::File::create(dest).await.map_err(|e| {
            StorageError::StorageUnavailable(format!(
                "failed to create {}: {}",
                dest.display(),
                e
            ))
        })?;

        let mut body = response.body.into_async_read();
        let written = tokio::io::copy(&mut body, &mut file).await.map_err(|e| {
            StorageError::StorageUnavailable(format!("download of {}/{} interrupted: {}", bucket, key, e))
        })?;
        file.flush()
            .await
            .map_err(|e| StorageError::StorageUnavailable(e.to_string()))?;

        debug!(bucket, key, bytes = written, "Object downloaded");
        Ok(written)
    }

    async fn upload(
        &self,
        src: &Path,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> StorageResult<()> {
        let body = ByteStream::from_path(src).await.map_err(|e| {
            StorageError::StorageUnavailable(format!("failed to read {}: {}", src.display(), e))
        })?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(classify_put_error)?;

        debug!(bucket, key, content_type, "Object uploaded");
        Ok(())
    }
}

fn classify_get_error(bucket: &str, key: &str, err: SdkError<GetObjectError>) -> StorageError {
    let not_found = match &err {
        SdkError::ServiceError(ctx) => {
            ctx.err().is_no_such_key() || ctx.raw().status().as_u16() == 404
        }
        _ => false,
    };

    if not_found {
        StorageError::ObjectNotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    } else {
        StorageError::StorageUnavailable(DisplayErrorContext(&err).to_string())
    }
}

fn classify_put_error(err: SdkError<PutObjectError>) -> StorageError {
    let quota = match &err {
        SdkError::ServiceError(ctx) => {
            is_quota_code(ctx.err().code()) || ctx.raw().status().as_u16() == 507
        }
        _ => false,
    };

    let message = DisplayErrorContext(&err).to_string();
    if quota {
        StorageError::QuotaExceeded(message)
    } else {
        StorageError::StorageUnavailable(message)
    }
}

pub fn is_quota_code(code: Option<&str>) -> bool {
    code.is_some_and(|c| QUOTA_CODES.contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_codes() {
        assert!(is_quota_code(Some("QuotaExceeded")));
        assert!(is_quota_code(Some("XMinioStorageFull")));
        assert!(!is_quota_code(Some("SlowDown")));
        assert!(!is_quota_code(None));
    }
}
