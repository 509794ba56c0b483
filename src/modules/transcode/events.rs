//! Trigger payloads delivered by the storage-event system.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use validator::Validate;

/// One finalized upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadEvent {
    #[validate(length(min = 1))]
    pub bucket: String,
    #[validate(length(min = 1))]
    pub object_path: String,
    #[serde(default)]
    pub size_bytes: i64,
}

#[derive(Debug, Error)]
pub enum TriggerDecodeError {
    #[error("unrecognized trigger payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("object key is not valid UTF-8 after decoding: {0}")]
    BadKey(String),

    #[error("invalid upload event: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

/// Accepted payload shapes, tried in order.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TriggerPayload {
    /// S3 / MinIO bucket notification.
    Notification {
        #[serde(rename = "Records")]
        records: Vec<S3Record>,
    },
    Upload(UploadEvent),
    /// Object-finalize notification carrying `name` and a stringified size.
    Finalized {
        bucket: String,
        name: String,
        #[serde(default)]
        size: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct S3Record {
    #[serde(rename = "eventName", default)]
    event_name: Option<String>,
    s3: S3Entity,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: S3Bucket,
    object: S3Object,
}

#[derive(Debug, Deserialize)]
struct S3Bucket {
    name: String,
}

#[derive(Debug, Deserialize)]
struct S3Object {
    key: String,
    #[serde(default)]
    size: i64,
}

/// Decodes a trigger payload into the upload events it carries.
///
/// Notification records for anything other than object creation are
/// dropped, so the result may be empty.
pub fn decode_trigger(payload: &[u8]) -> Result<Vec<UploadEvent>, TriggerDecodeError> {
    let events = match serde_json::from_slice::<TriggerPayload>(payload)? {
        TriggerPayload::Notification { records } => records
            .into_iter()
            .filter(|r| {
                r.event_name
                    .as_deref()
                    .is_none_or(|name| name.contains("ObjectCreated"))
            })
            .map(|r| {
                Ok(UploadEvent {
                    bucket: r.s3.bucket.name,
                    object_path: decode_key(&r.s3.object.key)?,
                    size_bytes: r.s3.object.size,
                })
            })
            .collect::<Result<Vec<_>, TriggerDecodeError>>()?,
        TriggerPayload::Upload(event) => vec![event],
        TriggerPayload::Finalized { bucket, name, size } => vec![UploadEvent {
            bucket,
            object_path: name,
            size_bytes: size.and_then(|s| s.parse().ok()).unwrap_or_default(),
        }],
    };

    for event in &events {
        event.validate()?;
    }
    Ok(events)
}

/// Notification keys are form-encoded: `+` is a space, the rest is percent-encoded.
fn decode_key(raw: &str) -> Result<String, TriggerDecodeError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|key| key.into_owned())
        .map_err(|_| TriggerDecodeError::BadKey(raw.to_string()))
}
