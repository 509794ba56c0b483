use std::fmt;

use thiserror::Error;

use crate::infrastructure::storage::StorageError;
use crate::modules::encoder::error::EncodeError;

/// Orchestration states, used to tag logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validated,
    Downloaded,
    Encoded,
    Uploaded,
    Finalized,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Validated => "validated",
            Stage::Downloaded => "downloaded",
            Stage::Encoded => "encoded",
            Stage::Uploaded => "uploaded",
            Stage::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source object not found: {0}")]
    ObjectNotFound(String),

    /// Transient storage failure while leaving `stage`.
    #[error("storage unavailable while leaving {stage}: {message}")]
    StorageUnavailable { stage: Stage, message: String },

    #[error("encode failed (exit code {exit_code:?}): {stderr_tail}")]
    EncodeFailed {
        exit_code: Option<i32>,
        stderr_tail: String,
    },

    #[error("encode timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    #[error("upload rejected: {0}")]
    UploadRejected(String),

    #[error("scratch space unavailable: {0}")]
    Scratch(#[from] std::io::Error),
}

impl PipelineError {
    /// Only transient infrastructure failures ask the trigger for redelivery.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable { .. } | Self::Scratch(_))
    }

    /// Whether the failure is written to the status record. A failed
    /// download or missing scratch space never touched the job, so there is
    /// nothing to report yet.
    pub fn is_recorded(&self) -> bool {
        match self {
            Self::StorageUnavailable { stage, .. } => *stage != Stage::Validated,
            Self::Scratch(_) => false,
            _ => true,
        }
    }

    pub fn from_download(err: StorageError) -> Self {
        match err {
            StorageError::ObjectNotFound { bucket, key } => {
                Self::ObjectNotFound(format!("{}/{}", bucket, key))
            }
            StorageError::InvalidKey(key) => Self::ObjectNotFound(key),
            other => Self::StorageUnavailable {
                stage: Stage::Validated,
                message: other.to_string(),
            },
        }
    }

    pub fn from_upload(err: StorageError) -> Self {
        if err.is_retryable() {
            Self::StorageUnavailable {
                stage: Stage::Encoded,
                message: err.to_string(),
            }
        } else {
            Self::UploadRejected(err.to_string())
        }
    }
}

impl From<EncodeError> for PipelineError {
    fn from(err: EncodeError) -> Self {
        match err {
            EncodeError::Failed {
                exit_code,
                stderr_tail,
            } => Self::EncodeFailed {
                exit_code,
                stderr_tail,
            },
            EncodeError::Timeout { timeout_secs } => Self::Timeout { timeout_secs },
            other => Self::EncodeFailed {
                exit_code: None,
                stderr_tail: other.to_string(),
            },
        }
    }
}
