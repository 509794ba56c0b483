//! Error types for the encoder invoker.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodeError {
    /// The encoder binary could not be started.
    #[error("failed to launch encoder {program}: {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The encoder exited unsuccessfully.
    #[error("encoder exited with code {exit_code:?}: {stderr_tail}")]
    Failed {
        exit_code: Option<i32>,
        stderr_tail: String,
    },

    /// The encoder ran past its wall-clock budget and was killed.
    #[error("encode timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The encoder reported success but left no usable output.
    #[error("encoder produced no output at {0}")]
    MissingOutput(PathBuf),

    #[error("I/O error while encoding: {0}")]
    Io(#[from] std::io::Error),
}
