//! Encoder invoker: runs an external transcoder for one input/output pair.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

pub mod error;
pub mod events;
pub mod ffmpeg;
pub mod profile;

use error::EncodeError;
use profile::EncodeProfile;

#[derive(Debug, Clone)]
pub struct EncodeResult {
    pub output_path: PathBuf,
    pub output_bytes: u64,
    pub elapsed: Duration,
}

#[async_trait]
pub trait Encoder: Send + Sync {
    /// Encodes `input` into `output`. Blocks until the encoder exits.
    ///
    /// On error `output` must not be trusted; implementations remove any
    /// partial file they wrote.
    async fn encode(
        &self,
        input: &Path,
        output: &Path,
        profile: &EncodeProfile,
    ) -> Result<EncodeResult, EncodeError>;
}
