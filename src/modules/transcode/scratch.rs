use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

/// Per-run scratch directory holding the input copy and the encoded output.
///
/// Call [`ScratchSpace::cleanup`] on every exit path. If the run is
/// cancelled or panics, dropping the value still removes the directory.
#[derive(Debug)]
pub struct ScratchSpace {
    dir: TempDir,
    input: PathBuf,
    output: PathBuf,
}

impl ScratchSpace {
    pub async fn create(root: &Path, source_path: &str) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(root).await?;

        let root = root.to_path_buf();
        let dir = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new()
                .prefix("transcode-")
                .tempdir_in(root)
        })
        .await
        .map_err(std::io::Error::other)??;

        let input = dir.path().join(format!("input.{}", input_extension(source_path)));
        let output = dir.path().join("output.mp4");
        debug!(path = %dir.path().display(), "Scratch space created");

        Ok(Self { dir, input, output })
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Removes the directory. Failures are logged, never returned.
    pub async fn cleanup(self) {
        let path = self.dir.path().to_path_buf();
        let dir = self.dir;
        match tokio::task::spawn_blocking(move || dir.close()).await {
            Ok(Ok(())) => debug!(path = %path.display(), "Scratch space removed"),
            Ok(Err(e)) => warn!(path = %path.display(), error = %e, "Failed to remove scratch space"),
            Err(e) => warn!(path = %path.display(), error = %e, "Scratch cleanup task failed"),
        }
    }
}

/// Keeps the source extension so the encoder can sniff the container;
/// anything odd falls back to `bin`.
fn input_extension(source_path: &str) -> String {
    Path::new(source_path)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "bin".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_cleanup() {
        let root = TempDir::new().unwrap();
        let scratch = ScratchSpace::create(root.path(), "videos/uploads/a.MOV")
            .await
            .unwrap();

        assert!(scratch.input().ends_with("input.mov"));
        assert!(scratch.output().ends_with("output.mp4"));
        tokio::fs::write(scratch.input(), b"data").await.unwrap();
        tokio::fs::write(scratch.output(), b"data").await.unwrap();

        scratch.cleanup().await;
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_drop_removes_directory() {
        let root = TempDir::new().unwrap();
        {
            let scratch = ScratchSpace::create(root.path(), "videos/uploads/a.mp4")
                .await
                .unwrap();
            tokio::fs::write(scratch.input(), b"data").await.unwrap();
        }
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_input_extension() {
        assert_eq!(input_extension("a.mkv"), "mkv");
        assert_eq!(input_extension("noext"), "bin");
        assert_eq!(input_extension("weird.ex t"), "bin");
    }
}
