//! Artifact sinks: where reassembled files end up.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use filerelay_core::error::AppError;
use filerelay_core::result::AppResult;
use filerelay_core::traits::ArtifactSink;
use filerelay_core::types::Artifact;

/// Upper bound on `name (n).ext` attempts before giving up.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Writes artifacts into a download directory. Existing files are never
/// overwritten; a numbered suffix is added instead.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Sink writing into `dir` (created on first store).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Strip any directory components a sender may have put in the name.
fn safe_file_name(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() || base == "." || base == ".." {
        "download".to_string()
    } else {
        base.to_string()
    }
}

fn candidate(name: &str, attempt: u32) -> String {
    if attempt == 0 {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem} ({attempt}).{ext}"),
        _ => format!("{name} ({attempt})"),
    }
}

/// Write `data` through `out`. On failure the partially written file at
/// `path` is removed.
async fn write_or_discard<W: AsyncWrite + Unpin>(
    mut out: W,
    path: &Path,
    data: &[u8],
) -> std::io::Result<()> {
    let written = match out.write_all(data).await {
        Ok(()) => out.flush().await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        drop(out);
        if let Err(cleanup) = tokio::fs::remove_file(path).await {
            warn!(path = %path.display(), error = %cleanup, "Failed to remove partial artifact");
        }
        return Err(e);
    }
    Ok(())
}

#[async_trait]
impl ArtifactSink for DirectorySink {
    async fn store(&self, artifact: Artifact) -> AppResult<String> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            AppError::with_source(
                filerelay_core::error::ErrorKind::Storage,
                format!("Cannot create download directory {}", self.dir.display()),
                e,
            )
        })?;

        let name = safe_file_name(&artifact.file_name);
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let path = self.dir.join(candidate(&name, attempt));
            let file = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;

            let file = match file {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };

            write_or_discard(file, &path, &artifact.data).await?;
            debug!(path = %path.display(), bytes = artifact.len(), "Artifact written");
            return Ok(path.display().to_string());
        }

        Err(AppError::storage(format!(
            "No free file name for '{}' in {}",
            name,
            self.dir.display()
        )))
    }
}

/// Keeps artifacts in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    artifacts: Mutex<Vec<Artifact>>,
}

impl MemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything stored so far.
    pub fn artifacts(&self) -> Vec<Artifact> {
        self.artifacts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl ArtifactSink for MemorySink {
    async fn store(&self, artifact: Artifact) -> AppResult<String> {
        let mut artifacts = self.artifacts.lock().unwrap_or_else(|e| e.into_inner());
        let location = format!("memory:{}", artifacts.len());
        artifacts.push(artifact);
        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use filerelay_core::types::UserId;

    use super::*;

    fn artifact(name: &str, data: &'static [u8]) -> Artifact {
        Artifact {
            file_name: name.to_string(),
            mime_type: "text/plain".to_string(),
            from: UserId::new("alice"),
            data: Bytes::from_static(data),
        }
    }

    #[tokio::test]
    async fn test_never_overwrites() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sink = DirectorySink::new(dir.path().join("downloads"));

        let first = sink.store(artifact("notes.txt", b"one")).await.expect("store");
        let second = sink.store(artifact("notes.txt", b"two")).await.expect("store");

        assert_ne!(first, second);
        assert!(second.ends_with("notes (1).txt"));
        assert_eq!(tokio::fs::read(&first).await.expect("read"), b"one");
        assert_eq!(tokio::fs::read(&second).await.expect("read"), b"two");
    }

    #[tokio::test]
    async fn test_strips_path_components() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sink = DirectorySink::new(dir.path());

        let stored = sink
            .store(artifact("../../etc/passwd", b"x"))
            .await
            .expect("store");

        assert_eq!(Path::new(&stored).parent(), Some(dir.path()));
        assert!(stored.ends_with("passwd"));
    }

    /// Accepts a few bytes, then fails every write.
    struct FailingWriter {
        budget: usize,
    }

    impl AsyncWrite for FailingWriter {
        fn poll_write(
            mut self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &[u8],
        ) -> std::task::Poll<std::io::Result<usize>> {
            if self.budget == 0 {
                return std::task::Poll::Ready(Err(std::io::Error::other("disk full")));
            }
            let n = buf.len().min(self.budget);
            self.budget -= n;
            std::task::Poll::Ready(Ok(n))
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_partial_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.pdf");
        tokio::fs::write(&path, b"par").await.expect("seed");

        let result = write_or_discard(FailingWriter { budget: 3 }, &path, b"partial data").await;

        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_candidate_names() {
        assert_eq!(candidate("a.tar.gz", 2), "a.tar (2).gz");
        assert_eq!(candidate("README", 1), "README (1)");
        assert_eq!(candidate(".env", 1), ".env (1)");
        assert_eq!(safe_file_name(".."), "download");
    }
}
