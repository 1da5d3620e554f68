//! Persistence/download collaborator for reassembled files.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::Artifact;

/// Stores or delivers a reassembled artifact to the user.
#[async_trait]
pub trait ArtifactSink: Send + Sync + std::fmt::Debug + 'static {
    /// Store the artifact, returning a human-readable location.
    async fn store(&self, artifact: Artifact) -> AppResult<String>;
}
