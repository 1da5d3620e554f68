//! Identity verification performed before a connection may join.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::VerifiedIdentity;

/// Verifies the credential presented on connection upgrade.
///
/// `Ok(None)` means the connection is admitted anonymously and its join
/// payload is trusted as-is.
#[async_trait]
pub trait Authenticator: Send + Sync + std::fmt::Debug + 'static {
    /// Verify an optional credential.
    async fn authenticate(&self, credential: Option<&str>) -> AppResult<Option<VerifiedIdentity>>;
}
