//! Pass-through authenticator.

use async_trait::async_trait;

use filerelay_core::result::AppResult;
use filerelay_core::traits::Authenticator;
use filerelay_core::types::VerifiedIdentity;

/// Admits every connection anonymously; the join payload becomes the
/// connection's identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustingAuthenticator;

#[async_trait]
impl Authenticator for TrustingAuthenticator {
    async fn authenticate(&self, _credential: Option<&str>) -> AppResult<Option<VerifiedIdentity>> {
        Ok(None)
    }
}
