//! # filerelay-auth
//!
//! Implementations of the [`Authenticator`](filerelay_core::traits::Authenticator)
//! collaborator used by the relay before a connection may join.
//!
//! ## Modules
//!
//! - `jwt`: HS256 token verification and development token issuance
//! - `trust`: pass-through authenticator for local development

pub mod jwt;
pub mod trust;

use std::sync::Arc;

use filerelay_core::config::{AuthConfig, AuthMode};
use filerelay_core::traits::Authenticator;

pub use jwt::{Claims, JwtAuthenticator, JwtDecoder, JwtEncoder};
pub use trust::TrustingAuthenticator;

/// Builds the authenticator selected by configuration.
pub fn build_authenticator(config: &AuthConfig) -> Arc<dyn Authenticator> {
    match config.mode {
        AuthMode::Jwt => Arc::new(JwtAuthenticator::new(JwtDecoder::new(config))),
        AuthMode::Trust => {
            tracing::warn!("Authentication disabled: join payloads are trusted as-is");
            Arc::new(TrustingAuthenticator)
        }
    }
}
