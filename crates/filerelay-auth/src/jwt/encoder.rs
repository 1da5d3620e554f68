//! JWT token creation for development and tests.

use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};

use filerelay_core::config::AuthConfig;
use filerelay_core::error::AppError;
use filerelay_core::types::PublicProfile;

use super::claims::Claims;

/// Creates signed connection tokens.
///
/// Production deployments receive tokens from the identity provider; this
/// encoder exists so operators and tests can mint compatible ones.
#[derive(Clone)]
pub struct JwtEncoder {
    /// HMAC secret key for signing.
    encoding_key: EncodingKey,
    /// Token TTL in minutes.
    ttl_minutes: i64,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder")
            .field("ttl_minutes", &self.ttl_minutes)
            .finish()
    }
}

impl JwtEncoder {
    /// Creates a new encoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            ttl_minutes: config.token_ttl_minutes as i64,
        }
    }

    /// Issues a token asserting the given profile.
    pub fn issue(&self, profile: &PublicProfile) -> Result<String, AppError> {
        let now = Utc::now();
        let exp = now + chrono::Duration::minutes(self.ttl_minutes);

        let claims = Claims {
            sub: profile.id.to_string(),
            name: profile.name.clone(),
            code: profile.user_id.clone(),
            avatar: profile.avatar.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode token: {e}")))
    }
}
