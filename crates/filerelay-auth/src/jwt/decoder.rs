//! JWT token validation.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use filerelay_core::config::AuthConfig;
use filerelay_core::error::AppError;
use filerelay_core::result::AppResult;
use filerelay_core::traits::Authenticator;
use filerelay_core::types::VerifiedIdentity;

use super::claims::Claims;

/// Validates connection tokens.
#[derive(Clone)]
pub struct JwtDecoder {
    /// HMAC secret key for verification.
    decoding_key: DecodingKey,
    /// Validation configuration.
    validation: Validation,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtDecoder {
    /// Creates a new decoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 5; // clock skew

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Decodes and validates a token string.
    pub fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AppError::authentication("Token has expired")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidToken => {
                        AppError::authentication("Invalid token format")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        AppError::authentication("Invalid token signature")
                    }
                    _ => AppError::authentication(format!("Token validation failed: {e}")),
                }
            })?;

        if token_data.claims.sub.trim().is_empty() {
            return Err(AppError::authentication("Token has an empty subject"));
        }

        Ok(token_data.claims)
    }
}

/// [`Authenticator`] that requires a valid token on every connection.
#[derive(Debug, Clone)]
pub struct JwtAuthenticator {
    decoder: JwtDecoder,
}

impl JwtAuthenticator {
    /// Wraps a decoder.
    pub fn new(decoder: JwtDecoder) -> Self {
        Self { decoder }
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn authenticate(&self, credential: Option<&str>) -> AppResult<Option<VerifiedIdentity>> {
        let token = credential
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::authentication("Missing connection token"))?;
        let claims = self.decoder.decode_token(token)?;
        Ok(Some(claims.into_identity()))
    }
}
