//! `RequestIdentity` extractor: verifies the bearer token with the
//! configured authenticator.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use filerelay_core::error::AppError;
use filerelay_core::types::VerifiedIdentity;

use crate::error::ApiError;
use crate::state::AppState;

/// Identity of the caller; `None` when the authenticator leaves requests
/// anonymous.
#[derive(Debug, Clone)]
pub struct RequestIdentity(pub Option<VerifiedIdentity>);

impl FromRequestParts<AppState> for RequestIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = match parts.headers.get(AUTHORIZATION) {
            Some(value) => {
                let value = value
                    .to_str()
                    .map_err(|_| AppError::authentication("Invalid Authorization header"))?;
                Some(
                    value
                        .strip_prefix("Bearer ")
                        .ok_or_else(|| AppError::authentication("Invalid Authorization header format"))?
                        .to_string(),
                )
            }
            None => None,
        };

        let identity = state.authenticator.authenticate(token.as_deref()).await?;
        Ok(RequestIdentity(identity))
    }
}
