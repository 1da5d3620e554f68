//! JWT claims structure carried by connection tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use filerelay_core::types::{PublicProfile, UserId, VerifiedIdentity};

/// JWT claims payload embedded in every connection token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the logical user ID.
    pub sub: String,
    /// Display name.
    pub name: String,
    /// Human-facing user code.
    #[serde(default)]
    pub code: String,
    /// Avatar URL.
    #[serde(default)]
    pub avatar: String,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
}

impl Claims {
    /// Returns the logical user ID from the subject claim.
    pub fn user_id(&self) -> UserId {
        UserId::new(self.sub.clone())
    }

    /// Returns the expiration as a `DateTime<Utc>`.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }

    /// Converts the claims into the identity handed to the relay.
    pub fn into_identity(self) -> VerifiedIdentity {
        let user_id = self.user_id();
        let code = if self.code.is_empty() {
            self.sub.clone()
        } else {
            self.code
        };
        VerifiedIdentity {
            profile: PublicProfile {
                id: user_id.clone(),
                name: self.name,
                user_id: code,
                avatar: self.avatar,
            },
            user_id,
        }
    }
}
