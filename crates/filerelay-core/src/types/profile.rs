//! Public profile and verified identity types.

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Public profile of a user, as shown in the roster and attached to offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    /// Logical user id.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Human-facing user code (e.g. `USR7K2Q9XAB`).
    pub user_id: String,
    /// Avatar URL or data URI; empty when unset.
    #[serde(default)]
    pub avatar: String,
}

impl PublicProfile {
    /// Minimal profile for a connection whose identity was not verified.
    pub fn anonymous(id: &UserId) -> Self {
        Self {
            id: id.clone(),
            name: id.to_string(),
            user_id: id.to_string(),
            avatar: String::new(),
        }
    }
}

/// Identity produced by an authenticator before the connection joins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    /// The verified logical user id.
    pub user_id: UserId,
    /// Profile asserted by the identity provider.
    pub profile: PublicProfile,
}
