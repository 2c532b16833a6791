/// Session token claims
///
/// The signed payload of every bearer token: owner, issue and expiry
/// timestamps, issuer, and a unique token id.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: String,
    /// Token id; keeps two tokens issued in the same second distinct
    pub jti: String,
}

impl Claims {
    /// Claims for `user_id` valid for `ttl` from now.
    pub fn new(user_id: Uuid, ttl: Duration, issuer: String) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            iss: issuer,
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Owner of the token, `None` if `sub` is not a UUID.
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}
