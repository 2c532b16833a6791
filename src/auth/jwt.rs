/// Session token codec
///
/// Issues and verifies HS256-signed bearer tokens carrying a user id and an
/// absolute expiry. The signing key is process-wide and comes from
/// [`JwtSettings`].

use chrono::Duration;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::error::{AppError, TokenRejection};

/// Why the codec refused a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token has expired")]
    Expired,
    #[error("token signature does not match")]
    BadSignature,
}

impl From<TokenError> for TokenRejection {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed => TokenRejection::Malformed,
            TokenError::Expired => TokenRejection::Expired,
            TokenError::BadSignature => TokenRejection::BadSignature,
        }
    }
}

#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    session_ttl: Duration,
}

impl TokenCodec {
    pub fn new(config: &JwtSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        validation.set_required_spec_claims(&["exp", "iat", "sub", "iss"]);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            issuer: config.issuer.clone(),
            session_ttl: Duration::seconds(config.token_ttl_seconds),
        }
    }

    /// Lifetime of tokens issued by login and extend.
    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Sign a token for `user_id` expiring `ttl` from now.
    ///
    /// # Errors
    /// Returns error if token encoding fails
    pub fn issue(&self, user_id: Uuid, ttl: Duration) -> Result<String, AppError> {
        let claims = Claims::new(user_id, ttl, self.issuer.clone());

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Sign a token with the configured session lifetime.
    pub fn issue_session(&self, user_id: Uuid) -> Result<String, AppError> {
        self.issue(user_id, self.session_ttl)
    }

    /// Check signature and expiry and return the decoded claims.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token verification failed");
                match e.kind() {
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    ErrorKind::InvalidSignature => TokenError::BadSignature,
                    _ => TokenError::Malformed,
                }
            })
    }

    /// Return the user id embedded in a valid token.
    pub fn verify(&self, token: &str) -> Result<Uuid, TokenError> {
        self.decode(token)?.user_id().ok_or(TokenError::Malformed)
    }
}
