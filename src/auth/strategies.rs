/// Authentication strategies
///
/// Two independent pipelines over the user store:
/// - credentials: account + password -> account
/// - bearer: token -> account + the token itself
///
/// Both report failures only as the opaque `AuthError` kinds; the precise
/// cause goes to the log.

use crate::auth::jwt::TokenCodec;
use crate::auth::password::verify_password;
use crate::error::{AppError, AuthError, TokenRejection};
use crate::models::UserAccount;
use crate::store::{StoreError, UserStore};

/// An account proven by a bearer token that is still one of its sessions
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub account: UserAccount,
    /// The exact token presented; logout and extend act on this entry.
    pub token: String,
}

/// Extract the credential from an `Authorization` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Password login.
///
/// An unknown account and a wrong password produce the same
/// `InvalidCredentials`.
pub async fn authenticate_credentials(
    store: &dyn UserStore,
    account: &str,
    password: &str,
) -> Result<UserAccount, AppError> {
    let account = account.trim();
    if account.is_empty() || password.is_empty() {
        return Err(AuthError::MissingCredentials.into());
    }

    let user = match store.find_by_account(account).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => {
            tracing::warn!(account = %account, "Login for unknown account");
            return Err(AuthError::InvalidCredentials.into());
        }
        Err(e) => return Err(e.into()),
    };

    if !verify_password(password, &user.credential_hash) {
        tracing::warn!(user_id = %user.id, "Login with wrong password");
        return Err(AuthError::InvalidCredentials.into());
    }

    Ok(user)
}

/// Bearer token authentication.
///
/// The token must pass the codec (signature, expiry) and still be listed in
/// the owner's active tokens, so a logged-out or rotated token is refused
/// immediately even though it has not expired.
pub async fn authenticate_bearer(
    store: &dyn UserStore,
    codec: &TokenCodec,
    token: Option<&str>,
) -> Result<AuthenticatedSession, AppError> {
    let token = match token.map(str::trim) {
        Some(token) if !token.is_empty() => token,
        _ => return Err(AuthError::MissingToken.into()),
    };

    let user_id = codec.verify(token).map_err(|e| {
        tracing::warn!(reason = %e, "Bearer token refused by codec");
        AuthError::InvalidToken(TokenRejection::from(e))
    })?;

    let user = match store.find_by_id(user_id).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => {
            tracing::warn!(user_id = %user_id, "Bearer token for unknown account");
            return Err(AuthError::InvalidToken(TokenRejection::Revoked).into());
        }
        Err(e) => return Err(e.into()),
    };

    if !user.has_token(token) {
        tracing::warn!(user_id = %user_id, "Bearer token is not an active session");
        return Err(AuthError::InvalidToken(TokenRejection::Revoked).into());
    }

    Ok(AuthenticatedSession {
        account: user,
        token: token.to_string(),
    })
}
