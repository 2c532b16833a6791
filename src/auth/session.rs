/// Session operations
///
/// Login issues a token and appends it to the account's active list;
/// logout removes it; extend swaps it for a fresh one in the same slot.
/// Each list edit is one atomic store call.

use crate::auth::jwt::TokenCodec;
use crate::auth::strategies::{authenticate_credentials, AuthenticatedSession};
use crate::error::{AppError, AuthError, TokenRejection};
use crate::models::UserAccount;
use crate::store::{StoreError, UserStore};

/// A successful login: the account as of the token append, plus the token.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub account: UserAccount,
    pub token: String,
}

pub async fn login(
    store: &dyn UserStore,
    codec: &TokenCodec,
    account: &str,
    password: &str,
) -> Result<LoginOutcome, AppError> {
    let mut user = authenticate_credentials(store, account, password).await?;

    let token = codec.issue_session(user.id)?;
    user.active_tokens = store
        .push_token(user.id, &token)
        .await
        .map_err(session_store_error)?;

    tracing::info!(
        user_id = %user.id,
        sessions = user.active_tokens.len(),
        "User logged in"
    );
    Ok(LoginOutcome { account: user, token })
}

/// Drop the presented token from the account's sessions.
pub async fn logout(store: &dyn UserStore, session: &AuthenticatedSession) -> Result<(), AppError> {
    let remaining = store
        .remove_token(session.account.id, &session.token)
        .await
        .map_err(session_store_error)?;

    tracing::info!(
        user_id = %session.account.id,
        sessions = remaining.len(),
        "User logged out"
    );
    Ok(())
}

/// Replace the presented token with a newly issued one, in place.
///
/// Fails with `TokenNotFound` if the presented token vanished between
/// authentication and the write (e.g. a concurrent logout).
pub async fn extend(
    store: &dyn UserStore,
    codec: &TokenCodec,
    session: &AuthenticatedSession,
) -> Result<String, AppError> {
    let token = codec.issue_session(session.account.id)?;
    store
        .replace_token(session.account.id, &session.token, &token)
        .await
        .map_err(session_store_error)?;

    tracing::info!(user_id = %session.account.id, "Session token extended");
    Ok(token)
}

// The account disappearing mid-request makes its tokens invalid.
fn session_store_error(err: StoreError) -> AppError {
    match err {
        StoreError::NotFound => AuthError::InvalidToken(TokenRejection::Revoked).into(),
        other => other.into(),
    }
}
