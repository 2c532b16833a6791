//! Account operations outside the session lifecycle: registration,
//! profile edits and friend links.

use crate::auth::AuthenticatedSession;
use crate::error::{AppError, ValidationError};
use crate::models::{Friend, NewAccount, ProfileUpdate, UserAccount};
use crate::store::UserStore;
use crate::validators::is_valid_friend_code;

pub async fn register(store: &dyn UserStore, new_account: NewAccount) -> Result<UserAccount, AppError> {
    let user = store.create(new_account).await?;

    tracing::info!(user_id = %user.id, account = %user.account, "User registered");
    Ok(user)
}

/// Apply a partial edit to the authenticated account and persist it.
pub async fn update_profile(
    store: &dyn UserStore,
    session: &AuthenticatedSession,
    update: ProfileUpdate,
) -> Result<UserAccount, AppError> {
    // Start from the stored record, not the copy taken at authentication
    let mut user = store.find_by_id(session.account.id).await?;
    let password_changed = update.password.is_some();

    update.apply_to(&mut user);
    store.save(&mut user).await?;

    tracing::info!(user_id = %user.id, password_changed, "Profile updated");
    Ok(user)
}

/// Link the account holding `friend_code` as a friend of the caller.
pub async fn add_friend(
    store: &dyn UserStore,
    session: &AuthenticatedSession,
    friend_code: &str,
    poked: bool,
) -> Result<Vec<Friend>, AppError> {
    let friend_code = is_valid_friend_code(friend_code)?;
    if friend_code == session.account.profile.friend_code {
        return Err(ValidationError::Rejected("friend_code", "cannot add your own friend code").into());
    }

    if store.find_by_friend_code(&friend_code).await?.is_empty() {
        return Err(AppError::NotFound("friend code"));
    }

    let friends = store
        .add_friend(session.account.id, Friend { friend_code, poked })
        .await?;

    tracing::info!(user_id = %session.account.id, friends = friends.len(), "Friend added");
    Ok(friends)
}
