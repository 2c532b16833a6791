/// User record store
///
/// Persistence of identity, credential hash, profile, the live session
/// token list and the friend list. Token and friend mutations are separate
/// atomic operations so concurrent requests for one account never overwrite
/// each other's edits; `save` only touches identity, credential and profile.

mod memory;
mod postgres;

pub use memory::InMemoryUserStore;
pub use postgres::PostgresUserStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::PasswordHasher;
use crate::error::{AppError, ConflictError, UniqueField, ValidationError};
use crate::models::{Friend, NewAccount, Profile, UserAccount};
use crate::validators::{
    is_valid_account, is_valid_email, is_valid_friend_code, is_valid_name, validate_password,
};

/// Store-level failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("duplicate {0}")]
    Duplicate(UniqueField),
    #[error("record not found")]
    NotFound,
    #[error("friend code {0} already added")]
    FriendExists(String),
    #[error("token is not an active session of this account")]
    TokenNotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store failure: {0}")]
    Backend(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Invalid(e) => AppError::Validation(e),
            StoreError::Duplicate(field) => AppError::Duplicate(field),
            StoreError::NotFound => AppError::NotFound("user"),
            StoreError::FriendExists(_) => AppError::Conflict(ConflictError::FriendAlreadyAdded),
            StoreError::TokenNotFound => AppError::Conflict(ConflictError::TokenNotFound),
            StoreError::Unavailable(msg) => AppError::Transient(msg),
            StoreError::Backend(msg) => AppError::Internal(msg),
        }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Validate, hash the password and insert. Uniqueness of account and
    /// email is decided by the insert itself, never by a prior lookup.
    async fn create(&self, new_account: NewAccount) -> Result<UserAccount, StoreError>;

    async fn find_by_account(&self, account: &str) -> Result<UserAccount, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<UserAccount, StoreError>;

    /// Exact match only; empty when nobody holds `code`.
    async fn find_by_friend_code(&self, code: &str) -> Result<Vec<UserAccount>, StoreError>;

    /// Persist identity, staged password and profile fields of `user`.
    async fn save(&self, user: &mut UserAccount) -> Result<(), StoreError>;

    /// Append a session token; returns the resulting token list.
    async fn push_token(&self, id: Uuid, token: &str) -> Result<Vec<String>, StoreError>;

    /// Remove every entry equal to `token`; removing an absent token is a no-op.
    async fn remove_token(&self, id: Uuid, token: &str) -> Result<Vec<String>, StoreError>;

    /// Swap `old` for `new` in place. Fails with `TokenNotFound` if `old`
    /// is not in the list at write time.
    async fn replace_token(&self, id: Uuid, old: &str, new: &str) -> Result<Vec<String>, StoreError>;

    /// Insert `friend` unless an entry with the same code already exists.
    async fn add_friend(&self, id: Uuid, friend: Friend) -> Result<Vec<Friend>, StoreError>;
}

/// Build a validated, hashed record from a registration payload.
pub(crate) fn prepare_new_account(
    hasher: &PasswordHasher,
    new_account: NewAccount,
) -> Result<UserAccount, StoreError> {
    let account = is_valid_account(&new_account.account)?;
    let email = is_valid_email(&new_account.email)?;
    let name = match new_account.name {
        Some(name) => Some(is_valid_name(&name)?),
        None => None,
    };
    validate_password(&new_account.password)?;

    let credential_hash = hasher.hash(&new_account.password).map_err(backend_error)?;
    let profile = Profile::for_new_account(&account, name);

    Ok(UserAccount::new(account, email, credential_hash, profile))
}

/// Validate a record about to be saved and hash its staged password.
///
/// Runs before any persistence so a rejected write leaves the stored
/// record untouched.
pub(crate) fn prepare_save(hasher: &PasswordHasher, user: &mut UserAccount) -> Result<(), StoreError> {
    user.account = is_valid_account(&user.account)?;
    user.email = is_valid_email(&user.email)?;
    user.profile.name = is_valid_name(&user.profile.name)?;
    if user.profile.cookie_num < 0 {
        return Err(ValidationError::Negative("cookie_num").into());
    }
    if let Some(accomplishment) = user.profile.accomplishment {
        if accomplishment < 0 {
            return Err(ValidationError::Negative("accomplishment").into());
        }
    }

    if let Some(plaintext) = user.pending_password() {
        validate_password(plaintext)?;
        let credential_hash = hasher.hash(plaintext).map_err(backend_error)?;
        user.apply_credential(credential_hash);
    }

    user.updated_at = chrono::Utc::now();
    Ok(())
}

pub(crate) fn prepare_friend(friend: Friend) -> Result<Friend, StoreError> {
    Ok(Friend {
        friend_code: is_valid_friend_code(&friend.friend_code)?,
        poked: friend.poked,
    })
}

fn backend_error(err: AppError) -> StoreError {
    StoreError::Backend(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(crate::auth::MIN_COST).unwrap()
    }

    fn payload() -> NewAccount {
        NewAccount {
            account: "alice01".to_string(),
            email: "a@x.com".to_string(),
            password: "secret1".to_string(),
            name: None,
        }
    }

    #[test]
    fn test_prepare_new_account_hashes_password() {
        let user = prepare_new_account(&hasher(), payload()).unwrap();

        assert_ne!(user.credential_hash, "secret1");
        assert!(crate::auth::verify_password("secret1", &user.credential_hash));
        assert!(user.active_tokens.is_empty());
        assert!(user.friends.is_empty());
    }

    #[test]
    fn test_prepare_new_account_reports_field() {
        let mut bad = payload();
        bad.password = "short".to_string();
        match prepare_new_account(&hasher(), bad) {
            Err(StoreError::Invalid(e)) => assert_eq!(e.field(), "password"),
            other => panic!("expected invalid password, got {:?}", other.map(|u| u.account)),
        }

        let mut bad = payload();
        bad.email = "not-an-email".to_string();
        match prepare_new_account(&hasher(), bad) {
            Err(StoreError::Invalid(e)) => assert_eq!(e.field(), "email"),
            other => panic!("expected invalid email, got {:?}", other.map(|u| u.account)),
        }
    }

    #[test]
    fn test_prepare_save_rehashes_only_staged_password() {
        let mut user = prepare_new_account(&hasher(), payload()).unwrap();
        let original_hash = user.credential_hash.clone();

        prepare_save(&hasher(), &mut user).unwrap();
        assert_eq!(user.credential_hash, original_hash);

        user.change_password("secret2");
        prepare_save(&hasher(), &mut user).unwrap();
        assert_ne!(user.credential_hash, original_hash);
        assert!(crate::auth::verify_password("secret2", &user.credential_hash));
        assert!(user.pending_password().is_none());
    }

    #[test]
    fn test_prepare_save_rejects_bad_password_without_hashing() {
        let mut user = prepare_new_account(&hasher(), payload()).unwrap();
        let original_hash = user.credential_hash.clone();

        user.change_password("x".repeat(21));
        assert!(matches!(
            prepare_save(&hasher(), &mut user),
            Err(StoreError::Invalid(ValidationError::TooLong("password", 20)))
        ));
        assert_eq!(user.credential_hash, original_hash);
    }

    #[test]
    fn test_prepare_save_rejects_negative_counter() {
        let mut user = prepare_new_account(&hasher(), payload()).unwrap();
        user.profile.cookie_num = -1;

        assert!(matches!(
            prepare_save(&hasher(), &mut user),
            Err(StoreError::Invalid(ValidationError::Negative("cookie_num")))
        ));
    }

    #[test]
    fn test_store_errors_translate() {
        assert!(matches!(
            AppError::from(StoreError::Duplicate(UniqueField::Email)),
            AppError::Duplicate(UniqueField::Email)
        ));
        assert!(matches!(
            AppError::from(StoreError::Unavailable("pool timed out".to_string())),
            AppError::Transient(_)
        ));
        assert!(matches!(
            AppError::from(StoreError::TokenNotFound),
            AppError::Conflict(ConflictError::TokenNotFound)
        ));
    }
}
