use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{prepare_friend, prepare_new_account, prepare_save, StoreError, UserStore};
use crate::auth::PasswordHasher;
use crate::error::UniqueField;
use crate::models::{Friend, NewAccount, UserAccount};

/// In-memory user store for development and testing
///
/// Every operation runs inside a single lock acquisition, which gives the
/// same per-record atomicity the Postgres store gets from single-statement
/// updates. Data is lost on restart.
pub struct InMemoryUserStore {
    hasher: PasswordHasher,
    users: RwLock<HashMap<Uuid, UserAccount>>,
}

impl InMemoryUserStore {
    pub fn new(hasher: PasswordHasher) -> Self {
        Self {
            hasher,
            users: RwLock::new(HashMap::new()),
        }
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }
}

fn conflicting_field(users: &HashMap<Uuid, UserAccount>, candidate: &UserAccount) -> Option<UniqueField> {
    users
        .values()
        .filter(|existing| existing.id != candidate.id)
        .find_map(|existing| {
            if existing.account == candidate.account {
                Some(UniqueField::Account)
            } else if existing.email == candidate.email {
                Some(UniqueField::Email)
            } else {
                None
            }
        })
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    #[instrument(skip(self, new_account), fields(account = %new_account.account))]
    async fn create(&self, new_account: NewAccount) -> Result<UserAccount, StoreError> {
        let user = prepare_new_account(&self.hasher, new_account)?;

        let mut users = self.users.write().await;
        if let Some(field) = conflicting_field(&users, &user) {
            warn!(field = %field, "Uniqueness violation on create");
            return Err(StoreError::Duplicate(field));
        }
        users.insert(user.id, user.clone());

        debug!(user_id = %user.id, "User created in memory");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn find_by_account(&self, account: &str) -> Result<UserAccount, StoreError> {
        self.users
            .read()
            .await
            .values()
            .find(|user| user.account == account)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> Result<UserAccount, StoreError> {
        self.users.read().await.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    #[instrument(skip(self))]
    async fn find_by_friend_code(&self, code: &str) -> Result<Vec<UserAccount>, StoreError> {
        let mut matches: Vec<UserAccount> = self
            .users
            .read()
            .await
            .values()
            .filter(|user| user.profile.friend_code == code)
            .cloned()
            .collect();
        matches.sort_by_key(|user| user.created_at);
        Ok(matches)
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn save(&self, user: &mut UserAccount) -> Result<(), StoreError> {
        prepare_save(&self.hasher, user)?;

        let mut users = self.users.write().await;
        if !users.contains_key(&user.id) {
            return Err(StoreError::NotFound);
        }
        if let Some(field) = conflicting_field(&users, user) {
            warn!(field = %field, "Uniqueness violation on save");
            return Err(StoreError::Duplicate(field));
        }

        let stored = users.get_mut(&user.id).ok_or(StoreError::NotFound)?;
        stored.account = user.account.clone();
        stored.email = user.email.clone();
        stored.credential_hash = user.credential_hash.clone();
        stored.profile = user.profile.clone();
        stored.updated_at = user.updated_at;

        // Hand back the current session and friend state
        user.active_tokens = stored.active_tokens.clone();
        user.friends = stored.friends.clone();
        Ok(())
    }

    #[instrument(skip(self, token))]
    async fn push_token(&self, id: Uuid, token: &str) -> Result<Vec<String>, StoreError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.active_tokens.push(token.to_string());
        Ok(user.active_tokens.clone())
    }

    #[instrument(skip(self, token))]
    async fn remove_token(&self, id: Uuid, token: &str) -> Result<Vec<String>, StoreError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.active_tokens.retain(|t| t != token);
        Ok(user.active_tokens.clone())
    }

    #[instrument(skip(self, old, new))]
    async fn replace_token(&self, id: Uuid, old: &str, new: &str) -> Result<Vec<String>, StoreError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        let slot = user
            .active_tokens
            .iter_mut()
            .find(|t| t.as_str() == old)
            .ok_or(StoreError::TokenNotFound)?;
        *slot = new.to_string();
        Ok(user.active_tokens.clone())
    }

    #[instrument(skip(self, friend), fields(friend_code = %friend.friend_code))]
    async fn add_friend(&self, id: Uuid, friend: Friend) -> Result<Vec<Friend>, StoreError> {
        let friend = prepare_friend(friend)?;

        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        if user.friends.iter().any(|f| f.friend_code == friend.friend_code) {
            return Err(StoreError::FriendExists(friend.friend_code));
        }
        user.friends.push(friend);
        Ok(user.friends.clone())
    }
}
