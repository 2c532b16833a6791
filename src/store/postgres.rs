use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{prepare_friend, prepare_new_account, prepare_save, StoreError, UserStore};
use crate::auth::PasswordHasher;
use crate::error::UniqueField;
use crate::models::{Friend, NewAccount, Profile, UserAccount};

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

const USER_COLUMNS: &str = "id, account, email, credential_hash, active_tokens, role, name, avatar, \
     final_goal, cookie_num, accomplishment, friend_code, status, uptime, created_at, updated_at";

/// PostgreSQL user store
///
/// Token list edits are single `UPDATE` statements using the array
/// functions, so each one is atomic for its row. Friend inserts rely on the
/// `(user_id, friend_code)` primary key.
pub struct PostgresUserStore {
    pool: PgPool,
    hasher: PasswordHasher,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    account: String,
    email: String,
    credential_hash: String,
    active_tokens: Vec<String>,
    role: i16,
    name: String,
    avatar: String,
    final_goal: Option<String>,
    cookie_num: i32,
    accomplishment: Option<i32>,
    friend_code: String,
    status: String,
    uptime: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_account(self, friends: Vec<Friend>) -> UserAccount {
        UserAccount {
            id: self.id,
            account: self.account,
            email: self.email,
            credential_hash: self.credential_hash,
            active_tokens: self.active_tokens,
            friends,
            profile: Profile {
                role: self.role,
                name: self.name,
                avatar: self.avatar,
                final_goal: self.final_goal,
                cookie_num: self.cookie_num,
                accomplishment: self.accomplishment,
                friend_code: self.friend_code,
                status: self.status,
                uptime: self.uptime,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
            new_password: None,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) => {
                let code = db_err.code();
                match code.as_deref() {
                    Some(UNIQUE_VIOLATION) => {
                        if db_err.message().contains("users_email_key") {
                            StoreError::Duplicate(UniqueField::Email)
                        } else {
                            StoreError::Duplicate(UniqueField::Account)
                        }
                    }
                    Some(FOREIGN_KEY_VIOLATION) => StoreError::NotFound,
                    _ => StoreError::Backend(err.to_string()),
                }
            }
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => StoreError::Unavailable(err.to_string()),
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

impl PostgresUserStore {
    pub fn new(pool: PgPool, hasher: PasswordHasher) -> Self {
        Self { pool, hasher }
    }

    /// Apply pending migrations from `./migrations`.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("Migration failed: {}", e)))
    }

    async fn load_friends(&self, user_id: Uuid) -> Result<Vec<Friend>, StoreError> {
        let rows = sqlx::query_as::<_, (String, bool)>(
            "SELECT friend_code, poked FROM user_friends WHERE user_id = $1 ORDER BY added_at, friend_code",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(friend_code, poked)| Friend { friend_code, poked })
            .collect())
    }

    async fn hydrate(&self, row: UserRow) -> Result<UserAccount, StoreError> {
        let friends = self.load_friends(row.id).await?;
        Ok(row.into_account(friends))
    }

    async fn user_exists(&self, id: Uuid) -> Result<bool, StoreError> {
        let found = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn token_update(&self, sql: &str, id: Uuid, args: &[&str]) -> Result<Option<Vec<String>>, StoreError> {
        let mut query = sqlx::query_scalar::<_, Vec<String>>(sql).bind(id);
        for arg in args {
            query = query.bind(*arg);
        }
        query = query.bind(Utc::now());
        Ok(query.fetch_optional(&self.pool).await?)
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    #[instrument(skip(self, new_account), fields(account = %new_account.account))]
    async fn create(&self, new_account: NewAccount) -> Result<UserAccount, StoreError> {
        let user = prepare_new_account(&self.hasher, new_account)?;

        sqlx::query(
            r#"
            INSERT INTO users (id, account, email, credential_hash, active_tokens, role, name, avatar,
                               final_goal, cookie_num, accomplishment, friend_code, status, uptime,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(user.id)
        .bind(&user.account)
        .bind(&user.email)
        .bind(&user.credential_hash)
        .bind(&user.active_tokens)
        .bind(user.profile.role)
        .bind(&user.profile.name)
        .bind(&user.profile.avatar)
        .bind(&user.profile.final_goal)
        .bind(user.profile.cookie_num)
        .bind(user.profile.accomplishment)
        .bind(&user.profile.friend_code)
        .bind(&user.profile.status)
        .bind(&user.profile.uptime)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let err = StoreError::from(e);
            warn!(error = %err, "Failed to insert user");
            err
        })?;

        debug!(user_id = %user.id, "User created in database");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn find_by_account(&self, account: &str) -> Result<UserAccount, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {} FROM users WHERE account = $1", USER_COLUMNS))
            .bind(account)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        self.hydrate(row).await
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> Result<UserAccount, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        self.hydrate(row).await
    }

    #[instrument(skip(self))]
    async fn find_by_friend_code(&self, code: &str) -> Result<Vec<UserAccount>, StoreError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE friend_code = $1 ORDER BY created_at",
            USER_COLUMNS
        ))
        .bind(code)
        .fetch_all(&self.pool)
        .await?;

        let mut users = Vec::with_capacity(rows.len());
        for row in rows {
            users.push(self.hydrate(row).await?);
        }
        Ok(users)
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn save(&self, user: &mut UserAccount) -> Result<(), StoreError> {
        prepare_save(&self.hasher, user)?;

        let tokens = sqlx::query_scalar::<_, Vec<String>>(
            r#"
            UPDATE users
            SET account = $2, email = $3, credential_hash = $4, name = $5, final_goal = $6,
                cookie_num = $7, accomplishment = $8, status = $9, uptime = $10, updated_at = $11
            WHERE id = $1
            RETURNING active_tokens
            "#,
        )
        .bind(user.id)
        .bind(&user.account)
        .bind(&user.email)
        .bind(&user.credential_hash)
        .bind(&user.profile.name)
        .bind(&user.profile.final_goal)
        .bind(user.profile.cookie_num)
        .bind(user.profile.accomplishment)
        .bind(&user.profile.status)
        .bind(&user.profile.uptime)
        .bind(user.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;

        user.active_tokens = tokens;
        user.friends = self.load_friends(user.id).await?;
        Ok(())
    }

    #[instrument(skip(self, token))]
    async fn push_token(&self, id: Uuid, token: &str) -> Result<Vec<String>, StoreError> {
        self.token_update(
            r#"
            UPDATE users SET active_tokens = array_append(active_tokens, $2), updated_at = $3
            WHERE id = $1
            RETURNING active_tokens
            "#,
            id,
            &[token],
        )
        .await?
        .ok_or(StoreError::NotFound)
    }

    #[instrument(skip(self, token))]
    async fn remove_token(&self, id: Uuid, token: &str) -> Result<Vec<String>, StoreError> {
        self.token_update(
            r#"
            UPDATE users SET active_tokens = array_remove(active_tokens, $2), updated_at = $3
            WHERE id = $1
            RETURNING active_tokens
            "#,
            id,
            &[token],
        )
        .await?
        .ok_or(StoreError::NotFound)
    }

    #[instrument(skip(self, old, new))]
    async fn replace_token(&self, id: Uuid, old: &str, new: &str) -> Result<Vec<String>, StoreError> {
        let updated = self
            .token_update(
                r#"
                UPDATE users SET active_tokens = array_replace(active_tokens, $2, $3), updated_at = $4
                WHERE id = $1 AND $2 = ANY(active_tokens)
                RETURNING active_tokens
                "#,
                id,
                &[old, new],
            )
            .await?;

        match updated {
            Some(tokens) => Ok(tokens),
            None if self.user_exists(id).await? => Err(StoreError::TokenNotFound),
            None => Err(StoreError::NotFound),
        }
    }

    #[instrument(skip(self, friend), fields(friend_code = %friend.friend_code))]
    async fn add_friend(&self, id: Uuid, friend: Friend) -> Result<Vec<Friend>, StoreError> {
        let friend = prepare_friend(friend)?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO user_friends (user_id, friend_code, poked, added_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, friend_code) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(&friend.friend_code)
        .bind(friend.poked)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 0 {
            return Err(StoreError::FriendExists(friend.friend_code));
        }
        self.load_friends(id).await
    }
}
