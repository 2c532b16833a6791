//! User account records as held by the store.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub const ROLE_USER: i16 = 0;
pub const DEFAULT_STATUS: &str = "resting";
pub const DEFAULT_UPTIME: &str = "0:00";

const REDACTED: &str = "<redacted>";

/// One entry of an account's friend list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friend {
    pub friend_code: String,
    pub poked: bool,
}

/// Profile fields carried alongside the identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub role: i16,
    pub name: String,
    pub avatar: String,
    pub final_goal: Option<String>,
    pub cookie_num: i32,
    pub accomplishment: Option<i32>,
    pub friend_code: String,
    pub status: String,
    pub uptime: String,
}

impl Profile {
    /// Defaults filled in at registration.
    pub fn for_new_account(account: &str, name: Option<String>) -> Self {
        Self {
            role: ROLE_USER,
            name: name.unwrap_or_else(|| account.to_string()),
            avatar: default_avatar(account),
            final_goal: None,
            cookie_num: 0,
            accomplishment: None,
            friend_code: generate_friend_code(account),
            status: DEFAULT_STATUS.to_string(),
            uptime: DEFAULT_UPTIME.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct UserAccount {
    pub id: Uuid,
    pub account: String,
    pub email: String,
    pub credential_hash: String,
    /// Valid sessions, one per logged-in device, in issue order.
    pub active_tokens: Vec<String>,
    pub friends: Vec<Friend>,
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub(crate) new_password: Option<String>,
}

// Credential hash, session tokens and staged plaintext stay out of logs.
impl fmt::Debug for UserAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserAccount")
            .field("id", &self.id)
            .field("account", &self.account)
            .field("email", &self.email)
            .field("credential_hash", &REDACTED)
            .field("active_tokens", &format_args!("[{} redacted]", self.active_tokens.len()))
            .field("friends", &self.friends)
            .field("profile", &self.profile)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .field("new_password", &self.new_password.as_ref().map(|_| REDACTED))
            .finish()
    }
}

impl UserAccount {
    /// A freshly registered account with no sessions and no friends.
    pub fn new(account: String, email: String, credential_hash: String, profile: Profile) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            account,
            email,
            credential_hash,
            active_tokens: Vec::new(),
            friends: Vec::new(),
            profile,
            created_at: now,
            updated_at: now,
            new_password: None,
        }
    }

    /// Stage a password change; the store validates and hashes it on `save`.
    pub fn change_password(&mut self, plaintext: impl Into<String>) {
        self.new_password = Some(plaintext.into());
    }

    pub fn pending_password(&self) -> Option<&str> {
        self.new_password.as_deref()
    }

    /// Called by stores once the staged password has been hashed.
    pub(crate) fn apply_credential(&mut self, credential_hash: String) {
        self.credential_hash = credential_hash;
        self.new_password = None;
    }

    pub fn has_token(&self, token: &str) -> bool {
        self.active_tokens.iter().any(|t| t == token)
    }
}

/// Registration payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewAccount {
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Partial profile edit; absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub final_goal: Option<String>,
    pub status: Option<String>,
    pub uptime: Option<String>,
    pub cookie_num: Option<i32>,
    pub accomplishment: Option<i32>,
}

impl ProfileUpdate {
    pub fn apply_to(self, user: &mut UserAccount) {
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(password) = self.password {
            user.change_password(password);
        }
        if let Some(name) = self.name {
            user.profile.name = name;
        }
        if let Some(final_goal) = self.final_goal {
            user.profile.final_goal = Some(final_goal);
        }
        if let Some(status) = self.status {
            user.profile.status = status;
        }
        if let Some(uptime) = self.uptime {
            user.profile.uptime = uptime;
        }
        if let Some(cookie_num) = self.cookie_num {
            user.profile.cookie_num = cookie_num;
        }
        if let Some(accomplishment) = self.accomplishment {
            user.profile.accomplishment = Some(accomplishment);
        }
    }
}

/// Public view of an account: no credential hash, no tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub account: String,
    pub email: String,
    #[serde(flatten)]
    pub profile: Profile,
    pub friends: Vec<Friend>,
    pub created_at: DateTime<Utc>,
}

impl From<&UserAccount> for UserProfile {
    fn from(user: &UserAccount) -> Self {
        Self {
            id: user.id,
            account: user.account.clone(),
            email: user.email.clone(),
            profile: user.profile.clone(),
            friends: user.friends.clone(),
            created_at: user.created_at,
        }
    }
}

fn default_avatar(account: &str) -> String {
    format!(
        "https://source.boringavatars.com/beam/120/{}?colors=907363,BFAE9F,D9CDBF,F2E8DC,8FA9BF",
        account
    )
}

/// `<account>#NNNN` with a random zero-padded suffix.
pub fn generate_friend_code(account: &str) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(0..10_000);
    format!("{}#{:04}", account, suffix)
}
