/// Input validators for account records
///
/// Every write to the user store passes through these before anything is
/// persisted or hashed.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

pub const MIN_ACCOUNT_LENGTH: usize = 6;
pub const MAX_ACCOUNT_LENGTH: usize = 20;
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_PASSWORD_LENGTH: usize = 20;
const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MAX_NAME_LENGTH: usize = 64;
const MAX_FRIEND_CODE_LENGTH: usize = 32;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$"
    ).expect("email regex is valid");
}

/// Account names: 6-20 ASCII letters or digits.
pub fn is_valid_account(account: &str) -> Result<String, ValidationError> {
    let trimmed = account.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("account"));
    }

    let length = trimmed.chars().count();
    if length < MIN_ACCOUNT_LENGTH {
        return Err(ValidationError::TooShort("account", MIN_ACCOUNT_LENGTH));
    }
    if length > MAX_ACCOUNT_LENGTH {
        return Err(ValidationError::TooLong("account", MAX_ACCOUNT_LENGTH));
    }

    if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat("account"));
    }

    Ok(trimmed.to_string())
}

/// Validates an email address and returns it trimmed.
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email"));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email", MAX_EMAIL_LENGTH));
    }

    // Local part over 64 octets is not deliverable
    if let Some(at_pos) = trimmed.find('@') {
        if at_pos > 64 {
            return Err(ValidationError::InvalidFormat("email"));
        }
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email"));
    }

    Ok(trimmed.to_string())
}

/// Plaintext password bounds, checked before hashing.
///
/// Length is counted in UTF-16 code units, so the longest accepted
/// password is 60 bytes of UTF-8 and stays under bcrypt's 72-byte input
/// limit.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password"));
    }

    let length = password.encode_utf16().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort("password", MIN_PASSWORD_LENGTH));
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong("password", MAX_PASSWORD_LENGTH));
    }

    Ok(())
}

/// Display names: non-empty, no control characters.
pub fn is_valid_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("name"));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong("name", MAX_NAME_LENGTH));
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidFormat("name"));
    }

    Ok(trimmed.to_string())
}

pub fn is_valid_friend_code(code: &str) -> Result<String, ValidationError> {
    let trimmed = code.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("friend_code"));
    }
    if trimmed.len() > MAX_FRIEND_CODE_LENGTH {
        return Err(ValidationError::TooLong("friend_code", MAX_FRIEND_CODE_LENGTH));
    }

    Ok(trimmed.to_string())
}
