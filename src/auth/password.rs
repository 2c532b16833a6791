/// Password Hashing and Verification
///
/// One-way bcrypt hashing with a per-call random salt embedded in the output.
/// Length rules for plaintext passwords live in `validators` and are applied
/// by the store before it asks for a hash.

use bcrypt::{hash, verify};

use crate::error::AppError;

pub const MIN_COST: u32 = 4;
pub const MAX_COST: u32 = 31;

/// Bcrypt hasher with a configured work factor
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// # Errors
    /// Returns error if `cost` is outside bcrypt's supported range (4..=31)
    pub fn new(cost: u32) -> Result<Self, AppError> {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(AppError::Internal(format!("Unsupported bcrypt cost {}", cost)));
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a plaintext password
    ///
    /// # Errors
    /// Only fails if bcrypt itself fails, which cannot happen for a cost
    /// accepted by [`PasswordHasher::new`]
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        hash(password, self.cost)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }
}

/// Verify a password against a stored hash.
///
/// A malformed stored hash verifies as `false`; this never errors.
pub fn verify_password(password: &str, hashed: &str) -> bool {
    match verify(password, hashed) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!(error = %e, "Stored credential hash could not be parsed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(MIN_COST).expect("min cost is valid")
    }

    #[test]
    fn test_hash_password() {
        let password = "secret1";
        let hashed = hasher().hash(password).expect("Failed to hash password");

        assert_ne!(password, hashed);
        assert!(hashed.starts_with("$2"));
    }

    #[test]
    fn test_salt_differs_per_call() {
        let first = hasher().hash("secret1").unwrap();
        let second = hasher().hash("secret1").unwrap();

        assert_ne!(first, second);
        assert!(verify_password("secret1", &first));
        assert!(verify_password("secret1", &second));
    }

    #[test]
    fn test_verify_password() {
        let hashed = hasher().hash("secret1").unwrap();
        assert!(verify_password("secret1", &hashed));
    }

    #[test]
    fn test_verify_wrong_password() {
        let hashed = hasher().hash("secret1").unwrap();
        assert!(!verify_password("secret2", &hashed));
        assert!(!verify_password("", &hashed));
    }

    #[test]
    fn test_malformed_hash_is_false() {
        assert!(!verify_password("secret1", "not-a-bcrypt-hash"));
        assert!(!verify_password("secret1", ""));
    }

    #[test]
    fn test_hash_accepts_any_input() {
        assert!(hasher().hash("").is_ok());
        assert!(hasher().hash(&"é".repeat(100)).is_ok());
    }

    #[test]
    fn test_rejects_unsupported_cost() {
        assert!(PasswordHasher::new(3).is_err());
        assert!(PasswordHasher::new(32).is_err());
        assert_eq!(PasswordHasher::new(10).unwrap().cost(), 10);
    }
}
