/// Error Handling Module
///
/// One taxonomy for the whole service:
/// 1. Validation failures (bad input shape, names the offending field)
/// 2. Duplicate failures (uniqueness conflicts on account/email)
/// 3. Authentication failures (always opaque to the caller)
/// 4. Not found / conflict / transient store failures
/// 5. HTTP response mapping with structured logging

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::fmt;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Validation errors for input data
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is empty")]
    EmptyField(&'static str),
    #[error("{0} is too short (minimum {1} characters)")]
    TooShort(&'static str, usize),
    #[error("{0} is too long (maximum {1} characters)")]
    TooLong(&'static str, usize),
    #[error("{0} has invalid format")]
    InvalidFormat(&'static str),
    #[error("{0} must not be negative")]
    Negative(&'static str),
    #[error("{0}: {1}")]
    Rejected(&'static str, &'static str),
}

impl ValidationError {
    /// The field this failure is about.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::EmptyField(field)
            | ValidationError::TooShort(field, _)
            | ValidationError::TooLong(field, _)
            | ValidationError::InvalidFormat(field)
            | ValidationError::Negative(field)
            | ValidationError::Rejected(field, _) => field,
        }
    }
}

/// Fields carrying a uniqueness constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Account,
    Email,
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniqueField::Account => write!(f, "account"),
            UniqueField::Email => write!(f, "email"),
        }
    }
}

/// Why a bearer token was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    Expired,
    Malformed,
    BadSignature,
    /// Cryptographically valid but no longer an active session of its owner.
    Revoked,
}

impl fmt::Display for TokenRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenRejection::Expired => write!(f, "expired"),
            TokenRejection::Malformed => write!(f, "malformed"),
            TokenRejection::BadSignature => write!(f, "bad signature"),
            TokenRejection::Revoked => write!(f, "revoked"),
        }
    }
}

/// Authentication errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Missing credentials")]
    MissingCredentials,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Missing authentication token")]
    MissingToken,
    #[error("Invalid token ({0})")]
    InvalidToken(TokenRejection),
}

/// Write conflicts that are not uniqueness violations
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConflictError {
    #[error("Friend code already added")]
    FriendAlreadyAdded,
    #[error("Session token is no longer active")]
    TokenNotFound,
}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

/// Central error type every operation returns
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0} is already registered")]
    Duplicate(UniqueField),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    #[error("Service temporarily unavailable: {0}")]
    Transient(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl AppError {
    /// Status, machine code and caller-facing message.
    ///
    /// Authentication failures never reveal whether the account exists;
    /// token failures only say whether the token expired, is invalid, or
    /// was revoked.
    pub fn classify(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Validation(e) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string()),
            AppError::Duplicate(field) => (
                StatusCode::CONFLICT,
                "DUPLICATE_ENTRY",
                format!("{} is already registered", field),
            ),
            AppError::Auth(e) => match e {
                AuthError::MissingCredentials => (
                    StatusCode::BAD_REQUEST,
                    "MISSING_CREDENTIALS",
                    "Missing credentials".to_string(),
                ),
                AuthError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_CREDENTIALS",
                    "Invalid account or password".to_string(),
                ),
                AuthError::MissingToken => (
                    StatusCode::UNAUTHORIZED,
                    "MISSING_TOKEN",
                    "Missing authentication token".to_string(),
                ),
                AuthError::InvalidToken(TokenRejection::Expired) => (
                    StatusCode::UNAUTHORIZED,
                    "TOKEN_EXPIRED",
                    "Token has expired".to_string(),
                ),
                AuthError::InvalidToken(TokenRejection::Revoked) => (
                    StatusCode::UNAUTHORIZED,
                    "TOKEN_REVOKED",
                    "Token is no longer active".to_string(),
                ),
                AuthError::InvalidToken(_) => (
                    StatusCode::UNAUTHORIZED,
                    "TOKEN_INVALID",
                    "Invalid token".to_string(),
                ),
            },
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, "NOT_FOUND", format!("{} not found", what)),
            AppError::Conflict(e) => {
                let code = match e {
                    ConflictError::FriendAlreadyAdded => "FRIEND_ALREADY_ADDED",
                    ConflictError::TokenNotFound => "TOKEN_NOT_FOUND",
                };
                (StatusCode::CONFLICT, code, e.to_string())
            }
            AppError::Transient(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                "Service temporarily unavailable".to_string(),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        }
    }

    pub fn log_error(&self, request_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(request_id = request_id, field = e.field(), error = %e, "Validation error");
            }
            AppError::Duplicate(field) => {
                tracing::warn!(request_id = request_id, field = %field, "Duplicate entry attempt");
            }
            AppError::Auth(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Authentication rejected");
            }
            AppError::NotFound(_) | AppError::Conflict(_) => {
                tracing::info!(request_id = request_id, error = %self, "Request refused");
            }
            AppError::Transient(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Store unavailable");
            }
            AppError::Internal(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Internal error");
            }
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&request_id);

        let (status, code, message) = self.classify();
        HttpResponse::build(status).json(ErrorResponse::new(
            request_id,
            message,
            code.to_string(),
            status.as_u16(),
        ))
    }

    fn status_code(&self) -> StatusCode {
        self.classify().0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::EmptyField("email");
        assert_eq!(err.to_string(), "email is empty");
        assert_eq!(err.field(), "email");
    }

    #[test]
    fn test_validation_converts_into_app_error() {
        let app_err: AppError = ValidationError::TooShort("password", 6).into();
        match app_err {
            AppError::Validation(ValidationError::TooShort("password", 6)) => (),
            other => panic!("Expected Validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_names_the_field() {
        let (status, code, message) = AppError::Duplicate(UniqueField::Account).classify();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(code, "DUPLICATE_ENTRY");
        assert!(message.starts_with("account"));
    }

    #[test]
    fn test_token_rejections_share_status_but_not_code() {
        let expired = AppError::Auth(AuthError::InvalidToken(TokenRejection::Expired)).classify();
        let malformed = AppError::Auth(AuthError::InvalidToken(TokenRejection::Malformed)).classify();
        let revoked = AppError::Auth(AuthError::InvalidToken(TokenRejection::Revoked)).classify();

        assert_eq!(expired.0, StatusCode::UNAUTHORIZED);
        assert_eq!(malformed.0, StatusCode::UNAUTHORIZED);
        assert_eq!(revoked.0, StatusCode::UNAUTHORIZED);
        assert_eq!(expired.1, "TOKEN_EXPIRED");
        assert_eq!(malformed.1, "TOKEN_INVALID");
        assert_eq!(revoked.1, "TOKEN_REVOKED");
    }

    #[test]
    fn test_missing_credentials_is_bad_request() {
        assert_eq!(
            AppError::Auth(AuthError::MissingCredentials).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_error_response_creation() {
        let response = ErrorResponse::new(
            "test-123".to_string(),
            "Test error".to_string(),
            "TEST_ERROR".to_string(),
            400,
        );

        assert_eq!(response.error_id, "test-123");
        assert_eq!(response.code, "TEST_ERROR");
        assert_eq!(response.status, 400);
    }
}
