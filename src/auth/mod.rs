/// Authentication module
///
/// Password hashing, session token signing, the credential and bearer
/// authentication strategies, and the session operations built on them.

mod claims;
mod jwt;
mod password;
mod session;
mod strategies;

pub use claims::Claims;
pub use jwt::{TokenCodec, TokenError};
pub use password::{verify_password, PasswordHasher, MAX_COST, MIN_COST};
pub use session::{extend, login, logout, LoginOutcome};
pub use strategies::{authenticate_bearer, authenticate_credentials, bearer_token, AuthenticatedSession};
