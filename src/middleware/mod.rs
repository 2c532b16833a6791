/// Middleware module
///
/// Request authentication for protected routes.

mod bearer_auth;

pub use bearer_auth::BearerAuth;
