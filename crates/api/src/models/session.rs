//! Session-related types.

use serde::Serialize;

use bagrit_core::Email;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "token";

/// Identity attached to a request by the session gate.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    /// Email proven by the session token.
    pub email: Email,
}
