//! Authentication error types.
//!
//! Display strings are the messages clients see.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A signup or reset field was absent or blank.
    #[error("All fields are required.")]
    MissingFields,

    /// Invalid email format.
    #[error("Enter a correct email address.")]
    InvalidEmail,

    /// Password shorter than the minimum.
    #[error("Password should contain at least 8 characters.")]
    WeakPassword,

    /// Password and confirmation differ.
    #[error("Password and Confirm password should be the same.")]
    PasswordMismatch,

    /// User already exists.
    #[error("User already exists.")]
    UserAlreadyExists,

    /// Invalid credentials (wrong password or user not found).
    #[error("Incorrect email or password")]
    InvalidCredentials,

    /// Correct credentials, but the email was never confirmed.
    #[error("Please verify your email first.")]
    EmailNotVerified,

    /// User not found.
    #[error("User not found.")]
    UserNotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
