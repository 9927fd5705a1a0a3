//! Authentication service.
//!
//! Password signup and signin, email verification and password reset.
//! Token issuing and mail delivery are left to the caller so this module
//! only deals with credentials.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Deserialize;

use bagrit_core::Email;

use crate::db::{RepositoryError, UserStore};
use crate::models::user::{NewUser, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Signup form as posted by the frontend.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub c_password: Option<String>,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: &'a dyn UserStore,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a dyn UserStore) -> Self {
        Self { users }
    }

    /// Register a new, unverified user.
    ///
    /// Rules are checked in order and the first failure is reported: all
    /// fields present, email shape, password length, confirmation match,
    /// email not taken.
    ///
    /// # Errors
    ///
    /// Returns the `AuthError` naming the first rule violated.
    pub async fn register(&self, input: SignupInput) -> Result<User, AuthError> {
        let (Some(username), Some(email), Some(password), Some(c_password)) = (
            non_blank(input.username),
            non_blank(input.email),
            non_blank(input.password),
            non_blank(input.c_password),
        ) else {
            return Err(AuthError::MissingFields);
        };

        let email = Email::parse(&email).map_err(|_| AuthError::InvalidEmail)?;
        validate_password(&password)?;
        if password != c_password {
            return Err(AuthError::PasswordMismatch);
        }

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let password_hash = hash_password(&password)?;

        self.users
            .create(NewUser {
                email,
                username: username.trim().to_owned(),
                password_hash,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }

    /// Login with email and password.
    ///
    /// Unverified accounts are turned away before the password is checked.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong
    /// and `AuthError::EmailNotVerified` for unconfirmed accounts.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.verified {
            return Err(AuthError::EmailNotVerified);
        }

        verify_password(password, &user.password_hash)?;

        Ok(user)
    }

    /// Mark the account verified.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the account no longer exists.
    pub async fn confirm_email(&self, email: &Email) -> Result<(), AuthError> {
        if self.users.mark_verified(email).await? {
            Ok(())
        } else {
            Err(AuthError::UserNotFound)
        }
    }

    /// Fetch a user that must exist.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` for unknown or malformed emails.
    pub async fn get_user(&self, email: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::UserNotFound)?;
        self.users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Overwrite the stored password for `email`.
    ///
    /// Signup's length rule does not apply here; any non-empty password is
    /// hashed as given.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` for unknown emails.
    pub async fn reset_password(&self, email: &str, new_password: &str) -> Result<(), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::UserNotFound)?;

        let password_hash = hash_password(new_password)?;
        if self.users.set_password_hash(&email, &password_hash).await? {
            Ok(())
        } else {
            Err(AuthError::UserNotFound)
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword);
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryUserStore;

    fn signup(email: &str, password: &str, confirm: &str) -> SignupInput {
        SignupInput {
            username: Some("asha".into()),
            email: Some(email.into()),
            password: Some(password.into()),
            c_password: Some(confirm.into()),
        }
    }

    #[test]
    fn test_hash_is_salted_and_verifies() {
        let a = hash_password("correct horse").unwrap();
        let b = hash_password("correct horse").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &a).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &a),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_register_rule_order() {
        let store = MemoryUserStore::new();
        let auth = AuthService::new(&store);

        let mut missing = signup("a@b.com", "password1", "password1");
        missing.username = Some("  ".into());
        assert!(matches!(auth.register(missing).await, Err(AuthError::MissingFields)));
        assert!(matches!(
            auth.register(signup("ab.com", "short", "other")).await,
            Err(AuthError::InvalidEmail)
        ));
        assert!(matches!(
            auth.register(signup("a@b.com", "short", "other")).await,
            Err(AuthError::WeakPassword)
        ));
        assert!(matches!(
            auth.register(signup("a@b.com", "password1", "password2")).await,
            Err(AuthError::PasswordMismatch)
        ));

        let user = auth
            .register(signup("a@b.com", "password1", "password1"))
            .await
            .unwrap();
        assert!(!user.verified);
        assert_ne!(user.password_hash, "password1");

        assert!(matches!(
            auth.register(signup("a@b.com", "password1", "password1")).await,
            Err(AuthError::UserAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn test_login_requires_verification() {
        let store = MemoryUserStore::new();
        let auth = AuthService::new(&store);
        auth.register(signup("a@b.com", "password1", "password1"))
            .await
            .unwrap();

        assert!(matches!(
            auth.login("a@b.com", "password1").await,
            Err(AuthError::EmailNotVerified)
        ));
        assert!(matches!(
            auth.login("a@b.com", "wrong-pass").await,
            Err(AuthError::EmailNotVerified)
        ));

        auth.confirm_email(&Email::parse("a@b.com").unwrap())
            .await
            .unwrap();
        assert!(auth.login("a@b.com", "password1").await.is_ok());
        assert!(matches!(
            auth.login("a@b.com", "wrong-pass").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody@b.com", "password1").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_reset_password_replaces_hash() {
        let store = MemoryUserStore::new();
        let auth = AuthService::new(&store);
        auth.register(signup("a@b.com", "password1", "password1"))
            .await
            .unwrap();
        auth.confirm_email(&Email::parse("a@b.com").unwrap())
            .await
            .unwrap();

        auth.reset_password("a@b.com", "new-password").await.unwrap();
        assert!(auth.login("a@b.com", "new-password").await.is_ok());
        assert!(auth.login("a@b.com", "password1").await.is_err());

        assert!(matches!(
            auth.reset_password("ghost@b.com", "new-password").await,
            Err(AuthError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn test_reset_password_accepts_short_password() {
        let store = MemoryUserStore::new();
        let auth = AuthService::new(&store);
        auth.register(signup("a@b.com", "password1", "password1"))
            .await
            .unwrap();
        auth.confirm_email(&Email::parse("a@b.com").unwrap())
            .await
            .unwrap();

        auth.reset_password("a@b.com", "short").await.unwrap();
        assert!(auth.login("a@b.com", "short").await.is_ok());
    }
}
