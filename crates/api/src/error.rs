//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. JSON handlers return
//! `Result<T, AppError>`; the few plaintext endpoints wrap the same error in
//! [`PlainError`] so status codes stay identical.

use axum::{
    Json,
    extract::{FromRequest, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::email::MailError;
use crate::services::stripe::StripeError;
use crate::services::token::TokenError;

/// Message shown for any unexpected server-side failure.
const INTERNAL_MESSAGE: &str = "Internal server error";

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or missing input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// No usable credentials were presented.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A session token was valid once but has expired.
    #[error("Session expired")]
    SessionExpired,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Payment or email provider failed; the provider message is surfaced.
    #[error("External provider error: {0}")]
    ExternalProvider(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) | Self::SessionExpired => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ExternalProvider(_) | Self::Database(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Text safe to show to the client.
    ///
    /// Database and internal details are never exposed.
    #[must_use]
    pub fn public_message(&self) -> &str {
        match self {
            Self::Validation(msg)
            | Self::Unauthorized(msg)
            | Self::NotFound(msg)
            | Self::ExternalProvider(msg) => msg,
            Self::SessionExpired => "Session expired. Please log in again.",
            Self::Database(_) | Self::Internal(_) => INTERNAL_MESSAGE,
        }
    }

    /// Report server errors to Sentry and the log.
    fn capture(&self) {
        if self.status().is_server_error() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.capture();
        let body = ErrorBody {
            message: self.public_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Plaintext rendering of an [`AppError`], for endpoints whose clients read
/// a bare string body (email links, password forms, webhook senders).
#[derive(Debug)]
pub struct PlainError(pub AppError);

impl From<AppError> for PlainError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

macro_rules! plain_error_from {
    ($($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for PlainError {
                fn from(err: $source) -> Self {
                    Self(err.into())
                }
            }
        )+
    };
}

plain_error_from!(RepositoryError, AuthError, MailError, TokenError, JsonRejection);

impl IntoResponse for PlainError {
    fn into_response(self) -> Response {
        self.0.capture();
        (self.0.status(), self.0.public_message().to_owned()).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingFields
            | AuthError::InvalidEmail
            | AuthError::WeakPassword
            | AuthError::PasswordMismatch
            | AuthError::UserAlreadyExists => Self::Validation(err.to_string()),
            AuthError::InvalidCredentials | AuthError::EmailNotVerified => {
                Self::Unauthorized(err.to_string())
            }
            AuthError::UserNotFound => Self::NotFound(err.to_string()),
            AuthError::Repository(inner) => Self::Database(inner),
            AuthError::PasswordHash => Self::Internal(err.to_string()),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Self::SessionExpired,
            TokenError::Invalid => Self::Unauthorized("Unauthorized. Invalid token.".to_owned()),
            TokenError::Signing(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<StripeError> for AppError {
    fn from(err: StripeError) -> Self {
        match err {
            StripeError::InvalidLineItem(msg) => Self::Validation(msg),
            StripeError::Api { message, .. } => Self::ExternalProvider(message),
            StripeError::Http(e) => Self::ExternalProvider(e.to_string()),
            StripeError::InvalidSignature(_) | StripeError::InvalidPayload(_) => {
                Self::Validation(format!("Webhook Error: {err}"))
            }
        }
    }
}

impl From<MailError> for AppError {
    fn from(err: MailError) -> Self {
        Self::ExternalProvider(err.to_string())
    }
}

/// JSON body extractor whose rejections render as `{"message": ...}`.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the authenticated email.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(email: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            email: Some(email.to_owned()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Checkout session created", Some(&[("session_id", "cs_123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::Validation("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Unauthorized("x".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(get_status(AppError::SessionExpired), StatusCode::UNAUTHORIZED);
        assert_eq!(
            get_status(AppError::NotFound("x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::ExternalProvider("card declined".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Internal("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_json_body_uses_message_key() {
        let response = AppError::Validation("All fields are required.".into()).into_response();
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body, serde_json::json!({"message": "All fields are required."}));
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let response = AppError::Internal("pool exhausted".into()).into_response();
        let text = body_text(response).await;
        assert!(text.contains(INTERNAL_MESSAGE));
        assert!(!text.contains("pool exhausted"));
    }

    #[tokio::test]
    async fn test_provider_message_surfaced() {
        let response = AppError::ExternalProvider("Your card was declined.".into()).into_response();
        assert!(body_text(response).await.contains("Your card was declined."));
    }

    #[tokio::test]
    async fn test_plain_error_is_text() {
        let response = PlainError(AppError::Validation("Invalid or expired token.".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Invalid or expired token.");
    }

    #[test]
    fn test_auth_error_mapping() {
        assert_eq!(
            AppError::from(AuthError::UserAlreadyExists).public_message(),
            "User already exists."
        );
        assert_eq!(
            AppError::from(AuthError::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(AuthError::UserNotFound).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_token_error_mapping() {
        assert_eq!(
            AppError::from(TokenError::Expired).public_message(),
            "Session expired. Please log in again."
        );
        assert_eq!(
            AppError::from(TokenError::Invalid).public_message(),
            "Unauthorized. Invalid token."
        );
    }
}
