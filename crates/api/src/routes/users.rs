//! Account route handlers: signup, signin, profile, email verification,
//! password reset and logout.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;
use tracing::instrument;

use bagrit_core::Email;

use super::{Message, message};
use crate::error::{ApiJson, AppError, PlainError, Result, clear_sentry_user};
use crate::middleware::{SessionUser, clear_session_cookie, set_session_cookie};
use crate::models::UserProfile;
use crate::services::auth::{AuthError, AuthService, SignupInput};
use crate::services::email::{reset_link, verification_link};
use crate::services::token::TokenPurpose;
use crate::state::AppState;

const INVALID_LINK: &str = "Invalid or expired token.";

#[derive(Debug, Deserialize)]
pub struct SigninInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SigninResponse {
    pub message: &'static str,
    pub email: Email,
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordInput {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordInput {
    pub email: Option<String>,
    pub new_password: Option<String>,
}

/// Register an account and email a verification link.
#[instrument(skip(state, input))]
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<SignupInput>,
) -> Result<(StatusCode, Json<Message>)> {
    let user = AuthService::new(state.users()).register(input).await?;

    let token = state
        .tokens()
        .issue(&user.email, TokenPurpose::EmailVerification)?;
    let link = verification_link(&state.config().public_url, &token)?;
    state.mailer().send_verification(&user.email, &link).await?;

    tracing::info!(user_id = %user.id, "User registered");
    Ok((
        StatusCode::CREATED,
        message("User created successfully. Please verify your email."),
    ))
}

/// Check credentials and set the session cookie.
#[instrument(skip(state, cookies, input))]
pub async fn signin(
    State(state): State<AppState>,
    cookies: Cookies,
    ApiJson(input): ApiJson<SigninInput>,
) -> Result<Json<SigninResponse>> {
    let user = AuthService::new(state.users())
        .login(&input.email, &input.password)
        .await?;

    let token = state.tokens().issue(&user.email, TokenPurpose::Session)?;
    set_session_cookie(&cookies, token);

    tracing::info!(user_id = %user.id, "User signed in");
    Ok(Json(SigninResponse {
        message: "Login successful",
        email: user.email,
    }))
}

/// Profile and purchase history of the signed-in user.
#[instrument(skip_all)]
pub async fn profile(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
) -> Result<Json<UserProfile>> {
    let user = state
        .users()
        .find_by_email(&user.email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_owned()))?;

    Ok(Json(UserProfile::from(&user)))
}

/// Confirm an email address from the link in the verification mail.
#[instrument(skip(state, query))]
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> std::result::Result<&'static str, PlainError> {
    let email = query
        .token
        .as_deref()
        .and_then(|token| {
            state
                .tokens()
                .verify(token, TokenPurpose::EmailVerification)
                .ok()
        })
        .ok_or_else(|| PlainError(AppError::Validation(INVALID_LINK.to_owned())))?;

    AuthService::new(state.users()).confirm_email(&email).await?;

    tracing::info!("Email verified");
    Ok("Email successfully verified!")
}

/// Email a password reset link.
#[instrument(skip(state, body))]
pub async fn forgot_password(
    State(state): State<AppState>,
    body: std::result::Result<ApiJson<ForgotPasswordInput>, AppError>,
) -> std::result::Result<(StatusCode, &'static str), PlainError> {
    let ApiJson(input) = body?;
    let email = input
        .email
        .filter(|e| !e.trim().is_empty())
        .ok_or(AuthError::MissingFields)?;

    let user = AuthService::new(state.users()).get_user(&email).await?;

    let token = state.tokens().issue(&user.email, TokenPurpose::PasswordReset)?;
    let link = reset_link(&state.config().frontend_url, &token)?;
    state.mailer().send_password_reset(&user.email, &link).await?;

    tracing::info!(user_id = %user.id, "Password reset email sent");
    Ok((StatusCode::CREATED, "Password reset email sent."))
}

/// Overwrite the password for an email.
///
/// Possession of the mailed reset token is not checked.
#[instrument(skip(state, body))]
pub async fn reset_password(
    State(state): State<AppState>,
    body: std::result::Result<ApiJson<ResetPasswordInput>, AppError>,
) -> std::result::Result<&'static str, PlainError> {
    let ApiJson(input) = body?;
    let (Some(email), Some(new_password)) = (
        input.email.filter(|e| !e.trim().is_empty()),
        input.new_password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AuthError::MissingFields.into());
    };

    AuthService::new(state.users())
        .reset_password(&email, &new_password)
        .await?;

    tracing::info!("Password reset");
    Ok("Password successfully updated.")
}

/// Clear the session cookie.
pub async fn logout(cookies: Cookies) -> Json<Message> {
    clear_session_cookie(&cookies);
    clear_sentry_user();
    message("Logged out successfully")
}
