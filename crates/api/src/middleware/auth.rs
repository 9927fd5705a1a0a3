//! Session gate and session cookie helpers.
//!
//! Protected handlers take a [`SessionUser`]. The token is read from the
//! `token` cookie first and from `Authorization: Bearer` second. A token
//! that fails verification gets the cookie cleared before the 401 goes out.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use tower_cookies::{
    Cookie, Cookies,
    cookie::{SameSite, time::Duration},
};
use tracing::Span;

use crate::error::{AppError, set_sentry_user};
use crate::models::{CurrentUser, SESSION_COOKIE};
use crate::services::token::TokenPurpose;
use crate::state::AppState;

const MISSING_TOKEN: &str = "Unauthorized. Please log in.";

/// Extractor that requires a valid session token.
///
/// # Example
///
/// ```rust,ignore
/// async fn profile(SessionUser(user): SessionUser) -> String {
///     user.email.to_string()
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SessionUser(pub CurrentUser);

impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookies = Cookies::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::Internal(msg.to_owned()))?;

        let token = cookies
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_owned())
            .filter(|v| !v.is_empty())
            .or_else(|| bearer_token(&parts.headers));

        let Some(token) = token else {
            return Err(AppError::Unauthorized(MISSING_TOKEN.to_owned()));
        };

        match state.tokens().verify(&token, TokenPurpose::Session) {
            Ok(email) => {
                Span::current().record("user_email", email.as_str());
                set_sentry_user(email.as_str());
                Ok(Self(CurrentUser { email }))
            }
            Err(err) => {
                tracing::debug!(error = %err, "Rejected session token");
                clear_session_cookie(&cookies);
                Err(err.into())
            }
        }
    }
}

/// Token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_owned())
}

fn session_cookie(value: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .build()
}

/// Set the session cookie. No `Max-Age`: the token's own expiry governs.
pub fn set_session_cookie(cookies: &Cookies, token: String) {
    cookies.add(session_cookie(token));
}

/// Tell the browser to drop the session cookie.
pub fn clear_session_cookie(cookies: &Cookies) {
    let mut cookie = session_cookie(String::new());
    cookie.set_max_age(Duration::ZERO);
    cookies.add(cookie);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Some("abc.def".into()));
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc".into()));
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("t".into());
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::None));
        assert_eq!(cookie.path(), Some("/"));
        assert!(cookie.max_age().is_none());
    }
}
