//! Signed, time-limited tokens.
//!
//! One HS256 secret signs three kinds of token, told apart by the `purpose`
//! claim: login sessions (1 hour), email verification links (1 day) and
//! password reset links (1 day). Nothing is stored server-side; a token is
//! valid exactly while its signature checks out and `exp` is in the future.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bagrit_core::Email;

/// What a token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Session,
    EmailVerification,
    PasswordReset,
}

impl TokenPurpose {
    /// Lifetime of a freshly issued token.
    #[must_use]
    pub fn ttl(self) -> Duration {
        match self {
            Self::Session => Duration::hours(1),
            Self::EmailVerification | Self::PasswordReset => Duration::days(1),
        }
    }
}

/// Token verification and signing failures.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Signature is fine but `exp` has passed.
    #[error("token expired")]
    Expired,

    /// Malformed, tampered, or issued for another purpose.
    #[error("invalid token")]
    Invalid,

    #[error("token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    email: String,
    purpose: TokenPurpose,
    iat: i64,
    exp: i64,
}

/// Issues and verifies tokens with a shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer").finish_non_exhaustive()
    }
}

impl TokenIssuer {
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let key = secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            validation,
        }
    }

    /// Issue a token for `email` that lives for the purpose's TTL.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue(&self, email: &Email, purpose: TokenPurpose) -> Result<String, TokenError> {
        self.issue_at(email, purpose, Utc::now())
    }

    /// Issue a token as if it were `issued_at`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue_at(
        &self,
        email: &Email,
        purpose: TokenPurpose,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            email: email.as_str().to_owned(),
            purpose,
            iat: issued_at.timestamp(),
            exp: (issued_at + purpose.ttl()).timestamp(),
        };
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding,
        )?)
    }

    /// Check a token and return the email it proves.
    ///
    /// # Errors
    ///
    /// `Expired` when past `exp`; `Invalid` for anything else, including a
    /// valid token minted for a different purpose.
    pub fn verify(&self, token: &str, expected: TokenPurpose) -> Result<Email, TokenError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })?;

        if data.claims.purpose != expected {
            return Err(TokenError::Invalid);
        }

        Email::parse(&data.claims.email).map_err(|_| TokenError::Invalid)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(&SecretString::from("kQ9#vR2!mZ7@pL4$wX1^tN8&yB5*cD3%"))
    }

    fn email() -> Email {
        Email::parse("a@b.com").unwrap()
    }

    /// Replace the first character of the signature segment.
    fn tamper(token: &str) -> String {
        let (head, sig) = token.rsplit_once('.').unwrap();
        let replacement = if sig.starts_with('A') { "B" } else { "A" };
        format!("{head}.{replacement}{}", &sig[1..])
    }

    #[test]
    fn test_round_trip() {
        let issuer = issuer();
        let token = issuer.issue(&email(), TokenPurpose::Session).unwrap();
        assert_eq!(issuer.verify(&token, TokenPurpose::Session).unwrap(), email());
    }

    #[test]
    fn test_expired_session() {
        let issuer = issuer();
        let two_hours_ago = Utc::now() - Duration::hours(2);
        let token = issuer
            .issue_at(&email(), TokenPurpose::Session, two_hours_ago)
            .unwrap();

        assert!(matches!(
            issuer.verify(&token, TokenPurpose::Session),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_verification_token_lasts_a_day() {
        let issuer = issuer();
        let token = issuer
            .issue_at(
                &email(),
                TokenPurpose::EmailVerification,
                Utc::now() - Duration::hours(23),
            )
            .unwrap();
        assert!(issuer.verify(&token, TokenPurpose::EmailVerification).is_ok());
    }

    #[test]
    fn test_tampered_signature_is_invalid() {
        let issuer = issuer();
        let token = issuer.issue(&email(), TokenPurpose::Session).unwrap();

        assert!(matches!(
            issuer.verify(&tamper(&token), TokenPurpose::Session),
            Err(TokenError::Invalid)
        ));
        assert!(matches!(
            issuer.verify("not-a-token", TokenPurpose::Session),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_other_secret_is_invalid() {
        let other = TokenIssuer::new(&SecretString::from("Zp4!Lq8@Wm2#Xr6$Tn0%Yb3^Vc7&Hd1*"));
        let token = other.issue(&email(), TokenPurpose::Session).unwrap();
        assert!(matches!(
            issuer().verify(&token, TokenPurpose::Session),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_purpose_mismatch_is_invalid() {
        let issuer = issuer();
        let token = issuer
            .issue(&email(), TokenPurpose::EmailVerification)
            .unwrap();

        assert!(matches!(
            issuer.verify(&token, TokenPurpose::Session),
            Err(TokenError::Invalid)
        ));
    }
}
