//! Integration tests for Bagrit.
//!
//! These run against a live API server and database and are `#[ignore]`d
//! by default.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and apply migrations
//! cargo run -p bagrit-cli -- migrate
//!
//! # Start the API with the same secrets the tests use
//! cargo run -p bagrit-api
//!
//! # Run integration tests
//! cargo test -p bagrit-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `BAGRIT_BASE_URL` - API base URL (default: `http://localhost:5001`)
//! - `BAGRIT_TOKEN_SECRET` - Same secret as the server; used to mint
//!   verification tokens instead of reading the mailbox
//! - `STRIPE_WEBHOOK_SECRET` - Same secret as the server; used to sign
//!   webhook deliveries

use reqwest::Client;
use secrecy::SecretString;

use bagrit_api::services::token::{TokenIssuer, TokenPurpose};
use bagrit_core::Email;

pub const PASSWORD: &str = "integration-pass";

/// Base URL for the API (configurable via environment).
#[must_use]
pub fn base_url() -> String {
    std::env::var("BAGRIT_BASE_URL").unwrap_or_else(|_| "http://localhost:5001".to_string())
}

/// HTTP client that keeps the session cookie between requests.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// A fresh address so reruns never collide.
#[must_use]
pub fn unique_email() -> String {
    format!("it-{}@example.com", uuid::Uuid::new_v4().simple())
}

/// Read a secret the server shares with the tests.
///
/// # Panics
///
/// Panics if the variable is not set.
#[must_use]
pub fn shared_secret(var: &str) -> SecretString {
    std::env::var(var)
        .map(SecretString::from)
        .unwrap_or_else(|_| panic!("{var} must match the server's value"))
}

/// Mint the token the verification email would have carried.
///
/// # Panics
///
/// Panics if `BAGRIT_TOKEN_SECRET` is unset or `email` is malformed.
#[must_use]
pub fn verification_token(email: &str) -> String {
    let issuer = TokenIssuer::new(&shared_secret("BAGRIT_TOKEN_SECRET"));
    let email = Email::parse(email).expect("valid email");
    issuer
        .issue(&email, TokenPurpose::EmailVerification)
        .expect("token signing")
}

/// A signed-in user on the live server.
#[derive(Debug)]
pub struct Session {
    pub client: Client,
    pub email: String,
    /// Session token, sent as a bearer token since the cookie is `Secure`.
    pub token: String,
}

impl Session {
    /// Sign up, verify and sign in a fresh user.
    ///
    /// # Panics
    ///
    /// Panics if any step of the flow fails.
    pub async fn start() -> Self {
        let client = client();
        let base = base_url();
        let email = unique_email();

        let resp = client
            .post(format!("{base}/signup"))
            .json(&serde_json::json!({
                "username": "integration",
                "email": email,
                "password": PASSWORD,
                "cPassword": PASSWORD,
            }))
            .send()
            .await
            .expect("signup request");
        assert_eq!(resp.status(), 201, "signup failed");

        // JWTs are URL-safe, so the token needs no escaping.
        let resp = client
            .get(format!(
                "{base}/verify-email?token={}",
                verification_token(&email)
            ))
            .send()
            .await
            .expect("verify request");
        assert_eq!(resp.status(), 200, "verification failed");

        let resp = client
            .post(format!("{base}/signin"))
            .json(&serde_json::json!({"email": email, "password": PASSWORD}))
            .send()
            .await
            .expect("signin request");
        assert_eq!(resp.status(), 200, "signin failed");

        let token = resp
            .cookies()
            .find(|c| c.name() == "token")
            .map(|c| c.value().to_owned())
            .expect("No session cookie");

        Self {
            client,
            email,
            token,
        }
    }

    /// `GET {base}{path}` with the session token.
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{path}", base_url()))
            .bearer_auth(&self.token)
    }

    /// `POST {base}{path}` with the session token.
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{path}", base_url()))
            .bearer_auth(&self.token)
    }
}
