//! Common utilities for the in-process HTTP tests.
//!
//! The router runs against in-memory stores, a mailer that captures links
//! instead of sending them, and a payment provider that records requests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum_test::TestServer;
use cookie::Cookie;
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;

use bagrit_api::config::{ApiConfig, StripeConfig};
use bagrit_api::db::{MemoryProductStore, MemoryUserStore};
use bagrit_api::models::{NewProduct, Product};
use bagrit_api::services::email::{MailError, Mailer};
use bagrit_api::services::stripe::{
    CheckoutRequest, CheckoutSession, PaymentProvider, StripeError,
};
use bagrit_api::services::token::TokenIssuer;
use bagrit_api::state::AppState;
use bagrit_core::{CurrencyCode, Email};

pub const TOKEN_SECRET: &str = "t3st-k9Qz2Lx7Vb4Nw8Rt1Yp6Hs3Jd5Fg0Mc";
pub const WEBHOOK_SECRET: &str = "whsec_4c8e1f0b9a7d";
pub const FRONTEND_URL: &str = "http://shop.test";
pub const PUBLIC_URL: &str = "http://api.test";
pub const SESSION_ID: &str = "cs_test_1";
pub const PASSWORD: &str = "correct-horse";
pub const DECLINED: &str = "Your card was declined.";

pub fn test_config() -> ApiConfig {
    ApiConfig {
        database_url: SecretString::from("postgres://unused"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 5001,
        public_url: PUBLIC_URL.to_owned(),
        frontend_url: FRONTEND_URL.to_owned(),
        allowed_origins: vec![FRONTEND_URL.to_owned()],
        token_secret: SecretString::from(TOKEN_SECRET),
        stripe: StripeConfig {
            secret_key: SecretString::from("sk_test_unused"),
            webhook_secret: SecretString::from(WEBHOOK_SECRET),
            currency: CurrencyCode::INR,
            allowed_countries: vec!["IN".to_owned()],
            api_base: "http://stripe.invalid".to_owned(),
        },
        smtp: None,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// Which template a captured mail would have used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailKind {
    Verification,
    PasswordReset,
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub kind: MailKind,
    pub to: String,
    pub link: Url,
}

/// Mailer that keeps every message in memory.
///
/// After [`CapturingMailer::reject_all`] every send fails the way a relay
/// refusing the recipient would.
#[derive(Debug, Default, Clone)]
pub struct CapturingMailer {
    pub sent: Arc<Mutex<Vec<SentMail>>>,
    rejecting: Arc<AtomicBool>,
}

impl CapturingMailer {
    pub fn reject_all(&self) {
        self.rejecting.store(true, Ordering::SeqCst);
    }

    /// Most recent link of `kind` sent to `email`.
    pub fn last_link(&self, email: &str, kind: MailKind) -> Option<Url> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|m| m.to == email && m.kind == kind)
            .map(|m| m.link.clone())
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    fn push(&self, kind: MailKind, to: &Email, link: &Url) -> Result<(), MailError> {
        if self.rejecting.load(Ordering::SeqCst) {
            return Err(MailError::InvalidAddress(to.to_string()));
        }
        self.sent.lock().unwrap().push(SentMail {
            kind,
            to: to.as_str().to_owned(),
            link: link.clone(),
        });
        Ok(())
    }
}

#[async_trait]
impl Mailer for CapturingMailer {
    async fn send_verification(&self, to: &Email, link: &Url) -> Result<(), MailError> {
        self.push(MailKind::Verification, to, link)
    }

    async fn send_password_reset(&self, to: &Email, link: &Url) -> Result<(), MailError> {
        self.push(MailKind::PasswordReset, to, link)
    }
}

/// Payment provider that records requests and hands back a fixed session,
/// or a card decline after [`RecordingProvider::decline_all`].
#[derive(Debug, Default, Clone)]
pub struct RecordingProvider {
    pub requests: Arc<Mutex<Vec<CheckoutRequest>>>,
    declining: Arc<AtomicBool>,
}

impl RecordingProvider {
    pub fn decline_all(&self) {
        self.declining.store(true, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<CheckoutRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProvider for RecordingProvider {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, StripeError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.declining.load(Ordering::SeqCst) {
            return Err(StripeError::Api {
                status: 402,
                message: DECLINED.to_owned(),
            });
        }
        Ok(CheckoutSession {
            id: SESSION_ID.to_owned(),
            url: Some(format!("https://checkout.stripe.test/{SESSION_ID}")),
        })
    }
}

/// Router plus handles on every collaborator.
pub struct TestApp {
    pub server: TestServer,
    pub users: Arc<MemoryUserStore>,
    pub products: Arc<MemoryProductStore>,
    pub mailer: CapturingMailer,
    pub payments: RecordingProvider,
    pub tokens: TokenIssuer,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_products(Vec::new())
    }

    pub fn with_products(products: Vec<Product>) -> Self {
        let config = test_config();
        let tokens = TokenIssuer::new(&config.token_secret);
        let users = Arc::new(MemoryUserStore::new());
        let products = Arc::new(MemoryProductStore::with_products(products));
        let mailer = CapturingMailer::default();
        let payments = RecordingProvider::default();

        let state = AppState::new(
            config,
            users.clone(),
            products.clone(),
            Arc::new(mailer.clone()),
            Arc::new(payments.clone()),
        );
        let server = TestServer::new(bagrit_api::app(state)).expect("Failed to create test server");

        Self {
            server,
            users,
            products,
            mailer,
            payments,
            tokens,
        }
    }

    /// Post a valid signup form.
    pub async fn signup(&self, email: &str) -> axum_test::TestResponse {
        self.server
            .post("/signup")
            .json(&signup_form(email))
            .await
    }

    /// Follow the captured verification link.
    pub async fn verify(&self, email: &str) {
        let link = self
            .mailer
            .last_link(email, MailKind::Verification)
            .expect("No verification email sent");
        let token = link_token(&link).expect("Link has no token");
        let response = self
            .server
            .get("/verify-email")
            .add_query_param("token", token)
            .await;
        assert_eq!(response.status_code(), 200, "{}", response.text());
    }

    pub async fn signin(&self, email: &str, password: &str) -> axum_test::TestResponse {
        self.server
            .post("/signin")
            .json(&json!({"email": email, "password": password}))
            .await
    }

    /// Sign up, verify, sign in, and return the session cookie.
    pub async fn signed_in(&self, email: &str) -> Cookie<'static> {
        assert_eq!(self.signup(email).await.status_code(), 201);
        self.verify(email).await;

        let response = self.signin(email, PASSWORD).await;
        assert_eq!(response.status_code(), 200, "{}", response.text());
        response.cookie("token")
    }
}

pub fn signup_form(email: &str) -> Value {
    json!({
        "username": "asha",
        "email": email,
        "password": PASSWORD,
        "cPassword": PASSWORD,
    })
}

/// The `token` query parameter of an emailed link.
pub fn link_token(link: &Url) -> Option<String> {
    link.query_pairs()
        .find(|(k, _)| k == "token")
        .map(|(_, v)| v.into_owned())
}

pub fn product(title: &str, price: f64) -> Product {
    let new: NewProduct = serde_json::from_value(json!({
        "title": title,
        "description": format!("{title} description"),
        "price": price,
        "category": "innovative",
    }))
    .unwrap();
    new.into_product()
}

/// `Set-Cookie` values on a response.
pub fn set_cookie_headers(response: &axum_test::TestResponse) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_owned)
        .collect()
}
