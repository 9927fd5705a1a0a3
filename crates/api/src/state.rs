//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::db::{PgProductStore, PgUserStore, ProductStore, UserStore};
use crate::services::email::{LogMailer, Mailer, SmtpMailer};
use crate::services::stripe::{PaymentProvider, StripeClient, StripeError};
use crate::services::token::TokenIssuer;

/// Error wiring up production collaborators.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("SMTP setup failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("Stripe client setup failed: {0}")]
    Stripe(#[from] StripeError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Stores and providers sit
/// behind trait objects so tests can swap in in-memory versions.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    users: Arc<dyn UserStore>,
    products: Arc<dyn ProductStore>,
    tokens: TokenIssuer,
    mailer: Arc<dyn Mailer>,
    payments: Arc<dyn PaymentProvider>,
}

impl AppState {
    /// Assemble state from explicit collaborators.
    #[must_use]
    pub fn new(
        config: ApiConfig,
        users: Arc<dyn UserStore>,
        products: Arc<dyn ProductStore>,
        mailer: Arc<dyn Mailer>,
        payments: Arc<dyn PaymentProvider>,
    ) -> Self {
        let tokens = TokenIssuer::new(&config.token_secret);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                users,
                products,
                tokens,
                mailer,
                payments,
            }),
        }
    }

    /// Production wiring: `PostgreSQL` stores, Stripe, and SMTP when
    /// configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay or HTTP client cannot be built.
    pub fn from_config(config: ApiConfig, pool: PgPool) -> Result<Self, StateError> {
        let mailer: Arc<dyn Mailer> = match &config.smtp {
            Some(smtp) => Arc::new(SmtpMailer::new(smtp)?),
            None => {
                tracing::warn!("SMTP not configured; emails will only be logged");
                Arc::new(LogMailer)
            }
        };
        let payments = Arc::new(StripeClient::new(&config.stripe)?);

        Ok(Self::new(
            config,
            Arc::new(PgUserStore::new(pool.clone())),
            Arc::new(PgProductStore::new(pool)),
            mailer,
            payments,
        ))
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// User credential store.
    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.inner.users.as_ref()
    }

    /// Product catalog.
    #[must_use]
    pub fn products(&self) -> &dyn ProductStore {
        self.inner.products.as_ref()
    }

    /// Token issuer for sessions and email links.
    #[must_use]
    pub fn tokens(&self) -> &TokenIssuer {
        &self.inner.tokens
    }

    #[must_use]
    pub fn mailer(&self) -> &dyn Mailer {
        self.inner.mailer.as_ref()
    }

    #[must_use]
    pub fn payments(&self) -> &dyn PaymentProvider {
        self.inner.payments.as_ref()
    }
}
