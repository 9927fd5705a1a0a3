//! Checkout initiation and webhook confirmation.
//!
//! A checkout writes two purchase records with the same session id: a
//! tentative one (buyer details and items) as soon as Stripe hands back a
//! session, and a bare confirmation when `checkout.session.completed`
//! arrives. The confirmation appends rather than updates.

use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use bagrit_core::{CartItem, Email, PurchaseRecord};

use crate::config::StripeConfig;
use crate::db::{RepositoryError, UserStore};
use crate::error::AppError;
use crate::services::stripe::{
    self, CheckoutRequest, CheckoutSession, LineItem, PaymentProvider, StripeError,
    webhook::CHECKOUT_SESSION_COMPLETED,
};

/// Checkout request body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutInput {
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(default)]
    pub user_details: Map<String, Value>,
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Stripe(#[from] StripeError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Stripe(e) => e.into(),
            CheckoutError::Repository(e) => Self::Database(e),
        }
    }
}

/// What a verified webhook delivery led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Confirmation record appended for this session.
    Recorded { session_id: String },
    /// Completed checkout for an email with no account.
    UnknownCustomer { session_id: String },
    /// Event type we do not act on.
    Ignored { event_type: String },
}

pub struct CheckoutService<'a> {
    users: &'a dyn UserStore,
    payments: &'a dyn PaymentProvider,
    stripe: &'a StripeConfig,
    frontend_url: &'a str,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(
        users: &'a dyn UserStore,
        payments: &'a dyn PaymentProvider,
        stripe: &'a StripeConfig,
        frontend_url: &'a str,
    ) -> Self {
        Self {
            users,
            payments,
            stripe,
            frontend_url,
        }
    }

    /// Validate items and turn them into priced line items.
    ///
    /// # Errors
    ///
    /// `StripeError::InvalidLineItem` for an empty list or a malformed item.
    pub fn line_items(&self, items: &[Value]) -> Result<(Vec<CartItem>, Vec<LineItem>), StripeError> {
        if items.is_empty() {
            return Err(StripeError::InvalidLineItem(
                "Checkout requires at least one item".to_owned(),
            ));
        }

        let mut cart_items = Vec::with_capacity(items.len());
        let mut line_items = Vec::with_capacity(items.len());
        for (position, raw) in items.iter().enumerate() {
            let item = CartItem::from_value(raw.clone()).map_err(|e| {
                StripeError::InvalidLineItem(format!("Invalid checkout item {position}: {e}"))
            })?;
            line_items.push(LineItem::from_item(position, &item, self.stripe.currency)?);
            cart_items.push(item);
        }
        Ok((cart_items, line_items))
    }

    /// Open a hosted checkout session and record the tentative purchase.
    ///
    /// # Errors
    ///
    /// Invalid items fail before Stripe is called. Provider and storage
    /// failures are passed through.
    pub async fn initiate(
        &self,
        email: &Email,
        input: CheckoutInput,
    ) -> Result<CheckoutSession, CheckoutError> {
        let (products, line_items) = self.line_items(&input.items)?;

        let request = CheckoutRequest {
            customer_email: email.clone(),
            currency: self.stripe.currency,
            line_items,
            success_url: format!("{}/success", self.frontend_url),
            cancel_url: format!("{}/failure", self.frontend_url),
            allowed_countries: self.stripe.allowed_countries.clone(),
        };
        let session = self.payments.create_checkout_session(&request).await?;

        let record = PurchaseRecord::tentative(session.id.clone(), input.user_details, products);
        if !self.users.push_purchase(email, &record).await? {
            tracing::warn!(
                session_id = %session.id,
                "Checkout session created for missing user; purchase not recorded"
            );
        }

        Ok(session)
    }

    /// Verify a webhook delivery and apply it.
    ///
    /// # Errors
    ///
    /// Signature or payload problems fail before any write.
    pub async fn confirm(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookOutcome, CheckoutError> {
        let event = stripe::construct_event(
            payload,
            signature,
            self.stripe.webhook_secret.expose_secret(),
        )?;

        if event.event_type != CHECKOUT_SESSION_COMPLETED {
            tracing::info!(event_id = %event.id, event_type = %event.event_type, "Ignoring webhook event");
            return Ok(WebhookOutcome::Ignored {
                event_type: event.event_type,
            });
        }

        let session = event.checkout_session()?;
        let email = session.buyer_email().and_then(|e| Email::parse(e).ok());

        let recorded = match &email {
            Some(email) => {
                self.users
                    .push_purchase(email, &PurchaseRecord::confirmation(session.id.clone()))
                    .await?
            }
            None => false,
        };

        if recorded {
            tracing::info!(event_id = %event.id, session_id = %session.id, "Checkout confirmed");
            Ok(WebhookOutcome::Recorded {
                session_id: session.id,
            })
        } else {
            tracing::warn!(
                event_id = %event.id,
                session_id = %session.id,
                "Completed checkout has no matching user"
            );
            Ok(WebhookOutcome::UnknownCustomer {
                session_id: session.id,
            })
        }
    }
}
