//! Stripe hosted checkout.
//!
//! [`PaymentProvider`] is the seam between checkout logic and Stripe's HTTP
//! API; [`StripeClient`] is the real implementation and tests substitute a
//! recording fake. Webhook verification lives in [`webhook`].

mod client;
pub mod webhook;

pub use client::StripeClient;
pub use webhook::{CheckoutSessionObject, WebhookEvent, construct_event};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use bagrit_core::{CartItem, CurrencyCode, Email, Price};

/// Errors talking to Stripe or validating its input and callbacks.
#[derive(Debug, Error)]
pub enum StripeError {
    /// Transport-level failure.
    #[error("Stripe request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe answered with an error object.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// A checkout item could not become a line item.
    #[error("{0}")]
    InvalidLineItem(String),

    /// Webhook signature header missing, malformed, stale or wrong.
    #[error("{0}")]
    InvalidSignature(String),

    /// Webhook body is not a Stripe event.
    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// One priced row on the hosted checkout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    /// Product name shown to the buyer.
    pub name: String,
    /// Price per unit in minor units (paise for INR).
    pub unit_amount: i64,
    pub quantity: u32,
}

impl LineItem {
    /// Build a line item from a checkout item `{title, price, quantity}`.
    ///
    /// `price` is in major units and converted with
    /// [`Price::minor_units`].
    ///
    /// # Errors
    ///
    /// Returns `StripeError::InvalidLineItem` naming the item position and
    /// the offending field.
    pub fn from_item(
        position: usize,
        item: &CartItem,
        currency: CurrencyCode,
    ) -> Result<Self, StripeError> {
        let invalid = |what: &str| {
            StripeError::InvalidLineItem(format!("Invalid checkout item {position}: {what}"))
        };

        let name = item
            .get("title")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| invalid("title is required"))?;

        let price = item
            .get("price")
            .and_then(Value::as_f64)
            .ok_or_else(|| invalid("price must be a number"))?;
        let unit_amount = Price::from_f64(price, currency)
            .and_then(|p| p.minor_units())
            .map_err(|e| invalid(&e.to_string()))?;

        let quantity = item
            .get("quantity")
            .and_then(Value::as_u64)
            .filter(|q| *q > 0)
            .and_then(|q| u32::try_from(q).ok())
            .ok_or_else(|| invalid("quantity must be a positive integer"))?;

        Ok(Self {
            name: name.to_owned(),
            unit_amount,
            quantity,
        })
    }

    /// Amount charged for this row, in minor units.
    #[must_use]
    pub fn total(&self) -> i64 {
        self.unit_amount.saturating_mul(i64::from(self.quantity))
    }
}

/// Everything needed to open a hosted checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub customer_email: Email,
    pub currency: CurrencyCode,
    pub line_items: Vec<LineItem>,
    pub success_url: String,
    pub cancel_url: String,
    pub allowed_countries: Vec<String>,
}

/// The part of Stripe's checkout session object we use.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Creates hosted checkout sessions.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, StripeError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(value: Value) -> CartItem {
        CartItem::from_value(value).unwrap()
    }

    #[test]
    fn test_line_totals_in_minor_units() {
        let a = LineItem::from_item(
            0,
            &item(json!({"title": "Lamp", "price": 100, "quantity": 2})),
            CurrencyCode::INR,
        )
        .unwrap();
        let b = LineItem::from_item(
            1,
            &item(json!({"title": "Desk", "price": 250, "quantity": 1})),
            CurrencyCode::INR,
        )
        .unwrap();

        assert_eq!(a.unit_amount, 10000);
        assert_eq!(a.total(), 20000);
        assert_eq!(b.unit_amount, 25000);
        assert_eq!(b.total(), 25000);
    }

    #[test]
    fn test_fractional_price_rounds_to_paise() {
        let li = LineItem::from_item(
            0,
            &item(json!({"title": "Pen", "price": 19.99, "quantity": 3})),
            CurrencyCode::INR,
        )
        .unwrap();
        assert_eq!(li.unit_amount, 1999);
        assert_eq!(li.total(), 5997);
    }

    #[test]
    fn test_rejects_malformed_items() {
        let cases = [
            json!({"price": 10, "quantity": 1}),
            json!({"title": "", "price": 10, "quantity": 1}),
            json!({"title": "A", "price": "10", "quantity": 1}),
            json!({"title": "A", "price": -5, "quantity": 1}),
            json!({"title": "A", "price": 10, "quantity": 0}),
            json!({"title": "A", "price": 10, "quantity": 1.5}),
        ];
        for case in cases {
            let err = LineItem::from_item(3, &item(case.clone()), CurrencyCode::INR).unwrap_err();
            assert!(
                matches!(&err, StripeError::InvalidLineItem(msg) if msg.starts_with("Invalid checkout item 3")),
                "{case} -> {err}"
            );
        }
    }
}
