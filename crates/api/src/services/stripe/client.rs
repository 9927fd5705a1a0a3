//! HTTP client for Stripe's checkout sessions endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;

use super::{CheckoutRequest, CheckoutSession, PaymentProvider, StripeError};
use crate::config::StripeConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Stripe REST client.
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    api_base: String,
    secret_key: SecretString,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorObject,
}

#[derive(Deserialize)]
struct ErrorObject {
    message: Option<String>,
}

impl StripeClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::Http` if the HTTP client cannot be built.
    pub fn new(config: &StripeConfig) -> Result<Self, StripeError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            secret_key: config.secret_key.clone(),
        })
    }
}

/// Encode a checkout request in Stripe's bracketed form syntax.
pub(super) fn form_params(request: &CheckoutRequest) -> Vec<(String, String)> {
    let currency = request.currency.stripe_code();
    let mut params = vec![
        ("mode".to_owned(), "payment".to_owned()),
        ("payment_method_types[]".to_owned(), "card".to_owned()),
        (
            "customer_email".to_owned(),
            request.customer_email.as_str().to_owned(),
        ),
        ("success_url".to_owned(), request.success_url.clone()),
        ("cancel_url".to_owned(), request.cancel_url.clone()),
    ];

    for (i, item) in request.line_items.iter().enumerate() {
        params.extend([
            (
                format!("line_items[{i}][price_data][currency]"),
                currency.to_owned(),
            ),
            (
                format!("line_items[{i}][price_data][product_data][name]"),
                item.name.clone(),
            ),
            (
                format!("line_items[{i}][price_data][unit_amount]"),
                item.unit_amount.to_string(),
            ),
            (format!("line_items[{i}][quantity]"), item.quantity.to_string()),
        ]);
    }

    for country in &request.allowed_countries {
        params.push((
            "shipping_address_collection[allowed_countries][]".to_owned(),
            country.clone(),
        ));
    }

    params
}

#[async_trait]
impl PaymentProvider for StripeClient {
    #[instrument(skip(self, request), fields(items = request.line_items.len()))]
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, StripeError> {
        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(self.secret_key.expose_secret())
            .form(&form_params(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or_else(|| format!("Stripe returned HTTP {status}"));
            tracing::warn!(status = status.as_u16(), %message, "Stripe rejected checkout session");
            return Err(StripeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let session: CheckoutSession = response.json().await?;
        tracing::info!(session_id = %session.id, "Created checkout session");
        Ok(session)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::stripe::LineItem;
    use bagrit_core::{CurrencyCode, Email};

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            customer_email: Email::parse("a@b.com").unwrap(),
            currency: CurrencyCode::INR,
            line_items: vec![
                LineItem {
                    name: "Lamp".into(),
                    unit_amount: 10000,
                    quantity: 2,
                },
                LineItem {
                    name: "Desk".into(),
                    unit_amount: 25000,
                    quantity: 1,
                },
            ],
            success_url: "http://localhost:3000/success".into(),
            cancel_url: "http://localhost:3000/failure".into(),
            allowed_countries: vec!["IN".into()],
        }
    }

    fn value<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_form_params_encode_line_items() {
        let params = form_params(&request());

        assert_eq!(value(&params, "mode"), Some("payment"));
        assert_eq!(value(&params, "customer_email"), Some("a@b.com"));
        assert_eq!(value(&params, "line_items[0][price_data][currency]"), Some("inr"));
        assert_eq!(
            value(&params, "line_items[0][price_data][product_data][name]"),
            Some("Lamp")
        );
        assert_eq!(value(&params, "line_items[0][price_data][unit_amount]"), Some("10000"));
        assert_eq!(value(&params, "line_items[0][quantity]"), Some("2"));
        assert_eq!(value(&params, "line_items[1][price_data][unit_amount]"), Some("25000"));
        assert_eq!(
            value(&params, "shipping_address_collection[allowed_countries][]"),
            Some("IN")
        );
        assert_eq!(value(&params, "payment_method_types[]"), Some("card"));
        assert_eq!(value(&params, "success_url"), Some("http://localhost:3000/success"));
    }

    #[test]
    fn test_debug_hides_key() {
        let client = StripeClient::new(&crate::config::StripeConfig {
            secret_key: SecretString::from("sk_test_hidden"),
            webhook_secret: SecretString::from("whsec_hidden"),
            currency: CurrencyCode::INR,
            allowed_countries: vec!["IN".into()],
            api_base: "https://api.stripe.com/".into(),
        })
        .unwrap();
        let debug = format!("{client:?}");
        assert!(debug.contains("https://api.stripe.com"));
        assert!(!debug.contains("sk_test_hidden"));
    }
}
