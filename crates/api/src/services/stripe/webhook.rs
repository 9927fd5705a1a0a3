//! Stripe webhook signature verification and event parsing.
//!
//! Stripe-Signature header format: `t=<unix seconds>,v1=<hex hmac>[,v1=...]`.
//! The HMAC-SHA256 is computed with the endpoint secret over
//! `"{t}.{raw body}"`, so verification must see the body bytes exactly as
//! received.

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::StripeError;

type HmacSha256 = Hmac<Sha256>;

/// Event type that carries a paid checkout.
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Maximum age of a signed timestamp, in seconds.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// A Stripe event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: Value,
}

/// The fields of a completed checkout session we act on.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
}

impl CheckoutSessionObject {
    /// Email the buyer checked out with.
    ///
    /// Prefers `customer_email`, which is what we set when creating the
    /// session, and falls back to what the buyer typed on Stripe's page.
    #[must_use]
    pub fn buyer_email(&self) -> Option<&str> {
        self.customer_email
            .as_deref()
            .or_else(|| self.customer_details.as_ref()?.email.as_deref())
            .filter(|e| !e.trim().is_empty())
    }
}

impl WebhookEvent {
    /// Decode `data.object` as a checkout session.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::InvalidPayload` if the object lacks an `id`.
    pub fn checkout_session(&self) -> Result<CheckoutSessionObject, StripeError> {
        Ok(CheckoutSessionObject::deserialize(&self.data.object)?)
    }
}

fn signature_for(payload: &[u8], secret: &str, timestamp: &str) -> Result<String, StripeError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| StripeError::InvalidSignature("Invalid webhook secret".to_owned()))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Build a `Stripe-Signature` header value for `payload`.
///
/// Used to replay events against a local server and in tests.
///
/// # Errors
///
/// Returns `StripeError::InvalidSignature` if the secret cannot key an HMAC.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, StripeError> {
    let t = timestamp.to_string();
    let v1 = signature_for(payload, secret, &t)?;
    Ok(format!("t={t},v1={v1}"))
}

/// Verify a Stripe webhook signature at time `now`.
///
/// Any `v1` entry may match; other schemes are ignored.
///
/// # Errors
///
/// Returns `StripeError::InvalidSignature` if the header is malformed, no
/// signature matches, or the timestamp is outside `tolerance` seconds.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
    tolerance: i64,
) -> Result<(), StripeError> {
    let mut timestamp = None;
    let mut candidates = Vec::new();
    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = Some(value),
            "v1" => candidates.push(value),
            _ => {}
        }
    }

    let (Some(timestamp), false) = (timestamp, candidates.is_empty()) else {
        return Err(StripeError::InvalidSignature(
            "Unable to extract timestamp and signatures from header".to_owned(),
        ));
    };
    let signed_at: i64 = timestamp.parse().map_err(|_| {
        StripeError::InvalidSignature(
            "Unable to extract timestamp and signatures from header".to_owned(),
        )
    })?;

    let expected = signature_for(payload, secret, timestamp)?;
    let matched = candidates
        .iter()
        .any(|sig| bool::from(expected.as_bytes().ct_eq(sig.as_bytes())));
    if !matched {
        return Err(StripeError::InvalidSignature(
            "No signatures found matching the expected signature for payload".to_owned(),
        ));
    }

    if (now - signed_at).abs() > tolerance {
        return Err(StripeError::InvalidSignature(
            "Timestamp outside the tolerance zone".to_owned(),
        ));
    }

    Ok(())
}

/// Verify the signature and decode the event.
///
/// # Errors
///
/// `InvalidSignature` for signature problems, `InvalidPayload` if the
/// verified body is not an event.
pub fn construct_event(payload: &[u8], header: &str, secret: &str) -> Result<WebhookEvent, StripeError> {
    verify_signature(
        payload,
        header,
        secret,
        Utc::now().timestamp(),
        DEFAULT_TOLERANCE_SECS,
    )?;
    Ok(serde_json::from_slice(payload)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const PAYLOAD: &[u8] = br#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{"id":"cs_1","customer_email":"a@b.com"}}}"#;

    #[test]
    fn test_valid_signature() {
        let now = 1_700_000_000;
        let header = sign_payload(PAYLOAD, SECRET, now).unwrap();
        assert!(verify_signature(PAYLOAD, &header, SECRET, now + 10, DEFAULT_TOLERANCE_SECS).is_ok());
    }

    #[test]
    fn test_any_v1_may_match() {
        let now = 1_700_000_000;
        let good = sign_payload(PAYLOAD, SECRET, now).unwrap();
        let v1 = good.split_once("v1=").unwrap().1;
        let header = format!("t={now},v0=abc,v1=deadbeef,v1={v1}");
        assert!(verify_signature(PAYLOAD, &header, SECRET, now, DEFAULT_TOLERANCE_SECS).is_ok());
    }

    #[test]
    fn test_wrong_secret_or_body() {
        let now = 1_700_000_000;
        let header = sign_payload(PAYLOAD, "whsec_other", now).unwrap();
        let err = verify_signature(PAYLOAD, &header, SECRET, now, DEFAULT_TOLERANCE_SECS).unwrap_err();
        assert!(err.to_string().contains("No signatures found"));

        let header = sign_payload(PAYLOAD, SECRET, now).unwrap();
        assert!(verify_signature(b"{}", &header, SECRET, now, DEFAULT_TOLERANCE_SECS).is_err());
    }

    #[test]
    fn test_malformed_header() {
        for header in ["", "garbage", "t=123", "v1=abc", "t=abc,v1=abc"] {
            let err = verify_signature(PAYLOAD, header, SECRET, 0, DEFAULT_TOLERANCE_SECS).unwrap_err();
            assert!(matches!(err, StripeError::InvalidSignature(_)), "{header}");
        }
    }

    #[test]
    fn test_stale_timestamp() {
        let signed_at = 1_700_000_000;
        let header = sign_payload(PAYLOAD, SECRET, signed_at).unwrap();
        let err = verify_signature(PAYLOAD, &header, SECRET, signed_at + 301, DEFAULT_TOLERANCE_SECS)
            .unwrap_err();
        assert!(err.to_string().contains("tolerance"));
    }

    #[test]
    fn test_construct_event_and_buyer_email() {
        let header = sign_payload(PAYLOAD, SECRET, Utc::now().timestamp()).unwrap();
        let event = construct_event(PAYLOAD, &header, SECRET).unwrap();
        assert_eq!(event.event_type, CHECKOUT_SESSION_COMPLETED);

        let session = event.checkout_session().unwrap();
        assert_eq!(session.id, "cs_1");
        assert_eq!(session.buyer_email(), Some("a@b.com"));
    }

    #[test]
    fn test_buyer_email_falls_back_to_details() {
        let session: CheckoutSessionObject = serde_json::from_value(serde_json::json!({
            "id": "cs_2",
            "customer_email": null,
            "customer_details": {"email": "b@c.com"}
        }))
        .unwrap();
        assert_eq!(session.buyer_email(), Some("b@c.com"));

        let bare: CheckoutSessionObject =
            serde_json::from_value(serde_json::json!({"id": "cs_3"})).unwrap();
        assert_eq!(bare.buyer_email(), None);
    }
}
