//! Stripe checkout and webhook handlers.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use serde::Serialize;
use tracing::instrument;

use crate::error::{ApiJson, AppError, PlainError, Result, add_breadcrumb};
use crate::middleware::SessionUser;
use crate::services::checkout::{CheckoutInput, CheckoutService, WebhookOutcome};
use crate::state::AppState;

const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

fn service(state: &AppState) -> CheckoutService<'_> {
    CheckoutService::new(
        state.users(),
        state.payments(),
        &state.config().stripe,
        &state.config().frontend_url,
    )
}

/// Open a Stripe checkout session for the posted items.
#[instrument(skip_all)]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    ApiJson(input): ApiJson<CheckoutInput>,
) -> Result<Json<CheckoutResponse>> {
    let session = service(&state).initiate(&user.email, input).await?;

    add_breadcrumb(
        "checkout",
        "Checkout session created",
        Some(&[("session_id", session.id.as_str())]),
    );
    Ok(Json(CheckoutResponse {
        session_id: session.id,
    }))
}

/// Stripe webhook endpoint. The body must be the raw bytes Stripe signed.
#[instrument(skip_all)]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> std::result::Result<Json<WebhookAck>, PlainError> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            PlainError(AppError::Validation(
                "Webhook Error: No stripe-signature header value was provided.".to_owned(),
            ))
        })?;

    let outcome = service(&state)
        .confirm(&body, signature)
        .await
        .map_err(|e| PlainError(e.into()))?;

    if let WebhookOutcome::Recorded { session_id } = &outcome {
        add_breadcrumb(
            "checkout",
            "Checkout confirmed",
            Some(&[("session_id", session_id.as_str())]),
        );
    }

    Ok(Json(WebhookAck { received: true }))
}
