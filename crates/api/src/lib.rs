//! Bagrit API library.
//!
//! Accounts, carts, Stripe checkout and the product catalog for the Bagrit
//! shop frontend. Exposed as a library so the router can be driven
//! in-process by tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, body::Body, http::Request};
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the full router with its middleware stack.
///
/// Sentry layers are added by the binary so tests run without a hub.
pub fn app(state: AppState) -> Router {
    let cors = middleware::cors_layer(&state.config().allowed_origins);

    routes::routes()
        .layer(CookieManagerLayer::new())
        .layer(axum::middleware::from_fn(
            middleware::request_id_middleware,
        ))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                    user_email = tracing::field::Empty,
                )
            }),
        )
        .layer(cors)
        .with_state(state)
}
