//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                  - Liveness
//! GET    /health/ready            - Readiness (pings the user store)
//!
//! # Accounts
//! POST   /signup                  - Register, emails a verification link
//! POST   /signin                  - Sets the session cookie
//! GET    /user                    - Profile and purchase history (session)
//! GET    /verify-email?token=     - Confirm email (plaintext)
//! POST   /forgot_password         - Email a reset link (plaintext)
//! POST   /reset-password          - Overwrite password (plaintext)
//! GET    /logout                  - Clear the session cookie
//!
//! # Checkout
//! POST   /create-checkout-session - Stripe hosted checkout (session)
//! POST   /webhook                 - Stripe events (signed raw body)
//!
//! # Cart (session)
//! POST   /addToCart
//! POST   /buyCart
//! DELETE /buyEmpty
//! GET    /getBuyEmail
//! DELETE /clearCart
//! GET    /getCartByEmail
//! POST   /removeFromCart
//! DELETE /delete-last-product
//!
//! # Catalog
//! GET    /getInnovativeProd       - All products (session)
//! GET    /getInnovativeProd/{id}  - One product (session)
//! GET    /search?query=           - Title search
//! ```

pub mod cart;
pub mod checkout;
pub mod products;
pub mod users;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
};
use serde::Serialize;

use crate::state::AppState;

/// `{"message": ...}` success body.
#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

pub(crate) const fn message(text: &'static str) -> Json<Message> {
    Json(Message { message: text })
}

/// Create the application routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        // Accounts
        .route("/signup", post(users::signup))
        .route("/signin", post(users::signin))
        .route("/user", get(users::profile))
        .route("/verify-email", get(users::verify_email))
        .route("/forgot_password", post(users::forgot_password))
        .route("/reset-password", post(users::reset_password))
        .route("/logout", get(users::logout))
        // Checkout
        .route(
            "/create-checkout-session",
            post(checkout::create_checkout_session),
        )
        .route("/webhook", post(checkout::webhook))
        // Cart
        .route("/addToCart", post(cart::add_to_cart))
        .route("/buyCart", post(cart::add_to_buy_cart))
        .route("/buyEmpty", delete(cart::empty_buy_cart))
        .route("/getBuyEmail", get(cart::get_buy_cart))
        .route("/clearCart", delete(cart::clear_cart))
        .route("/getCartByEmail", get(cart::get_cart))
        .route("/removeFromCart", post(cart::remove_from_cart))
        .route("/delete-last-product", delete(cart::delete_last_product))
        // Catalog
        .route("/getInnovativeProd", get(products::list_products))
        .route("/getInnovativeProd/{id}", get(products::show_product))
        .route("/search", get(products::search_products))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.users().ping().await {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            tracing::warn!(error = %err, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
