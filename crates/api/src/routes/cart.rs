//! Cart route handlers.
//!
//! All routes are session-gated and act on the signed-in user's lists.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use bagrit_core::{CartItem, ItemList};

use super::{Message, message};
use crate::error::{ApiJson, Result};
use crate::middleware::SessionUser;
use crate::services::cart::CartService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveItemInput {
    pub item_index: Option<Value>,
}

#[instrument(skip_all)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    ApiJson(item): ApiJson<Value>,
) -> Result<(StatusCode, Json<Message>)> {
    CartService::new(state.users())
        .add(&user.email, ItemList::Cart, item)
        .await?;
    Ok((StatusCode::CREATED, message("Item added to cart successfully")))
}

#[instrument(skip_all)]
pub async fn add_to_buy_cart(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    ApiJson(item): ApiJson<Value>,
) -> Result<(StatusCode, Json<Message>)> {
    CartService::new(state.users())
        .add(&user.email, ItemList::BuyCart, item)
        .await?;
    Ok((
        StatusCode::CREATED,
        message("Item added to buy cart successfully"),
    ))
}

#[instrument(skip_all)]
pub async fn empty_buy_cart(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
) -> Result<Json<Message>> {
    CartService::new(state.users())
        .clear(&user.email, ItemList::BuyCart)
        .await?;
    Ok(message("Buy cart cleared successfully"))
}

/// Buy-now cart; an empty list is a normal 200.
#[instrument(skip_all)]
pub async fn get_buy_cart(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
) -> Result<Json<Vec<CartItem>>> {
    let items = CartService::new(state.users()).buy_cart(&user.email).await?;
    Ok(Json(items))
}

#[instrument(skip_all)]
pub async fn clear_cart(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
) -> Result<Json<Message>> {
    CartService::new(state.users())
        .clear(&user.email, ItemList::Cart)
        .await?;
    Ok(message("Cart cleared successfully"))
}

/// Regular cart; an empty cart answers 404.
#[instrument(skip_all)]
pub async fn get_cart(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
) -> Result<Json<Vec<CartItem>>> {
    let items = CartService::new(state.users()).cart(&user.email).await?;
    Ok(Json(items))
}

#[instrument(skip_all)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    ApiJson(input): ApiJson<RemoveItemInput>,
) -> Result<Json<Message>> {
    CartService::new(state.users())
        .remove(&user.email, input.item_index.as_ref())
        .await?;
    Ok(message("Item removed from cart successfully"))
}

#[instrument(skip_all)]
pub async fn delete_last_product(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
) -> Result<Json<Message>> {
    CartService::new(state.users())
        .delete_last_purchase(&user.email)
        .await?;
    Ok(message("Last bought product deleted successfully"))
}
