//! Catalog route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use bagrit_core::ProductId;

use crate::error::{AppError, Result};
use crate::middleware::SessionUser;
use crate::models::Product;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
}

/// Every product in the catalog.
#[instrument(skip_all)]
pub async fn list_products(
    State(state): State<AppState>,
    SessionUser(_user): SessionUser,
) -> Result<Json<Vec<Product>>> {
    let products = state.products().list().await?;
    if products.is_empty() {
        return Err(AppError::NotFound("No products found".to_owned()));
    }
    Ok(Json(products))
}

/// One product. A malformed id is a 400, an unknown one a 404.
#[instrument(skip(state, _user))]
pub async fn show_product(
    State(state): State<AppState>,
    SessionUser(_user): SessionUser,
    Path(id): Path<String>,
) -> Result<Json<Product>> {
    let id = ProductId::parse(&id).map_err(|_| AppError::Validation("Invalid product ID".to_owned()))?;

    state
        .products()
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Product not found".to_owned()))
}

/// Case-insensitive substring search over titles.
#[instrument(skip(state))]
pub async fn search_products(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<Product>>> {
    let needle = params
        .query
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::Validation("Search query is required".to_owned()))?;

    let products = state.products().search_title(&needle).await?;
    if products.is_empty() {
        return Err(AppError::NotFound("No products match your search".to_owned()));
    }
    Ok(Json(products))
}
