//! Catalog product types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use bagrit_core::ProductId;

/// Keys `Product` serializes itself; never allowed in `details`.
const RESERVED_KEYS: [&str; 7] = [
    "id",
    "title",
    "description",
    "price",
    "image",
    "category",
    "createdAt",
];

/// A catalog entry as served to clients.
///
/// Display fields the backend does not interpret (ratings, badges, extra
/// images) live in `details` and are flattened into the JSON object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub description: String,
    /// Price in major currency units.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// A product to be inserted, as written in seed files.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Reasons a seed entry is rejected.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NewProductError {
    #[error("product title cannot be empty")]
    EmptyTitle,
    #[error("price of '{0}' cannot be negative")]
    NegativePrice(String),
}

impl NewProduct {
    /// Check the fields the catalog relies on.
    ///
    /// # Errors
    ///
    /// Fails on a blank title or a negative price.
    pub fn validate(&self) -> Result<(), NewProductError> {
        if self.title.trim().is_empty() {
            return Err(NewProductError::EmptyTitle);
        }
        if self.price.is_sign_negative() && !self.price.is_zero() {
            return Err(NewProductError::NegativePrice(self.title.clone()));
        }
        Ok(())
    }

    /// Materialize with a fresh id and timestamp.
    ///
    /// Seed keys that collide with the product's own fields are dropped.
    #[must_use]
    pub fn into_product(mut self) -> Product {
        for key in RESERVED_KEYS {
            self.details.remove(key);
        }
        Product {
            id: ProductId::new_random(),
            title: self.title,
            description: self.description,
            price: self.price,
            image: self.image,
            category: self.category,
            created_at: Utc::now(),
            details: self.details,
        }
    }
}
