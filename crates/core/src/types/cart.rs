//! Cart items.
//!
//! Items are whatever JSON object the shop frontend posts. The backend
//! never inspects them beyond requiring a non-empty object, so clients can
//! add fields without a server release.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reasons a payload cannot become a [`CartItem`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartItemError {
    #[error("cart item must be a JSON object")]
    NotAnObject,
    #[error("cart item cannot be empty")]
    Empty,
}

/// A schema-free cart entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartItem(Map<String, Value>);

impl CartItem {
    /// Accept a client payload as a cart item.
    ///
    /// # Errors
    ///
    /// Fails for non-objects and for `{}`.
    pub fn from_value(value: Value) -> Result<Self, CartItemError> {
        match value {
            Value::Object(map) if map.is_empty() => Err(CartItemError::Empty),
            Value::Object(map) => Ok(Self(map)),
            _ => Err(CartItemError::NotAnObject),
        }
    }

    /// Look up a field of the item.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl TryFrom<Value> for CartItem {
    type Error = CartItemError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

/// The two per-user item lists that share cart semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemList {
    /// Items the shopper is browsing toward.
    Cart,
    /// Items staged for an immediate purchase.
    BuyCart,
}

impl ItemList {
    /// Stable name used in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cart => "cart",
            Self::BuyCart => "buy_cart",
        }
    }
}

impl core::fmt::Display for ItemList {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accepts_arbitrary_object() {
        let item = CartItem::from_value(json!({"sku": "x", "qty": 1, "meta": {"gift": true}})).unwrap();
        assert_eq!(item.get("sku"), Some(&json!("x")));
        assert_eq!(item.get("meta"), Some(&json!({"gift": true})));
    }

    #[test]
    fn test_rejects_empty_and_non_objects() {
        assert_eq!(CartItem::from_value(json!({})), Err(CartItemError::Empty));
        assert_eq!(
            CartItem::from_value(json!([1, 2])),
            Err(CartItemError::NotAnObject)
        );
        assert_eq!(
            CartItem::from_value(Value::Null),
            Err(CartItemError::NotAnObject)
        );
    }

    #[test]
    fn test_serializes_unchanged() {
        let raw = json!({"sku": "x", "qty": 1});
        let item = CartItem::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&item).unwrap(), raw);
    }
}
