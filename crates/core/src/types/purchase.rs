//! Purchase history records.
//!
//! A checkout leaves two records behind: a tentative one written when the
//! hosted checkout session is created (buyer details plus items), and a
//! bare confirmation written when the provider reports completion. Both
//! carry the same provider session id.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::cart::CartItem;

const SESSION_ID_KEY: &str = "stripeSessionId";
const PRODUCTS_KEY: &str = "products";

/// One entry in a user's `boughtProducts` history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe_session_id: Option<String>,
    /// Buyer-supplied shipping and contact fields, stored as sent.
    #[serde(flatten)]
    pub details: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<CartItem>>,
}

impl PurchaseRecord {
    /// Record written when a checkout session is created.
    ///
    /// Detail keys that would shadow the session id or item list are
    /// dropped.
    #[must_use]
    pub fn tentative(
        session_id: impl Into<String>,
        mut details: Map<String, Value>,
        products: Vec<CartItem>,
    ) -> Self {
        details.remove(SESSION_ID_KEY);
        details.remove(PRODUCTS_KEY);
        Self {
            stripe_session_id: Some(session_id.into()),
            details,
            products: Some(products),
        }
    }

    /// Record written when the provider confirms payment.
    #[must_use]
    pub fn confirmation(session_id: impl Into<String>) -> Self {
        Self {
            stripe_session_id: Some(session_id.into()),
            details: Map::new(),
            products: None,
        }
    }

    /// Copy suitable for showing to the buyer: the provider session id is
    /// removed.
    #[must_use]
    pub fn without_session_id(&self) -> Self {
        Self {
            stripe_session_id: None,
            ..self.clone()
        }
    }

    /// True for the bare record appended on payment confirmation.
    #[must_use]
    pub fn is_confirmation(&self) -> bool {
        self.products.is_none() && self.details.is_empty()
    }
}
