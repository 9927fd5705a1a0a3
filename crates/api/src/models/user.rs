//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bagrit_core::{CartItem, Email, PurchaseRecord, UserId};

/// A shop account (domain type).
#[derive(Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login email; unique across accounts.
    pub email: Email,
    pub username: String,
    /// Argon2id PHC string.
    pub password_hash: String,
    /// Whether the email has been verified.
    pub verified: bool,
    /// Items the shopper has collected.
    pub cart: Vec<CartItem>,
    /// Items staged for immediate purchase.
    pub buy_cart: Vec<CartItem>,
    /// Purchase history, oldest first.
    pub bought_products: Vec<PurchaseRecord>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password_hash", &"[REDACTED]")
            .field("verified", &self.verified)
            .field("cart", &self.cart.len())
            .field("buy_cart", &self.buy_cart.len())
            .field("bought_products", &self.bought_products.len())
            .finish_non_exhaustive()
    }
}

/// Data needed to insert a user.
#[derive(Clone)]
pub struct NewUser {
    pub email: Email,
    pub username: String,
    pub password_hash: String,
}

/// Profile returned by `GET /user`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub username: String,
    pub email: Email,
    /// Purchase records with the provider session id removed.
    pub bought_products: Vec<PurchaseRecord>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            bought_products: user
                .bought_products
                .iter()
                .map(PurchaseRecord::without_session_id)
                .collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user() -> User {
        let details = json!({"city": "Pune"}).as_object().cloned().unwrap();
        User {
            id: UserId::new_random(),
            email: Email::parse("a@b.com").unwrap(),
            username: "asha".into(),
            password_hash: "$argon2id$v=19$secret-hash".into(),
            verified: true,
            cart: Vec::new(),
            buy_cart: Vec::new(),
            bought_products: vec![
                PurchaseRecord::tentative("cs_1", details, Vec::new()),
                PurchaseRecord::confirmation("cs_1"),
            ],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_profile_strips_session_ids() {
        let profile = serde_json::to_value(UserProfile::from(&user())).unwrap();
        assert_eq!(
            profile,
            json!({
                "username": "asha",
                "email": "a@b.com",
                "boughtProducts": [{"city": "Pune", "products": []}, {}]
            })
        );
    }

    #[test]
    fn test_debug_hides_password_hash() {
        let output = format!("{:?}", user());
        assert!(!output.contains("secret-hash"));
        assert!(output.contains("[REDACTED]"));
    }
}
