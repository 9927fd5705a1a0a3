//! In-memory stores.
//!
//! Used by the HTTP test suite and for running the API without a database.
//! Each operation holds the lock for its whole read-modify-write, matching
//! the single-statement atomicity of the `PostgreSQL` stores.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use bagrit_core::{CartItem, Email, ItemList, ProductId, PurchaseRecord, UserId};

use super::{ListEdit, ProductStore, RepositoryError, UserStore};
use crate::models::product::Product;
use crate::models::user::{NewUser, User};

/// In-memory user storage keyed by email.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Email, User>>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `f` to the user, if present, and bump `updated_at`.
    async fn modify<T>(&self, email: &Email, f: impl FnOnce(&mut User) -> T) -> Option<T> {
        let mut users = self.users.write().await;
        users.get_mut(email).map(|user| {
            let out = f(user);
            user.updated_at = Utc::now();
            out
        })
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.read().await.get(email).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let now = Utc::now();
        let created = User {
            id: UserId::new_random(),
            email: user.email.clone(),
            username: user.username,
            password_hash: user.password_hash,
            verified: false,
            cart: Vec::new(),
            buy_cart: Vec::new(),
            bought_products: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        users.insert(user.email, created.clone());
        Ok(created)
    }

    async fn mark_verified(&self, email: &Email) -> Result<bool, RepositoryError> {
        Ok(self.modify(email, |u| u.verified = true).await.is_some())
    }

    async fn set_password_hash(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<bool, RepositoryError> {
        Ok(self
            .modify(email, |u| u.password_hash = password_hash.to_owned())
            .await
            .is_some())
    }

    async fn push_item(
        &self,
        email: &Email,
        list: ItemList,
        item: &CartItem,
    ) -> Result<bool, RepositoryError> {
        Ok(self
            .modify(email, |u| match list {
                ItemList::Cart => u.cart.push(item.clone()),
                ItemList::BuyCart => u.buy_cart.push(item.clone()),
            })
            .await
            .is_some())
    }

    async fn clear_list(&self, email: &Email, list: ItemList) -> Result<bool, RepositoryError> {
        Ok(self
            .modify(email, |u| match list {
                ItemList::Cart => u.cart.clear(),
                ItemList::BuyCart => u.buy_cart.clear(),
            })
            .await
            .is_some())
    }

    async fn remove_cart_item(
        &self,
        email: &Email,
        index: usize,
    ) -> Result<ListEdit, RepositoryError> {
        let edit = self
            .modify(email, |u| {
                if index < u.cart.len() {
                    u.cart.remove(index);
                    ListEdit::Applied
                } else {
                    ListEdit::OutOfRange
                }
            })
            .await;
        Ok(edit.unwrap_or(ListEdit::UserMissing))
    }

    async fn push_purchase(
        &self,
        email: &Email,
        record: &PurchaseRecord,
    ) -> Result<bool, RepositoryError> {
        Ok(self
            .modify(email, |u| u.bought_products.push(record.clone()))
            .await
            .is_some())
    }

    async fn pop_purchase(&self, email: &Email) -> Result<ListEdit, RepositoryError> {
        let edit = self
            .modify(email, |u| match u.bought_products.pop() {
                Some(_) => ListEdit::Applied,
                None => ListEdit::OutOfRange,
            })
            .await;
        Ok(edit.unwrap_or(ListEdit::UserMissing))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// In-memory product catalog.
#[derive(Debug, Default)]
pub struct MemoryProductStore {
    products: RwLock<Vec<Product>>,
}

impl MemoryProductStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog preloaded with `products`.
    #[must_use]
    pub fn with_products(products: Vec<Product>) -> Self {
        Self {
            products: RwLock::new(products),
        }
    }

    pub async fn insert(&self, product: Product) {
        self.products.write().await.push(product);
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        Ok(self.products.read().await.clone())
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self
            .products
            .read()
            .await
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn search_title(&self, needle: &str) -> Result<Vec<Product>, RepositoryError> {
        let needle = needle.to_lowercase();
        Ok(self
            .products
            .read()
            .await
            .iter()
            .filter(|p| p.title.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }
}
