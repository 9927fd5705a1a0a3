//! Persistence for accounts and the product catalog.
//!
//! # Tables
//!
//! - `users` - Credentials, verification flag, cart, buy cart and purchase
//!   history (JSONB arrays)
//! - `products` - Read-only catalog entries
//!
//! Handlers never touch `sqlx` directly: they go through the [`UserStore`]
//! and [`ProductStore`] traits, which have `PostgreSQL` implementations for
//! production and in-memory ones for tests and local experiments.
//!
//! Every list mutation is a single statement (or a single locked section in
//! memory), so concurrent requests for the same user cannot lose each
//! other's writes.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p bagrit-cli -- migrate
//! ```

pub mod memory;
pub mod products;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use bagrit_core::{CartItem, Email, ItemList, ProductId, PurchaseRecord};

use crate::models::product::Product;
use crate::models::user::{NewUser, User};

pub use memory::{MemoryProductStore, MemoryUserStore};
pub use products::PgProductStore;
pub use users::PgUserStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Outcome of an index-addressed list edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEdit {
    /// The list was changed.
    Applied,
    /// The user exists but the index (or the list) did not allow the edit.
    OutOfRange,
    /// No user with that email.
    UserMissing,
}

/// Account storage.
///
/// Methods returning `bool` report whether a user with the given email
/// existed.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by exact email.
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Insert a new, unverified user.
    ///
    /// Returns [`RepositoryError::Conflict`] if the email is taken.
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;

    async fn mark_verified(&self, email: &Email) -> Result<bool, RepositoryError>;

    async fn set_password_hash(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<bool, RepositoryError>;

    /// Append an item to the end of a list.
    async fn push_item(
        &self,
        email: &Email,
        list: ItemList,
        item: &CartItem,
    ) -> Result<bool, RepositoryError>;

    /// Replace a list with an empty one.
    async fn clear_list(&self, email: &Email, list: ItemList) -> Result<bool, RepositoryError>;

    /// Remove the cart entry at `index`, keeping the order of the rest.
    async fn remove_cart_item(
        &self,
        email: &Email,
        index: usize,
    ) -> Result<ListEdit, RepositoryError>;

    /// Append a record to the purchase history.
    async fn push_purchase(
        &self,
        email: &Email,
        record: &PurchaseRecord,
    ) -> Result<bool, RepositoryError>;

    /// Drop the most recent purchase record. `OutOfRange` when the history
    /// is empty.
    async fn pop_purchase(&self, email: &Email) -> Result<ListEdit, RepositoryError>;

    /// Connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Read-only catalog access.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Product>, RepositoryError>;

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Products whose title contains `needle`, ignoring case.
    async fn search_title(&self, needle: &str) -> Result<Vec<Product>, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map unique violations to `Conflict`, everything else to `Database`.
pub(crate) fn map_unique_violation(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(err)
}
