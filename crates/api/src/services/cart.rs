//! Per-user cart, buy-now cart and purchase history.
//!
//! Every mutation is a single store call so concurrent requests for the same
//! user never lose each other's writes.

use serde_json::Value;
use thiserror::Error;

use bagrit_core::{CartItem, Email, ItemList};

use crate::db::{ListEdit, RepositoryError, UserStore};
use crate::error::AppError;

/// Cart operation failures. Display strings are client-facing.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("User not found")]
    UserNotFound,

    #[error("Invalid item data")]
    InvalidItem,

    #[error("Invalid item index")]
    InvalidIndex,

    #[error("No cart items found for this email")]
    EmptyCart,

    #[error("No bought products to delete")]
    NoPurchases,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::UserNotFound | CartError::EmptyCart => Self::NotFound(err.to_string()),
            CartError::InvalidItem | CartError::InvalidIndex | CartError::NoPurchases => {
                Self::Validation(err.to_string())
            }
            CartError::Repository(inner) => Self::Database(inner),
        }
    }
}

/// Cart operations for one store.
pub struct CartService<'a> {
    users: &'a dyn UserStore,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(users: &'a dyn UserStore) -> Self {
        Self { users }
    }

    /// Append an item to `list`.
    ///
    /// # Errors
    ///
    /// `InvalidItem` for anything but a non-empty object, `UserNotFound` if
    /// the account is gone.
    pub async fn add(&self, email: &Email, list: ItemList, item: Value) -> Result<(), CartError> {
        let item = CartItem::from_value(item).map_err(|_| CartError::InvalidItem)?;
        if self.users.push_item(email, list, &item).await? {
            tracing::debug!(list = list.as_str(), "Item appended");
            Ok(())
        } else {
            Err(CartError::UserNotFound)
        }
    }

    /// Empty `list`.
    ///
    /// # Errors
    ///
    /// `UserNotFound` if the account is gone.
    pub async fn clear(&self, email: &Email, list: ItemList) -> Result<(), CartError> {
        if self.users.clear_list(email, list).await? {
            Ok(())
        } else {
            Err(CartError::UserNotFound)
        }
    }

    /// Current contents of the regular cart.
    ///
    /// # Errors
    ///
    /// `UserNotFound`, or `EmptyCart` when there is nothing in it.
    pub async fn cart(&self, email: &Email) -> Result<Vec<CartItem>, CartError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(CartError::UserNotFound)?;
        if user.cart.is_empty() {
            return Err(CartError::EmptyCart);
        }
        Ok(user.cart)
    }

    /// Current contents of the buy-now cart, possibly empty.
    ///
    /// # Errors
    ///
    /// `UserNotFound` if the account is gone.
    pub async fn buy_cart(&self, email: &Email) -> Result<Vec<CartItem>, CartError> {
        self.users
            .find_by_email(email)
            .await?
            .map(|u| u.buy_cart)
            .ok_or(CartError::UserNotFound)
    }

    /// Remove the cart item at the index given by the client.
    ///
    /// Only non-negative JSON integers are indices. An unknown user is
    /// reported before a bad index.
    ///
    /// # Errors
    ///
    /// `UserNotFound` or `InvalidIndex`.
    pub async fn remove(&self, email: &Email, raw_index: Option<&Value>) -> Result<(), CartError> {
        let index = raw_index
            .and_then(Value::as_u64)
            .and_then(|i| usize::try_from(i).ok());

        let Some(index) = index else {
            return match self.users.find_by_email(email).await? {
                Some(_) => Err(CartError::InvalidIndex),
                None => Err(CartError::UserNotFound),
            };
        };

        match self.users.remove_cart_item(email, index).await? {
            ListEdit::Applied => Ok(()),
            ListEdit::OutOfRange => Err(CartError::InvalidIndex),
            ListEdit::UserMissing => Err(CartError::UserNotFound),
        }
    }

    /// Drop the newest purchase record.
    ///
    /// # Errors
    ///
    /// `UserNotFound` or `NoPurchases`.
    pub async fn delete_last_purchase(&self, email: &Email) -> Result<(), CartError> {
        match self.users.pop_purchase(email).await? {
            ListEdit::Applied => Ok(()),
            ListEdit::OutOfRange => Err(CartError::NoPurchases),
            ListEdit::UserMissing => Err(CartError::UserNotFound),
        }
    }
}
