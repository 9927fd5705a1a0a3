//! Core types for Bagrit.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod email;
pub mod id;
pub mod price;
pub mod purchase;

pub use cart::{CartItem, CartItemError, ItemList};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{CurrencyCode, CurrencyCodeError, Price, PriceError};
pub use purchase::PurchaseRecord;
