//! Bagrit Core - Shared domain types.
//!
//! This crate provides the types used by every Bagrit component:
//! - `api` - The HTTP backend (auth, cart, checkout, catalog)
//! - `cli` - Operator tooling for migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Validated emails, product IDs, prices, cart items and purchase records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
