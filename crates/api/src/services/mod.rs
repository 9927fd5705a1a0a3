//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Signup, signin, email verification and password reset
//! - `token` - Signed session, verification and reset tokens
//! - `cart` - Cart, buy-now cart and purchase history edits
//! - `checkout` - Stripe checkout initiation and webhook confirmation
//! - `stripe` - Stripe HTTP client and webhook signatures
//! - `email` - Verification and reset emails

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod email;
pub mod stripe;
pub mod token;
