//! Domain models for the API.

pub mod product;
pub mod session;
pub mod user;

pub use product::{NewProduct, Product};
pub use session::{CurrentUser, SESSION_COOKIE};
pub use user::{NewUser, User, UserProfile};
