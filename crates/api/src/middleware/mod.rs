//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. CORS
//! 3. `TraceLayer` (request span with `request_id` and `user_email` fields)
//! 4. Request ID
//! 5. Cookie manager (required by [`SessionUser`])

pub mod auth;
pub mod cors;
pub mod request_id;

pub use auth::{SessionUser, clear_session_cookie, set_session_cookie};
pub use cors::cors_layer;
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
