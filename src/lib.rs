//! Streamapp Backend Library
//!
//! Cookie-session authentication with role-gated routes.
//! `main.rs` wires these modules into a running server.

pub mod api;
pub mod auth;
pub mod middleware;
pub mod models;

pub use api::create_router;
pub use auth::{AuthDb, AuthError, AuthState};
pub use models::Config;
