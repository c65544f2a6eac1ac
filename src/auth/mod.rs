//! Authentication Module
//! Mission: Credential storage, cookie sessions and role-gated access

pub mod api;
pub mod authenticator;
pub mod db;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod resolver;
pub mod session_store;
pub mod sweeper;
pub mod user_store;

pub use api::AuthState;
pub use authenticator::Authenticator;
pub use db::AuthDb;
pub use errors::AuthError;
pub use middleware::{require_role, require_session, CurrentUser, RoleGate};
pub use models::{User, UserRole};
pub use resolver::SessionResolver;
pub use session_store::SessionStore;
pub use user_store::UserStore;
