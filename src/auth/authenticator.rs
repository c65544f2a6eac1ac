//! Authenticator
//! Mission: Check credentials, register accounts, mint and revoke sessions

use crate::auth::{
    errors::AuthError,
    models::{LoginOutcome, User, UserRole},
    session_store::SessionStore,
    user_store::UserStore,
};
use bcrypt::{hash, verify};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct Authenticator {
    users: UserStore,
    sessions: SessionStore,
    // Verified against when the email is unknown so both failure paths pay for one bcrypt check.
    dummy_hash: Arc<str>,
}

impl Authenticator {
    pub fn new(users: UserStore, sessions: SessionStore) -> Result<Self, AuthError> {
        let dummy_hash = hash("streamapp-dummy-password", users.bcrypt_cost())?;
        Ok(Self {
            users,
            sessions,
            dummy_hash: dummy_hash.into(),
        })
    }

    /// Validate input, parse the role and create the account.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: &str,
    ) -> Result<User, AuthError> {
        let role: UserRole = role.parse()?;

        if email.trim().is_empty() {
            return Err(AuthError::InvalidInput("email is empty".into()));
        }
        if password.is_empty() {
            return Err(AuthError::InvalidInput("password is empty".into()));
        }

        let users = self.users.clone();
        let (username, email, password) =
            (username.to_string(), email.to_string(), password.to_string());

        tokio::task::spawn_blocking(move || users.create_user(&username, &email, &password, role))
            .await?
    }

    /// Unknown email and wrong password both yield `InvalidCredentials`.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let this = self.clone();
        let (email, password) = (email.to_string(), password.to_string());

        tokio::task::spawn_blocking(move || this.login_blocking(&email, &password)).await?
    }

    /// Lookup, bcrypt check and session insert, all on the blocking pool.
    fn login_blocking(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let (user, stored_hash) = match self.users.find_by_email(email) {
            Ok((user, stored_hash)) => (Some(user), stored_hash),
            Err(AuthError::NotFound) => (None, self.dummy_hash.to_string()),
            Err(e) => return Err(e),
        };

        let valid = verify(password, &stored_hash)?;

        let user = match user {
            Some(user) if valid => user,
            _ => {
                warn!("❌ Failed login attempt: {}", email);
                return Err(AuthError::InvalidCredentials);
            }
        };

        let session = self.sessions.create(user.id)?;

        info!("✅ Login successful: {} ({})", user.email, user.role);

        Ok(LoginOutcome {
            user,
            token: session.id,
            expires_at: session.expires_at,
        })
    }

    /// Best effort; an unknown token still counts as logged out.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        let sessions = self.sessions.clone();
        let token = token.to_string();

        tokio::task::spawn_blocking(move || sessions.delete(&token)).await?
    }
}
