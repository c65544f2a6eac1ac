//! Authentication API Endpoints
//! Mission: Provide register, login, logout and current-user endpoints

use crate::auth::{
    authenticator::Authenticator,
    db::AuthDb,
    errors::AuthError,
    middleware::{authenticate_request, session_token, CurrentUser, SESSION_COOKIE_NAME},
    models::{LoginRequest, RegisterRequest, UserResponse},
    resolver::SessionResolver,
    session_store::SessionStore,
    user_store::UserStore,
};
use crate::models::Config;
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Duration;
use tracing::{info, warn};

/// Shared auth state
#[derive(Clone)]
pub struct AuthState {
    pub db: AuthDb,
    pub authenticator: Authenticator,
    pub resolver: SessionResolver,
    pub cookie: CookieSettings,
}

/// How the session cookie is written
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub secure: bool,
    pub max_age: Duration,
}

impl AuthState {
    pub fn new(
        db: AuthDb,
        bcrypt_cost: u32,
        session_ttl: Duration,
        cookie_secure: bool,
    ) -> Result<Self, AuthError> {
        let users = UserStore::with_cost(db.clone(), bcrypt_cost);
        let sessions = SessionStore::with_ttl(db.clone(), session_ttl);

        Ok(Self {
            authenticator: Authenticator::new(users.clone(), sessions.clone())?,
            resolver: SessionResolver::new(sessions, users),
            cookie: CookieSettings {
                secure: cookie_secure,
                max_age: session_ttl,
            },
            db,
        })
    }

    pub fn from_config(db: AuthDb, config: &Config) -> Result<Self, AuthError> {
        Self::new(
            db,
            config.bcrypt_cost,
            Duration::hours(config.session_ttl_hours),
            config.cookie_secure,
        )
    }

    /// In-memory database, cheapest bcrypt cost, 24h sessions
    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self::new(AuthDb::in_memory().unwrap(), 4, Duration::hours(24), true).unwrap()
    }
}

impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        AuthError::InvalidInput(rejection.body_text())
    }
}

fn session_cookie(token: String, settings: &CookieSettings) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .secure(settings.secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(settings.max_age.num_seconds()))
        .build()
}

fn cleared_session_cookie(settings: &CookieSettings) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE_NAME)
        .path("/")
        .http_only(true)
        .secure(settings.secure)
        .same_site(SameSite::Lax)
        .build()
}

/// Register endpoint - POST /register
pub async fn register(
    State(state): State<AuthState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, AuthError> {
    let Json(payload) = payload?;

    info!("📝 Registration attempt: {}", payload.email);

    let user = state
        .authenticator
        .register(
            &payload.username,
            &payload.email,
            &payload.password,
            &payload.role,
        )
        .await?;

    Ok(Json(UserResponse::from_user(&user)))
}

/// Login endpoint - POST /login
pub async fn login(
    State(state): State<AuthState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<UserResponse>), AuthError> {
    let Json(payload) = payload?;

    info!("🔐 Login attempt: {}", payload.email);

    let outcome = state
        .authenticator
        .login(&payload.email, &payload.password)
        .await?;

    let jar = jar.add(session_cookie(outcome.token, &state.cookie));

    Ok((jar, Json(UserResponse::from_user(&outcome.user))))
}

/// Logout endpoint - POST /logout
///
/// Resolves the session itself instead of sitting behind `require_session`:
/// an expired or revoked cookie still answers 401, but is deleted and
/// cleared on the way out.
pub async fn logout(
    State(state): State<AuthState>,
    jar: CookieJar,
) -> Result<(CookieJar, &'static str), (CookieJar, AuthError)> {
    let token = session_token(&jar).map(str::to_owned);
    let resolved = authenticate_request(&state.resolver, token.as_deref()).await;

    if let Some(token) = &token {
        if let Err(e) = state.authenticator.logout(token).await {
            warn!("Session delete failed during logout: {}", e);
        }
    }

    let jar = jar.remove(cleared_session_cookie(&state.cookie));
    match resolved {
        Ok(user) => {
            info!("👋 Logged out: {}", user.email);
            Ok((jar, "logged out"))
        }
        Err(e) => Err((jar, e)),
    }
}

/// Current user - GET /me (behind `require_session`)
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from_user(&user))
}
