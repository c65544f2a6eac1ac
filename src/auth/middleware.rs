//! Authentication Middleware
//! Mission: Gate routes on a live session cookie and, optionally, a role

use crate::auth::{
    api::AuthState,
    errors::AuthError,
    models::{User, UserRole},
    resolver::SessionResolver,
};
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

/// Cookie carrying the session token
pub const SESSION_COOKIE_NAME: &str = "session_id";

/// Session token presented in the request cookies, if any
pub fn session_token(jar: &CookieJar) -> Option<&str> {
    jar.get(SESSION_COOKIE_NAME)
        .map(|c| c.value())
        .filter(|v| !v.is_empty())
}

/// Unauthenticated -> Authenticated
pub fn authenticate(resolver: &SessionResolver, token: Option<&str>) -> Result<User, AuthError> {
    let token = token.ok_or(AuthError::Unauthenticated)?;
    resolver.resolve(token)
}

/// [`authenticate`] on the blocking pool, since resolving reads SQLite
pub async fn authenticate_request(
    resolver: &SessionResolver,
    token: Option<&str>,
) -> Result<User, AuthError> {
    let resolver = resolver.clone();
    let token = token.map(str::to_owned);

    tokio::task::spawn_blocking(move || authenticate(&resolver, token.as_deref())).await?
}

/// Authenticated -> Authorized | Forbidden
pub fn authorize(user: User, required: UserRole) -> Result<User, AuthError> {
    if user.role == required {
        Ok(user)
    } else {
        debug!(
            "User {} with role {} denied ({} required)",
            user.id, user.role, required
        );
        Err(AuthError::Forbidden)
    }
}

/// Requires a valid session; the resolved `User` lands in request extensions.
pub async fn require_session(
    State(state): State<AuthState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = authenticate_request(&state.resolver, session_token(&jar)).await?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// State for [`require_role`]: the auth services plus the role to demand
#[derive(Clone)]
pub struct RoleGate {
    pub auth: AuthState,
    pub role: UserRole,
}

impl RoleGate {
    pub fn new(auth: AuthState, role: UserRole) -> Self {
        Self { auth, role }
    }
}

/// Requires a valid session whose user holds `gate.role`.
pub async fn require_role(
    State(gate): State<RoleGate>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = authenticate_request(&gate.auth.resolver, session_token(&jar)).await?;
    let user = authorize(user, gate.role)?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// The user resolved by one of the gates above
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<User>()
            .cloned()
            .map(CurrentUser)
            .ok_or(AuthError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        db::AuthDb, session_store::SessionStore, user_store::UserStore,
    };
    use axum::{
        body::Body,
        http::{header, Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    fn test_user(role: UserRole) -> User {
        User {
            id: 7,
            username: "testuser".to_string(),
            email: "t@x.com".to_string(),
            role,
        }
    }

    #[test]
    fn test_authorize() {
        assert!(authorize(test_user(UserRole::Player), UserRole::Player).is_ok());
        assert!(matches!(
            authorize(test_user(UserRole::Watcher), UserRole::Player),
            Err(AuthError::Forbidden)
        ));
    }

    #[test]
    fn test_authenticate_without_token() {
        let db = AuthDb::in_memory().unwrap();
        let resolver =
            SessionResolver::new(SessionStore::new(db.clone()), UserStore::with_cost(db, 4));
        assert!(matches!(
            authenticate(&resolver, None),
            Err(AuthError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_authenticate_request_resolves_off_the_runtime() {
        let state = AuthState::for_tests();
        let user = UserStore::with_cost(state.db.clone(), 4)
            .create_user("alice", "a@x.com", "pw", UserRole::Player)
            .unwrap();
        let token = SessionStore::new(state.db.clone()).create(user.id).unwrap().id;

        assert_eq!(
            authenticate_request(&state.resolver, Some(&token)).await.unwrap(),
            user
        );
        assert!(matches!(
            authenticate_request(&state.resolver, Some("bogus")).await,
            Err(AuthError::Unauthenticated)
        ));
        assert!(matches!(
            authenticate_request(&state.resolver, None).await,
            Err(AuthError::Unauthenticated)
        ));
    }

    #[test]
    fn test_session_token_ignores_empty_cookie() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(header::COOKIE, "session_id=".parse().unwrap());
        let jar = CookieJar::from_headers(&headers);
        assert!(session_token(&jar).is_none());

        headers.insert(header::COOKIE, "other=1; session_id=abc".parse().unwrap());
        let jar = CookieJar::from_headers(&headers);
        assert_eq!(session_token(&jar), Some("abc"));
    }

    async fn whoami(CurrentUser(user): CurrentUser) -> String {
        user.username
    }

    fn gated_router(state: AuthState) -> Router {
        let player_gate = RoleGate::new(state.clone(), UserRole::Player);
        Router::new()
            .route("/who", get(whoami))
            .route_layer(middleware::from_fn_with_state(state, require_session))
            .merge(
                Router::new()
                    .route("/play", get(whoami))
                    .route_layer(middleware::from_fn_with_state(player_gate, require_role)),
            )
    }

    fn get_with_cookie(uri: &str, token: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::COOKIE, format!("{SESSION_COOKIE_NAME}={token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_gates_block_and_admit() {
        let state = AuthState::for_tests();
        let users = UserStore::with_cost(state.db.clone(), 4);
        let sessions = SessionStore::new(state.db.clone());

        let watcher = users
            .create_user("wendy", "w@x.com", "pw", UserRole::Watcher)
            .unwrap();
        let player = users
            .create_user("pat", "p@x.com", "pw", UserRole::Player)
            .unwrap();
        let watcher_token = sessions.create(watcher.id).unwrap().id;
        let player_token = sessions.create(player.id).unwrap().id;

        let app = gated_router(state);

        let res = app.clone().oneshot(get_with_cookie("/who", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = app
            .clone()
            .oneshot(get_with_cookie("/who", Some(&watcher_token)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let res = app
            .clone()
            .oneshot(get_with_cookie("/play", Some(&watcher_token)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = app
            .clone()
            .oneshot(get_with_cookie("/play", Some("bogus")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = app
            .oneshot(get_with_cookie("/play", Some(&player_token)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
