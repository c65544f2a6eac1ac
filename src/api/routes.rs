use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::stream;
use crate::auth::{api as auth_api, require_role, require_session, AuthState, RoleGate, UserRole};
use crate::middleware::request_logging;

/// Create the API router.
///
/// Every route is served both at the root and under `/api`.
pub fn create_router(auth_state: AuthState, allowed_origin: &str) -> Result<Router> {
    let routes = app_routes(auth_state);

    Ok(Router::new()
        .merge(routes.clone())
        .nest("/api", routes)
        .layer(middleware::from_fn(request_logging))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed_origin)?))
}

fn app_routes(auth_state: AuthState) -> Router {
    // Public routes; logout checks its own session so it can clear stale cookies
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/register", post(auth_api::register))
        .route("/login", post(auth_api::login))
        .route("/logout", post(auth_api::logout))
        .with_state(auth_state.clone());

    // Any logged-in user
    let session_routes = Router::new()
        .route("/me", get(auth_api::me))
        .route_layer(middleware::from_fn_with_state(
            auth_state.clone(),
            require_session,
        ))
        .with_state(auth_state.clone());

    // Players only
    let player_routes = Router::new()
        .route("/start-stream", post(stream::start_stream))
        .route_layer(middleware::from_fn_with_state(
            RoleGate::new(auth_state, UserRole::Player),
            require_role,
        ));

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .merge(player_routes)
}

/// Credentialed CORS for exactly one trusted origin
fn cors_layer(allowed_origin: &str) -> Result<CorsLayer> {
    let origin = HeaderValue::from_str(allowed_origin)
        .with_context(|| format!("Invalid ALLOWED_ORIGIN: {}", allowed_origin))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    concat!("streamapp-backend ", env!("CARGO_PKG_VERSION"), " ok")
}
