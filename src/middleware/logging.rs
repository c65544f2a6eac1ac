//! Request logging middleware.
//!
//! One line per request with method, path, status and latency. Auth failures
//! (401/403) are logged at INFO, server errors at WARN.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{info, warn, Instrument};

pub async fn request_logging(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    // Health checks would drown everything else
    if path.ends_with("/health") {
        return next.run(request).await;
    }

    let span = tracing::info_span!("http_request", method = %method, path = %path);
    let start = Instant::now();

    let response = next.run(request).instrument(span).await;

    let latency_ms = start.elapsed().as_millis();
    let status = response.status();

    match status {
        s if s.is_server_error() => warn!(
            method = %method,
            path = %path,
            status = s.as_u16(),
            latency_ms,
            "Request failed (5xx)"
        ),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => info!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            latency_ms,
            "Request rejected by auth gate"
        ),
        _ => info!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            latency_ms,
            "Request completed"
        ),
    }

    response
}
