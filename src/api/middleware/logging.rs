//! Logging middleware for request/response tracing.

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::{Instrument, Level, info, span, warn};

use super::RequestId;

/// Middleware that logs request and response information.
///
/// Logs method, path and request ID on arrival; status, cache outcome
/// (`x-cache`) and duration once the response is ready. The add-on
/// configuration segment can carry keys, so only the route shape after it
/// is logged at info level.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = loggable_path(request.uri().path());
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_else(|| "unknown".to_string());

    let span = span!(
        Level::INFO,
        "http_request",
        method = %method,
        path = %path,
        request_id = %request_id
    );

    async move {
        info!("Request received");

        let start = Instant::now();
        let response = next.run(request).await;
        let duration_ms = start.elapsed().as_millis() as u64;
        let status = response.status().as_u16();
        let cache = response
            .headers()
            .get("x-cache")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();

        if response.status().is_server_error() {
            warn!(status, cache = %cache, duration_ms, "Response sent");
        } else {
            info!(status, cache = %cache, duration_ms, "Response sent");
        }
        response
    }
    .instrument(span)
    .await
}

/// Drops a leading configuration segment from add-on routes.
fn loggable_path(path: &str) -> String {
    const ROUTES: [&str; 6] = [
        "manifest.json",
        "catalog",
        "meta",
        "request_token",
        "session_id",
        "health",
    ];
    let trimmed = path.trim_start_matches('/');
    match trimmed.split_once('/') {
        Some((first, rest))
            if !ROUTES.iter().any(|r| *r == first)
                && ROUTES.iter().any(|r| rest.starts_with(r)) =>
        {
            format!("/{{config}}/{}", rest)
        }
        _ => path.to_string(),
    }
}
