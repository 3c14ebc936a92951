//! Health check endpoint handlers.
//!
//! Health checks probe the response cache store directly; the upstream
//! provider is not called.

use std::collections::HashMap;
use std::time::Instant;

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};

use crate::api::dto::{ComponentHealth, HealthResponse, HealthStatus};
use crate::state::AppState;

/// Creates health check routes.
///
/// # Routes
/// - `GET /health` - Basic health check
/// - `GET /health/ready` - Readiness probe
/// - `GET /health/live` - Liveness probe
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check))
        .route("/health/live", get(liveness_check))
}

/// Basic health check endpoint.
///
/// # Responses
/// - `200 OK` - Service is healthy
/// - `503 Service Unavailable` - Cache store unreachable
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let cache = check_cache(&state).await;
    let status = cache.status;

    let mut checks = HashMap::new();
    checks.insert("cache".to_string(), cache);

    let response = HealthResponse {
        status,
        version: crate::pkg_version().to_string(),
        timestamp: jiff::Timestamp::now().to_string(),
        checks,
    };

    let code = match status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(response))
}

/// Readiness probe endpoint.
pub async fn readiness_check(State(state): State<AppState>) -> StatusCode {
    match check_cache(&state).await.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Liveness probe endpoint. Does not touch dependencies.
pub async fn liveness_check() -> StatusCode {
    StatusCode::OK
}

async fn check_cache(state: &AppState) -> ComponentHealth {
    let start_time = Instant::now();
    let backend = state.cache.backend();

    match state.cache.probe().await {
        Ok(()) => ComponentHealth {
            status: HealthStatus::Healthy,
            message: Some(format!("{} store reachable", backend)),
            response_time_ms: Some(start_time.elapsed().as_millis() as u64),
        },
        Err(e) => {
            tracing::warn!(backend, error = %e, "Cache health probe failed");
            ComponentHealth {
                status: HealthStatus::Unhealthy,
                message: Some(format!("{} store failed: {}", backend, e)),
                response_time_ms: Some(start_time.elapsed().as_millis() as u64),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_liveness_check() {
        assert_eq!(liveness_check().await, StatusCode::OK);
    }
}
