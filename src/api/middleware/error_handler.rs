//! Error handler for converting AppError to HTTP responses.
//!
//! This module implements the IntoResponse trait for AppError,
//! providing consistent error response formatting across the API,
//! and a middleware that stamps the request ID onto error bodies.

use axum::{
    Json,
    extract::Request,
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::RequestId;
use crate::api::dto::ErrorResponse;
use crate::error::AppError;

/// Maps an AppError variant to its corresponding HTTP status code.
///
/// Upstream failures keep a 404 from the provider; every other upstream
/// failure is a bad gateway.
pub fn error_to_status_code(error: &AppError) -> StatusCode {
    match error.root() {
        AppError::NotFound { .. } => StatusCode::NOT_FOUND,
        AppError::Validation { .. } | AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        AppError::Upstream {
            status: Some(404), ..
        } => StatusCode::NOT_FOUND,
        AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        AppError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        AppError::Cache(_) => StatusCode::SERVICE_UNAVAILABLE,
        AppError::Configuration { .. } | AppError::Internal { .. } | AppError::Shared(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Maps an AppError variant to its error code string.
pub fn error_to_code(error: &AppError) -> &'static str {
    match error.root() {
        AppError::NotFound { .. } => "NOT_FOUND",
        AppError::Validation { .. } => "VALIDATION_ERROR",
        AppError::BadRequest { .. } => "BAD_REQUEST",
        AppError::Upstream {
            status: Some(404), ..
        } => "NOT_FOUND",
        AppError::Upstream { .. } => "UPSTREAM_ERROR",
        AppError::Timeout { .. } => "GATEWAY_TIMEOUT",
        AppError::Cache(_) => "SERVICE_UNAVAILABLE",
        AppError::Configuration { .. } => "CONFIGURATION_ERROR",
        AppError::Internal { .. } | AppError::Shared(_) => "INTERNAL_ERROR",
    }
}

/// Builds the JSON body for an error. Internal details are not exposed.
pub fn error_to_body(error: &AppError) -> ErrorResponse {
    let code = error_to_code(error);
    match error.root() {
        AppError::NotFound {
            entity,
            field,
            value,
        } => ErrorResponse::not_found_error(entity, field, value),
        AppError::Validation { field, reason } => ErrorResponse::validation_error(field, reason),
        AppError::BadRequest { message } => ErrorResponse::new(code, message),
        AppError::Upstream {
            provider, status, ..
        } => ErrorResponse::new(code, &format!("Upstream provider {} request failed", provider))
            .with_details(json!({
                "provider": provider,
                "status": status,
            })),
        AppError::Timeout {
            operation,
            timeout_ms,
        } => ErrorResponse::new(code, &format!("Timed out: {}", operation)).with_details(json!({
            "timeout_ms": timeout_ms,
        })),
        AppError::Cache(_) => ErrorResponse::new(code, "Cache backend unavailable"),
        AppError::Configuration { key, .. } => {
            ErrorResponse::new(code, &format!("Configuration error: {}", key))
                .with_details(json!({ "key": key }))
        }
        AppError::Internal { .. } | AppError::Shared(_) => {
            ErrorResponse::new(code, "An internal error occurred")
        }
    }
}

/// Enhanced error response conversion that includes request ID when available.
pub fn error_to_response_with_request_id(error: &AppError, request_id: Option<&str>) -> Response {
    let status = error_to_status_code(error);
    let mut body = error_to_body(error);
    if let Some(id) = request_id {
        body = body.with_request_id(id);
    }

    if status.is_server_error() {
        tracing::error!(error = ?error, status = status.as_u16(), "Request failed");
    } else {
        tracing::debug!(error = %error, status = status.as_u16(), "Request rejected");
    }

    let mut response = (status, Json(body.clone())).into_response();
    response.extensions_mut().insert(body);
    response
}

impl IntoResponse for AppError {
    /// Converts an AppError into an HTTP response.
    ///
    /// The body is also stored in the response extensions so
    /// [`global_error_handler`] can add the request ID.
    fn into_response(self) -> Response {
        error_to_response_with_request_id(&self, None)
    }
}

fn fallback_code(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "BAD_REQUEST",
        StatusCode::NOT_FOUND => "NOT_FOUND",
        StatusCode::METHOD_NOT_ALLOWED => "METHOD_NOT_ALLOWED",
        StatusCode::REQUEST_TIMEOUT => "REQUEST_TIMEOUT",
        StatusCode::BAD_GATEWAY => "BAD_GATEWAY",
        StatusCode::SERVICE_UNAVAILABLE => "SERVICE_UNAVAILABLE",
        StatusCode::GATEWAY_TIMEOUT => "GATEWAY_TIMEOUT",
        s if s.is_server_error() => "INTERNAL_SERVER_ERROR",
        _ => "UNKNOWN_ERROR",
    }
}

fn fallback_message(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("An unknown error occurred")
}

/// Middleware that gives every error response the standard JSON shape.
///
/// Bodies produced from an [`AppError`] get the request ID added; plain-text
/// errors from extractors, fallbacks and timeouts are rewritten into an
/// [`ErrorResponse`].
pub async fn global_error_handler(request: Request, next: Next) -> Response {
    let request_id = request.extensions().get::<RequestId>().map(|r| r.0.clone());
    let response = next.run(request).await;
    let status = response.status();

    if !status.is_client_error() && !status.is_server_error() {
        return response;
    }

    if let Some(body) = response.extensions().get::<ErrorResponse>().cloned() {
        let (mut parts, _) = response.into_parts();
        let body = match request_id.as_deref() {
            Some(id) => body.with_request_id(id),
            None => body,
        };
        parts.headers.remove(header::CONTENT_LENGTH);
        let mut rebuilt = Json(body).into_response();
        *rebuilt.status_mut() = status;
        for (name, value) in parts.headers.iter() {
            rebuilt.headers_mut().insert(name.clone(), value.clone());
        }
        return rebuilt;
    }

    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"));
    if is_json {
        return response;
    }

    let (_parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(body, 64 * 1024).await.unwrap_or_default();
    let original = String::from_utf8_lossy(&bytes).trim().to_string();
    let message = if original.is_empty() {
        fallback_message(status).to_string()
    } else {
        original
    };

    let mut body = ErrorResponse::new(fallback_code(status), &message);
    if let Some(id) = request_id.as_deref() {
        body = body.with_request_id(id);
    }
    (status, Json(body)).into_response()
}
