//! JSON responses carrying cache headers.

use axum::{
    Json,
    http::{HeaderName, HeaderValue, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::cache::{CacheStatus, FreshnessWindow};
use crate::services::AddonResponse;

/// Header reporting where a cached payload came from.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Serializes `body` as JSON with `Cache-Control` derived from `window` and
/// `x-cache` from `status`; headers are omitted when their source is absent.
pub fn cached_json<T: Serialize>(
    body: T,
    status: Option<CacheStatus>,
    window: Option<FreshnessWindow>,
) -> Response {
    let mut response = Json(body).into_response();
    let headers = response.headers_mut();

    if let Some(value) = window
        .and_then(|w| w.cache_control_header())
        .and_then(|v| HeaderValue::from_str(&v).ok())
    {
        headers.insert(header::CACHE_CONTROL, value);
    }
    if let Some(status) = status {
        headers.insert(X_CACHE, HeaderValue::from_static(status.as_str()));
    }
    response
}

impl<T: Serialize> IntoResponse for AddonResponse<T> {
    fn into_response(self) -> Response {
        cached_json(self.body, self.status, self.window)
    }
}
