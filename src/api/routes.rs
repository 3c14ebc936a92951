//! Router configuration for the add-on.
//!
//! This module provides centralized route registration and middleware
//! configuration for the application.

use std::path::Path;

use axum::{
    Router,
    http::{Method, header},
    middleware,
    response::Redirect,
    routing::get,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};

use crate::api::handlers;
use crate::api::middleware::{global_error_handler, logging_middleware, request_id_middleware};
use crate::error::AppError;
use crate::state::AppState;

/// Any origin may call the add-on; Stremio clients run on many hosts.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .expose_headers([header::CACHE_CONTROL])
}

async fn not_found() -> AppError {
    AppError::NotFound {
        entity: "route".into(),
        field: "path".into(),
        value: "unknown".into(),
    }
}

/// Creates the main application router with all routes and middleware.
///
/// # Middleware Order
/// Middleware is applied in reverse order of declaration (last added runs first):
/// 1. CORS
/// 2. Request ID - generates/propagates request IDs
/// 3. Logging - logs requests with request IDs
/// 4. Error handler - gives error responses the JSON shape and request ID
///
/// # Routes
/// - `/[{config}/]manifest.json`, `/[{config}/]catalog/..`, `/[{config}/]meta/..`
/// - `/request_token`, `/session_id`
/// - `/health`, `/health/ready`, `/health/live`
/// - `/` redirects to `/configure`, which serves the configuration page
pub fn create_router(state: AppState, configure_dir: &Path) -> Router {
    let configure = ServeDir::new(configure_dir)
        .fallback(ServeFile::new(configure_dir.join("index.html")));
    let assets = ServeDir::new(configure_dir.join("assets"));

    Router::new()
        .route("/", get(|| async { Redirect::to("/configure") }))
        .merge(handlers::addon::addon_routes())
        .merge(handlers::session::session_routes())
        .merge(handlers::health::health_routes())
        .nest_service("/configure", configure)
        .nest_service("/assets", assets)
        .fallback(not_found)
        .layer(middleware::from_fn(global_error_handler))
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors_layer())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::services::Services;
    use crate::services::test_support::{Fixture, fixture};

    fn app(f: &Fixture, configure_dir: &Path) -> Router {
        create_router(
            AppState::new(Services::new(f.service.clone())),
            configure_dir,
        )
    }

    async fn get(router: Router, uri: &str) -> Response {
        router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn header<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
        response.headers().get(name).and_then(|v| v.to_str().ok())
    }

    #[tokio::test]
    async fn test_manifest_route_with_headers() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let response = get(app(&f, dir.path()), "/manifest.json").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            header(&response, "cache-control"),
            Some("max-age=43200, stale-while-revalidate=1209600, stale-if-error=2592000, public")
        );
        assert_eq!(header(&response, "x-cache"), Some("miss"));
        assert!(header(&response, "x-request-id").is_some());
        let body = json(response).await;
        assert_eq!(body["id"], "org.tmdb-addon");
    }

    #[tokio::test]
    async fn test_manifest_with_config_segment() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let response = get(app(&f, dir.path()), "/language=fr-FR%7Csession_id=abc/manifest.json").await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        let ids: Vec<&str> = body["catalogs"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|c| c["id"].as_str())
            .collect();
        assert!(ids.contains(&"tmdb.favorites"));
    }

    #[tokio::test]
    async fn test_catalog_route() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let router = app(&f, dir.path());

        let response = get(router.clone(), "/catalog/movie/tmdb.top.json").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            header(&response, "cache-control"),
            Some("max-age=86400, stale-while-revalidate=604800, stale-if-error=1209600, public")
        );
        let body = json(response).await;
        assert_eq!(body["metas"][0]["id"], "tmdb:100");

        let response = get(router, "/catalog/movie/tmdb.top/skip=20.json").await;
        assert_eq!(header(&response, "x-cache"), Some("miss"));
        let body = json(response).await;
        assert_eq!(body["metas"][0]["id"], "tmdb:200");
    }

    #[tokio::test]
    async fn test_catalog_search_with_config() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let response = get(
            app(&f, dir.path()),
            "/rpdbkey=k/catalog/series/tmdb.top/search=breaking%20bad.json",
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["metas"][0]["id"], "tmdb:42");
        assert_eq!(body["metas"][0]["poster"], "rpdb/k/series-42.jpg");
        assert_eq!(f.provider.calls("search"), 1);
        assert_eq!(f.posters.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            f.provider.last_query.lock().unwrap().as_deref(),
            Some("breaking bad")
        );
    }

    #[tokio::test]
    async fn test_catalog_search_with_encoded_space() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let response = get(
            app(&f, dir.path()),
            "/catalog/series/tmdb.top/search=breaking%20bad.json",
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["metas"][0]["id"], "tmdb:42");
        assert_eq!(
            f.provider.last_query.lock().unwrap().as_deref(),
            Some("breaking bad")
        );
    }

    #[tokio::test]
    async fn test_catalog_search_with_encoded_ampersand() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let response = get(
            app(&f, dir.path()),
            "/catalog/movie/tmdb.top/search=tom%20%26%20jerry.json",
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            f.provider.last_query.lock().unwrap().as_deref(),
            Some("tom & jerry")
        );
    }

    #[tokio::test]
    async fn test_catalog_genre_with_encoded_space() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let response = get(
            app(&f, dir.path()),
            "/catalog/movie/tmdb.top/genre=Science%20Fiction.json",
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["metas"][0]["id"], "tmdb:100");
        assert_eq!(f.provider.calls("catalog"), 1);
        assert_eq!(
            f.provider.last_genre.lock().unwrap().as_deref(),
            Some("Science Fiction")
        );
    }

    #[tokio::test]
    async fn test_meta_route() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let response = get(app(&f, dir.path()), "/meta/movie/tmdb:27205.json").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            header(&response, "cache-control"),
            Some("max-age=1209600, stale-while-revalidate=1728000, stale-if-error=2592000, public")
        );
        let body = json(response).await;
        assert_eq!(body["meta"]["id"], "tmdb:27205");
        assert_eq!(body["meta"]["type"], "movie");
    }

    #[tokio::test]
    async fn test_unresolved_imdb_meta_is_empty_without_cache_header() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let response = get(app(&f, dir.path()), "/meta/movie/tt0000001.json").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(header(&response, "cache-control").is_none());
        assert_eq!(json(response).await, serde_json::json!({"meta": {}}));
    }

    #[tokio::test]
    async fn test_upstream_failure_is_bad_gateway() {
        let f = fixture();
        f.provider.fail.store(1, Ordering::SeqCst);
        let dir = tempfile::tempdir().unwrap();
        let response = get(app(&f, dir.path()), "/meta/movie/tmdb:1.json").await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let request_id = header(&response, "x-request-id").map(str::to_string);
        let body = json(response).await;
        assert_eq!(body["code"], "UPSTREAM_ERROR");
        assert_eq!(body["request_id"].as_str(), request_id.as_deref());
    }

    #[tokio::test]
    async fn test_invalid_type_is_bad_request() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let response = get(app(&f, dir.path()), "/meta/anime/tmdb:1.json").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(response).await["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_not_found() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let response = get(app(&f, dir.path()), "/nothing/here/at/all/really").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(response).await["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_session_routes() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let router = app(&f, dir.path());

        let response = get(router.clone(), "/request_token").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(header(&response, "cache-control").is_none());
        assert_eq!(json(response).await["request_token"], "token");

        let response = get(router.clone(), "/session_id?request_token=token").await;
        assert_eq!(json(response).await["session_id"], "session-for-token");

        let response = get(router, "/session_id").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_root_redirects_to_configure() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let response = get(app(&f, dir.path()), "/").await;
        assert!(response.status().is_redirection());
        assert_eq!(header(&response, "location"), Some("/configure"));
    }

    #[tokio::test]
    async fn test_configure_serves_index_fallback() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>configure</html>").unwrap();

        let response = get(app(&f, dir.path()), "/configure/some/client/route").await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"<html>configure</html>");
    }

    #[tokio::test]
    async fn test_cors_headers() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let response = app(&f, dir.path())
            .oneshot(
                Request::builder()
                    .uri("/manifest.json")
                    .header("origin", "https://web.stremio.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(header(&response, "access-control-allow-origin"), Some("*"));
    }

    #[tokio::test]
    async fn test_health_reports_cache_backend() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let response = get(app(&f, dir.path()), "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["checks"]["cache"]["status"], "healthy");
    }
}
