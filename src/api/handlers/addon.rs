//! Stremio add-on endpoints: manifest, catalog and meta.
//!
//! Every route is also mounted under a leading `/{config}` segment that
//! carries the user's add-on configuration.

use std::collections::HashMap;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::Uri,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use crate::api::response::cached_json;
use crate::error::{AppError, AppResult};
use crate::models::{AddonConfig, ContentType, MetaResponse, MetasResponse};
use crate::services::CatalogExtra;
use crate::state::AppState;

pub fn addon_routes() -> Router<AppState> {
    Router::new()
        .route("/manifest.json", get(manifest))
        .route("/{config}/manifest.json", get(manifest_with_config))
        .route("/catalog/{type}/{id}", get(catalog))
        .route("/catalog/{type}/{id}/{extra}", get(catalog))
        .route("/{config}/catalog/{type}/{id}", get(catalog))
        .route("/{config}/catalog/{type}/{id}/{extra}", get(catalog))
        .route("/meta/{type}/{id}", get(meta))
        .route("/{config}/meta/{type}/{id}", get(meta))
}

/// `tmdb.top.json` to `tmdb.top`; anything without the suffix is not a route.
fn strip_json(segment: &str) -> AppResult<&str> {
    segment
        .strip_suffix(".json")
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::NotFound {
            entity: "route".into(),
            field: "path".into(),
            value: segment.to_string(),
        })
}

fn param<'a>(params: &'a HashMap<String, String>, name: &str) -> AppResult<&'a str> {
    params
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| AppError::BadRequest {
            message: format!("missing path parameter '{}'", name),
        })
}

#[derive(Debug, Default, Deserialize)]
struct ExtraParams {
    genre: Option<String>,
    skip: Option<String>,
    search: Option<String>,
}

/// The last path segment exactly as sent, before percent-decoding.
///
/// Path extractors hand out decoded values, which loses the difference
/// between a literal `&` and an encoded `%26` inside the extra segment.
fn raw_last_segment(uri: &Uri) -> &str {
    uri.path().rsplit('/').next().unwrap_or_default()
}

/// Parses a raw `genre=..&skip=..&search=..` segment (still percent-encoded).
fn parse_extra(raw: &str) -> AppResult<CatalogExtra> {
    let bad = |message: String| AppError::BadRequest { message };

    let uri: Uri = format!("/?{}", raw)
        .parse()
        .map_err(|e| bad(format!("invalid catalog extra: {}", e)))?;
    let Query(params) = Query::<ExtraParams>::try_from_uri(&uri)
        .map_err(|e| bad(format!("invalid catalog extra: {}", e)))?;

    let skip = match params.skip.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(skip) => Some(skip.parse::<u32>().map_err(|_| AppError::Validation {
            field: "skip".into(),
            reason: format!("'{}' is not a non-negative integer", skip),
        })?),
        None => None,
    };

    Ok(CatalogExtra {
        genre: params.genre.filter(|g| !g.is_empty()),
        skip,
        search: params.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
    })
}

async fn manifest_for(state: AppState, config: Option<&str>) -> AppResult<Response> {
    let config = AddonConfig::parse(config)?;
    Ok(state.services.addon.manifest(&config).await?.into_response())
}

pub async fn manifest(State(state): State<AppState>) -> AppResult<Response> {
    manifest_for(state, None).await
}

pub async fn manifest_with_config(
    State(state): State<AppState>,
    Path(config): Path<String>,
) -> AppResult<Response> {
    manifest_for(state, Some(config.as_str())).await
}

/// `GET [/{config}]/catalog/{type}/{id}[/{extra}].json`
pub async fn catalog(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    uri: Uri,
) -> AppResult<Response> {
    let config = AddonConfig::parse(params.get("config").map(String::as_str))?;
    let content_type: ContentType = param(&params, "type")?.parse()?;

    let (catalog_id, extra) = if params.contains_key("extra") {
        (
            param(&params, "id")?,
            parse_extra(strip_json(raw_last_segment(&uri))?)?,
        )
    } else {
        (strip_json(param(&params, "id")?)?, CatalogExtra::default())
    };

    let response = state
        .services
        .addon
        .catalog(&config, content_type, catalog_id, &extra)
        .await?;

    Ok(cached_json(
        MetasResponse {
            metas: response.body,
        },
        response.status,
        response.window,
    ))
}

/// `GET [/{config}]/meta/{type}/{id}.json`
pub async fn meta(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
) -> AppResult<Response> {
    let config = AddonConfig::parse(params.get("config").map(String::as_str))?;
    let content_type: ContentType = param(&params, "type")?.parse()?;
    let id = strip_json(param(&params, "id")?)?;

    let response = state.services.addon.meta(&config, content_type, id).await?;
    Ok(match response.body {
        Some(meta) => cached_json(MetaResponse { meta }, response.status, response.window),
        // unresolved ids answer an empty object
        None => cached_json(
            serde_json::json!({ "meta": {} }),
            response.status,
            response.window,
        ),
    })
}
