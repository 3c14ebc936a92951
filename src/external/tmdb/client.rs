use std::time::Duration;

use async_trait::async_trait;
use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::mapping::{self, Images};
use super::types::{
    TmdbAccount, TmdbDetails, TmdbEpisode, TmdbFindResult, TmdbGenres, TmdbListItem, TmdbPage,
    TmdbSeason, TmdbStatus,
};
use crate::config::TmdbConfig;
use crate::error::{AppError, AppResult};
use crate::external::client::HTTP_CLIENT;
use crate::external::provider::{
    CatalogRequest, MetadataProvider, PersonalList, RequestToken, SessionId, TrendingWindow,
};
use crate::models::{CATALOG_LANGUAGE, CATALOG_YEAR, ContentType, Genre, Meta, MetaPreview};

const PROVIDER: &str = "tmdb";

/// TMDB v3 API client.
#[derive(Debug, Clone)]
pub struct TmdbClient {
    api_key: String,
    base_url: String,
    image_base_url: String,
    timeout: Duration,
}

impl TmdbClient {
    pub fn new(config: &TmdbConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            image_base_url: config.image_base_url.clone(),
            timeout: Duration::from_secs(config.request_timeout),
        }
    }

    fn make_error(
        message: impl Into<String>,
        status: Option<u16>,
        source: Option<anyhow::Error>,
    ) -> AppError {
        AppError::Upstream {
            provider: PROVIDER.into(),
            message: message.into(),
            status,
            source,
        }
    }

    fn images(&self) -> Images<'_> {
        Images::new(&self.image_base_url)
    }

    fn url(&self, operation: &str, path: &str, params: &[(&str, String)]) -> AppResult<reqwest::Url> {
        let query = std::iter::once(("api_key", self.api_key.as_str()))
            .chain(params.iter().map(|(k, v)| (*k, v.as_str())));
        reqwest::Url::parse_with_params(&format!("{}{}", self.base_url, path), query).map_err(
            |e| Self::make_error(format!("{operation} invalid URL: {e}"), None, Some(e.into())),
        )
    }

    fn request_error(&self, operation: &str, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            return AppError::Timeout {
                operation: format!("{PROVIDER} {operation}"),
                timeout_ms: self.timeout.as_millis() as u64,
            };
        }
        Self::make_error(
            format!("{operation} request failed: {e}"),
            e.status().map(|s| s.as_u16()),
            Some(e.into()),
        )
    }

    async fn send<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: reqwest::RequestBuilder,
    ) -> AppResult<T> {
        let resp = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.request_error(operation, e))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp
                .json::<TmdbStatus>()
                .await
                .ok()
                .and_then(|s| s.status_message)
                .unwrap_or_else(|| status.to_string());
            return Err(Self::make_error(
                format!("{operation} HTTP {}: {detail}", status.as_u16()),
                Some(status.as_u16()),
                None,
            ));
        }

        resp.json::<T>().await.map_err(|e| {
            Self::make_error(format!("{operation} invalid JSON: {e}"), None, Some(e.into()))
        })
    }

    #[instrument(skip(self, params), fields(provider = PROVIDER))]
    async fn get<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        params: &[(&str, String)],
    ) -> AppResult<T> {
        let url = self.url(operation, path, params)?;
        debug!("GET {}", path);
        self.send(operation, HTTP_CLIENT.get(url)).await
    }

    async fn list(
        &self,
        operation: &str,
        content_type: ContentType,
        language: &str,
        path: &str,
        params: &[(&str, String)],
    ) -> AppResult<Vec<MetaPreview>> {
        let (page, genres) = futures::try_join!(
            self.get::<TmdbPage<TmdbListItem>>(operation, path, params),
            self.genres(content_type, language),
        )?;
        let images = self.images();
        Ok(page
            .results
            .into_iter()
            .map(|item| mapping::preview(content_type, item, &genres, &images))
            .collect())
    }

    async fn episodes(
        &self,
        tmdb_id: u64,
        language: &str,
        details: &TmdbDetails,
    ) -> AppResult<Vec<TmdbEpisode>> {
        let seasons = try_join_all(details.seasons.iter().map(|season| async move {
            let path = format!("/tv/{}/season/{}", tmdb_id, season.season_number);
            let params = [("language", language.to_string())];
            self.get::<TmdbSeason>("season", &path, &params).await
        }))
        .await?;
        Ok(seasons.into_iter().flat_map(|s| s.episodes).collect())
    }
}

fn year_param(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Movie => "primary_release_year",
        ContentType::Series => "first_air_date_year",
    }
}

fn account_list_path(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Movie => "movies",
        ContentType::Series => "tv",
    }
}

#[async_trait]
impl MetadataProvider for TmdbClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn catalog(&self, request: &CatalogRequest) -> AppResult<Vec<MetaPreview>> {
        let content_type = request.content_type;
        let mut params = vec![
            ("language", request.language.clone()),
            ("page", request.page.to_string()),
            ("include_adult", request.include_adult.to_string()),
            ("sort_by", "popularity.desc".to_string()),
        ];

        if let Some(genre) = request.genre.as_deref() {
            match request.catalog_id.as_str() {
                CATALOG_YEAR => params.push((year_param(content_type), genre.to_string())),
                CATALOG_LANGUAGE => params.push(("with_original_language", genre.to_string())),
                _ => {
                    let genres = self.genres(content_type, &request.language).await?;
                    let id = genres
                        .iter()
                        .find(|g| g.name.eq_ignore_ascii_case(genre))
                        .map(|g| g.id)
                        .ok_or_else(|| AppError::Validation {
                            field: "genre".into(),
                            reason: format!("unknown genre '{genre}'"),
                        })?;
                    params.push(("with_genres", id.to_string()));
                }
            }
        }

        self.list(
            "discover",
            content_type,
            &request.language,
            &format!("/discover/{}", content_type.tmdb_path()),
            &params,
        )
        .await
    }

    async fn trending(
        &self,
        content_type: ContentType,
        language: &str,
        page: u32,
        window: TrendingWindow,
    ) -> AppResult<Vec<MetaPreview>> {
        self.list(
            "trending",
            content_type,
            language,
            &format!("/trending/{}/{}", content_type.tmdb_path(), window.as_str()),
            &[("language", language.to_string()), ("page", page.to_string())],
        )
        .await
    }

    async fn search(
        &self,
        content_type: ContentType,
        language: &str,
        query: &str,
        include_adult: bool,
    ) -> AppResult<Vec<MetaPreview>> {
        self.list(
            "search",
            content_type,
            language,
            &format!("/search/{}", content_type.tmdb_path()),
            &[
                ("language", language.to_string()),
                ("query", query.to_string()),
                ("include_adult", include_adult.to_string()),
            ],
        )
        .await
    }

    async fn personal_list(
        &self,
        list: PersonalList,
        content_type: ContentType,
        language: &str,
        page: u32,
        session_id: &str,
    ) -> AppResult<Vec<MetaPreview>> {
        let account: TmdbAccount = self
            .get("account", "/account", &[("session_id", session_id.to_string())])
            .await?;

        self.list(
            list.as_str(),
            content_type,
            language,
            &format!(
                "/account/{}/{}/{}",
                account.id,
                list.as_str(),
                account_list_path(content_type)
            ),
            &[
                ("session_id", session_id.to_string()),
                ("language", language.to_string()),
                ("page", page.to_string()),
                ("sort_by", "created_at.desc".to_string()),
            ],
        )
        .await
    }

    async fn genres(&self, content_type: ContentType, language: &str) -> AppResult<Vec<Genre>> {
        let genres: TmdbGenres = self
            .get(
                "genres",
                &format!("/genre/{}/list", content_type.tmdb_path()),
                &[("language", language.to_string())],
            )
            .await?;
        Ok(genres.genres)
    }

    async fn meta(&self, content_type: ContentType, language: &str, tmdb_id: u64) -> AppResult<Meta> {
        let details: TmdbDetails = self
            .get(
                "meta",
                &format!("/{}/{}", content_type.tmdb_path(), tmdb_id),
                &[
                    ("language", language.to_string()),
                    ("append_to_response", "credits,external_ids".to_string()),
                ],
            )
            .await?;

        let episodes = match content_type {
            ContentType::Movie => Vec::new(),
            ContentType::Series => self.episodes(tmdb_id, language, &details).await?,
        };

        Ok(mapping::meta(content_type, details, episodes, &self.images()))
    }

    async fn find_by_imdb(&self, content_type: ContentType, imdb_id: &str) -> AppResult<Option<u64>> {
        let found: TmdbFindResult = self
            .get(
                "find",
                &format!("/find/{imdb_id}"),
                &[("external_source", "imdb_id".to_string())],
            )
            .await?;

        let rows = match content_type {
            ContentType::Movie => found.movie_results,
            ContentType::Series => found.tv_results,
        };
        Ok(rows.first().map(|row| row.id))
    }

    async fn request_token(&self) -> AppResult<RequestToken> {
        self.get("request_token", "/authentication/token/new", &[])
            .await
    }

    async fn session_id(&self, request_token: &str) -> AppResult<SessionId> {
        let operation = "session_id";
        let url = self.url(operation, "/authentication/session/new", &[])?;
        let body = serde_json::json!({ "request_token": request_token });
        self.send(operation, HTTP_CLIENT.post(url).json(&body)).await
    }
}
