//! Add-on operations: manifest, catalogs, meta and the TMDB session flow.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, instrument};

use crate::cache::{CacheKey, CacheManager, CachePolicies, CacheStatus, Cached, FreshnessWindow};
use crate::error::{AppError, AppResult};
use crate::external::{
    CatalogRequest, MetadataProvider, PersonalList, PosterProvider, RequestToken, SessionId,
    TrendingWindow,
};
use crate::models::{
    AddonConfig, CATALOG_FAVORITES, CATALOG_LANGUAGE, CATALOG_POPULAR, CATALOG_TRENDING,
    CATALOG_WATCHLIST, CATALOG_YEAR, ContentType, Genre, Manifest, ManifestInput, Meta, MetaId,
    MetaPreview,
};

/// Catalog page size used by Stremio's `skip` extra.
pub const PAGE_SIZE: u32 = 20;

/// A payload plus what the route layer needs for its cache headers.
///
/// `status` is `None` when the payload bypassed the cache; `window` is `None`
/// when the response must not carry a `Cache-Control` header.
#[derive(Debug, Clone, PartialEq)]
pub struct AddonResponse<T> {
    pub body: T,
    pub status: Option<CacheStatus>,
    pub window: Option<FreshnessWindow>,
}

impl<T> AddonResponse<T> {
    fn cached(cached: Cached<T>, window: FreshnessWindow) -> Self {
        Self {
            body: cached.value,
            status: Some(cached.status),
            window: Some(window),
        }
    }

    fn uncached(body: T, window: Option<FreshnessWindow>) -> Self {
        Self {
            body,
            status: None,
            window,
        }
    }
}

/// `genre`, `skip` and `search` from the catalog extra segment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogExtra {
    pub genre: Option<String>,
    pub skip: Option<u32>,
    pub search: Option<String>,
}

impl CatalogExtra {
    /// Page number for TMDB, 1-based.
    pub fn page(&self) -> u32 {
        self.skip.map_or(1, |skip| skip / PAGE_SIZE + 1)
    }
}

/// The first status that is not a plain hit.
fn combined_status(a: CacheStatus, b: CacheStatus) -> CacheStatus {
    if a == CacheStatus::Hit { b } else { a }
}

#[derive(Clone)]
pub struct AddonService {
    provider: Arc<dyn MetadataProvider>,
    posters: Arc<dyn PosterProvider>,
    cache: CacheManager,
    policies: CachePolicies,
    default_language: String,
}

impl AddonService {
    pub fn new(
        provider: Arc<dyn MetadataProvider>,
        posters: Arc<dyn PosterProvider>,
        cache: CacheManager,
        policies: CachePolicies,
        default_language: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            posters,
            cache,
            policies,
            default_language: default_language.into(),
        }
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    fn language<'a>(&'a self, config: &'a AddonConfig) -> &'a str {
        config.language_or(&self.default_language)
    }

    async fn cached_genres(
        &self,
        content_type: ContentType,
        language: &str,
    ) -> AppResult<Cached<Vec<Genre>>> {
        let key = CacheKey::from_parts(["genres", language, content_type.as_str()]);
        let provider = self.provider.clone();
        let language = language.to_string();
        self.cache
            .wrap_with_window(key.as_str(), self.policies.manifest, move || async move {
                provider.genres(content_type, &language).await
            })
            .await
    }

    /// Manifest with genre options for both content types.
    #[instrument(skip(self, config))]
    pub async fn manifest(&self, config: &AddonConfig) -> AppResult<AddonResponse<Manifest>> {
        let language = self.language(config);
        let (movie, series) = futures::try_join!(
            self.cached_genres(ContentType::Movie, language),
            self.cached_genres(ContentType::Series, language),
        )?;

        let input = ManifestInput {
            version: crate::pkg_version().to_string(),
            movie_genres: movie.value.into_iter().map(|g| g.name).collect(),
            series_genres: series.value.into_iter().map(|g| g.name).collect(),
            current_year: jiff::Zoned::now().year(),
            has_session: config.session_id.is_some(),
        };

        Ok(AddonResponse {
            body: Manifest::build(&input),
            status: Some(combined_status(movie.status, series.status)),
            window: Some(self.policies.manifest),
        })
    }

    /// One catalog page. Personal lists are read through on every call.
    #[instrument(skip(self, config, extra), fields(page = extra.page()))]
    pub async fn catalog(
        &self,
        config: &AddonConfig,
        content_type: ContentType,
        catalog_id: &str,
        extra: &CatalogExtra,
    ) -> AppResult<AddonResponse<Vec<MetaPreview>>> {
        let language = self.language(config).to_string();
        let page = extra.page();
        let window = self.policies.catalog;
        let provider = self.provider.clone();

        let mut response = if let Some(query) = extra.search.clone() {
            let adult = config.include_adult;
            let key = CacheKey::from_parts([
                "search",
                language.as_str(),
                content_type.as_str(),
                adult.to_string().as_str(),
                query.as_str(),
            ]);
            let lang = language.clone();
            let cached = self
                .cache
                .wrap_with_window(key.as_str(), window, move || async move {
                    provider.search(content_type, &lang, &query, adult).await
                })
                .await?;
            AddonResponse::cached(cached, window)
        } else {
            match catalog_id {
                CATALOG_TRENDING => {
                    let trend = TrendingWindow::from_genre(extra.genre.as_deref());
                    let key = CacheKey::from_parts([
                        "trending",
                        language.as_str(),
                        content_type.as_str(),
                        trend.as_str(),
                        page.to_string().as_str(),
                    ]);
                    let lang = language.clone();
                    let cached = self
                        .cache
                        .wrap_with_window(key.as_str(), window, move || async move {
                            provider.trending(content_type, &lang, page, trend).await
                        })
                        .await?;
                    AddonResponse::cached(cached, window)
                }
                CATALOG_FAVORITES | CATALOG_WATCHLIST => {
                    let list = if catalog_id == CATALOG_FAVORITES {
                        PersonalList::Favorites
                    } else {
                        PersonalList::Watchlist
                    };
                    let session_id =
                        config
                            .session_id
                            .as_deref()
                            .ok_or_else(|| AppError::Validation {
                                field: "session_id".into(),
                                reason: format!("required for catalog '{catalog_id}'"),
                            })?;
                    let metas = provider
                        .personal_list(list, content_type, &language, page, session_id)
                        .await?;
                    AddonResponse::uncached(metas, Some(window))
                }
                CATALOG_POPULAR | CATALOG_YEAR | CATALOG_LANGUAGE => {
                    let request = CatalogRequest {
                        content_type,
                        language: language.clone(),
                        page,
                        catalog_id: catalog_id.to_string(),
                        genre: extra.genre.clone(),
                        include_adult: config.include_adult,
                    };
                    let key = CacheKey::from_parts([
                        "catalog",
                        language.as_str(),
                        content_type.as_str(),
                        catalog_id,
                        extra.genre.as_deref().unwrap_or(""),
                        page.to_string().as_str(),
                        config.include_adult.to_string().as_str(),
                    ]);
                    let cached = self
                        .cache
                        .wrap_with_window(key.as_str(), window, move || async move {
                            provider.catalog(&request).await
                        })
                        .await?;
                    AddonResponse::cached(cached, window)
                }
                other => {
                    return Err(AppError::NotFound {
                        entity: "catalog".into(),
                        field: "id".into(),
                        value: other.to_string(),
                    });
                }
            }
        };

        if let Some(key) = config.rpdb_key.as_deref() {
            self.apply_posters(content_type, &language, key, &mut response.body)
                .await;
        }
        Ok(response)
    }

    /// Replaces posters with rating posters where one exists.
    async fn apply_posters(
        &self,
        content_type: ContentType,
        language: &str,
        key: &str,
        metas: &mut [MetaPreview],
    ) {
        let posters = join_all(metas.iter().map(|m| async move {
            let tmdb_id = m.id.strip_prefix("tmdb:")?;
            self.posters.poster(content_type, tmdb_id, language, key).await
        }))
        .await;

        for (meta, poster) in metas.iter_mut().zip(posters) {
            if let Some(poster) = poster {
                meta.poster = Some(poster);
            }
        }
    }

    async fn resolve_imdb(&self, content_type: ContentType, imdb_id: &str) -> AppResult<Option<u64>> {
        let key = CacheKey::from_parts(["imdb", content_type.as_str(), imdb_id]);
        let provider = self.provider.clone();
        let imdb_id = imdb_id.to_string();
        let cached = self
            .cache
            .wrap_with_window(key.as_str(), self.policies.meta.lookup_window(), move || async move {
                provider.find_by_imdb(content_type, &imdb_id).await
            })
            .await?;
        Ok(cached.value)
    }

    /// Full metadata for `tmdb:<id>` or `tt<digits>` ids.
    ///
    /// `body` is `None` when an IMDb id does not resolve; such responses
    /// carry no cache headers.
    #[instrument(skip(self, config))]
    pub async fn meta(
        &self,
        config: &AddonConfig,
        content_type: ContentType,
        id: &str,
    ) -> AppResult<AddonResponse<Option<Meta>>> {
        let language = self.language(config).to_string();

        let tmdb_id = match id.parse::<MetaId>()? {
            MetaId::Tmdb(tmdb_id) => tmdb_id,
            MetaId::Imdb(imdb_id) => match self.resolve_imdb(content_type, &imdb_id).await? {
                Some(tmdb_id) => tmdb_id,
                None => {
                    debug!(imdb_id = %imdb_id, "IMDb id did not resolve");
                    return Ok(AddonResponse::uncached(None, None));
                }
            },
        };

        let policy = self.policies.meta;
        let key = CacheKey::from_parts([
            language.as_str(),
            content_type.as_str(),
            tmdb_id.to_string().as_str(),
        ]);
        let provider = self.provider.clone();
        let lang = language.clone();
        let cached = self
            .cache
            .wrap(
                key.as_str(),
                move |meta: &Meta| policy.window_for(content_type, meta.release_info.as_deref()),
                move || async move { provider.meta(content_type, &lang, tmdb_id).await },
            )
            .await?;

        let window = policy.window_for(content_type, cached.value.release_info.as_deref());
        let mut meta = cached.value;

        if let Some(key) = config.rpdb_key.as_deref()
            && let Some(poster) = self
                .posters
                .poster(content_type, &tmdb_id.to_string(), &language, key)
                .await
        {
            meta.poster = Some(poster);
        }

        Ok(AddonResponse {
            body: Some(meta),
            status: Some(cached.status),
            window: Some(window),
        })
    }

    pub async fn request_token(&self) -> AppResult<RequestToken> {
        self.provider.request_token().await
    }

    pub async fn session_id(&self, request_token: &str) -> AppResult<SessionId> {
        if request_token.trim().is_empty() {
            return Err(AppError::Validation {
                field: "request_token".into(),
                reason: "must not be empty".into(),
            });
        }
        self.provider.session_id(request_token).await
    }
}
