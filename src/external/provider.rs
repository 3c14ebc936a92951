//! Upstream metadata provider seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::models::{ContentType, Genre, Meta, MetaPreview};

/// Discover listing parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRequest {
    pub content_type: ContentType,
    pub language: String,
    pub page: u32,
    /// `tmdb.top`, `tmdb.year` or `tmdb.language`
    pub catalog_id: String,
    /// Genre name, year or language code depending on the catalog
    pub genre: Option<String>,
    pub include_adult: bool,
}

/// Trending time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendingWindow {
    Day,
    Week,
}

impl TrendingWindow {
    /// `"Week"` selects the weekly window; anything else is daily.
    pub fn from_genre(genre: Option<&str>) -> Self {
        match genre {
            Some("Week") => TrendingWindow::Week,
            _ => TrendingWindow::Day,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendingWindow::Day => "day",
            TrendingWindow::Week => "week",
        }
    }
}

/// Account lists reachable through a TMDB session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonalList {
    Favorites,
    Watchlist,
}

impl PersonalList {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonalList::Favorites => "favorite",
            PersonalList::Watchlist => "watchlist",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestToken {
    pub success: bool,
    #[serde(default)]
    pub expires_at: Option<String>,
    pub request_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionId {
    pub success: bool,
    pub session_id: String,
}

/// Source of catalog and title metadata.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn catalog(&self, request: &CatalogRequest) -> AppResult<Vec<MetaPreview>>;

    async fn trending(
        &self,
        content_type: ContentType,
        language: &str,
        page: u32,
        window: TrendingWindow,
    ) -> AppResult<Vec<MetaPreview>>;

    async fn search(
        &self,
        content_type: ContentType,
        language: &str,
        query: &str,
        include_adult: bool,
    ) -> AppResult<Vec<MetaPreview>>;

    async fn personal_list(
        &self,
        list: PersonalList,
        content_type: ContentType,
        language: &str,
        page: u32,
        session_id: &str,
    ) -> AppResult<Vec<MetaPreview>>;

    async fn genres(&self, content_type: ContentType, language: &str) -> AppResult<Vec<Genre>>;

    async fn meta(&self, content_type: ContentType, language: &str, tmdb_id: u64) -> AppResult<Meta>;

    /// Resolves an IMDb id; `None` when the provider does not know it.
    async fn find_by_imdb(&self, content_type: ContentType, imdb_id: &str) -> AppResult<Option<u64>>;

    async fn request_token(&self) -> AppResult<RequestToken>;

    async fn session_id(&self, request_token: &str) -> AppResult<SessionId>;
}
