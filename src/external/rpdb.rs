//! Rating posters from ratingposterdb.com.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::RpdbConfig;
use crate::external::client::HTTP_CLIENT;
use crate::models::ContentType;

/// Source of per-user replacement posters.
#[async_trait]
pub trait PosterProvider: Send + Sync {
    /// Returns the replacement poster URL if one is available.
    async fn poster(
        &self,
        content_type: ContentType,
        tmdb_id: &str,
        language: &str,
        key: &str,
    ) -> Option<String>;
}

#[derive(Debug, Clone)]
pub struct RpdbClient {
    base_url: String,
    timeout: Duration,
}

impl RpdbClient {
    pub fn new(config: &RpdbConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.request_timeout),
        }
    }

    /// `{base}/{key}/tmdb/poster-default/{movie|series}-{id}.jpg?fallback=true&lang={lang}`,
    /// where `lang` is the language without its region.
    pub fn poster_url(
        &self,
        content_type: ContentType,
        tmdb_id: &str,
        language: &str,
        key: &str,
    ) -> String {
        let lang = language.split('-').next().unwrap_or(language);
        format!(
            "{}/{}/tmdb/poster-default/{}-{}.jpg?fallback=true&lang={}",
            self.base_url,
            key,
            content_type.as_str(),
            tmdb_id,
            lang
        )
    }

    async fn exists(&self, url: &str) -> bool {
        match HTTP_CLIENT.head(url).timeout(self.timeout).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!("RPDB poster check failed: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl PosterProvider for RpdbClient {
    async fn poster(
        &self,
        content_type: ContentType,
        tmdb_id: &str,
        language: &str,
        key: &str,
    ) -> Option<String> {
        let url = self.poster_url(content_type, tmdb_id, language, key);
        self.exists(&url).await.then_some(url)
    }
}
