//! Freshness windows and their classification rules.
//!
//! A [`FreshnessWindow`] is the triple `max-age`, `stale-while-revalidate`,
//! `stale-if-error` in seconds. The same window drives two things: how the
//! cache manager treats a stored entry, and the `Cache-Control` header sent
//! to clients and CDNs.

use std::time::Duration;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::cache::entry::age_between;
use crate::models::ContentType;

const DAY: u64 = 24 * 60 * 60;

/// Freshness directives for one call site.
///
/// A directive is present only when it is set and nonzero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FreshnessWindow {
    #[serde(default, alias = "cacheMaxAge")]
    pub max_age: Option<u64>,

    #[serde(default, alias = "staleRevalidate")]
    pub stale_while_revalidate: Option<u64>,

    #[serde(default, alias = "staleError")]
    pub stale_if_error: Option<u64>,
}

/// How a stored entry may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Serve as is.
    Fresh,
    /// Serve and refresh in the background.
    Revalidate,
    /// Refresh now; serve only if the refresh fails.
    StaleOnErrorOnly,
    /// Unusable; refresh and surface failures.
    Expired,
}

fn present(value: Option<u64>) -> Option<u64> {
    value.filter(|v| *v > 0)
}

impl FreshnessWindow {
    pub const fn new(
        max_age: Option<u64>,
        stale_while_revalidate: Option<u64>,
        stale_if_error: Option<u64>,
    ) -> Self {
        Self {
            max_age,
            stale_while_revalidate,
            stale_if_error,
        }
    }

    pub fn max_age(&self) -> Option<u64> {
        present(self.max_age)
    }

    pub fn stale_while_revalidate(&self) -> Option<u64> {
        present(self.stale_while_revalidate)
    }

    pub fn stale_if_error(&self) -> Option<u64> {
        present(self.stale_if_error)
    }

    /// Whether any directive is present.
    pub fn is_configured(&self) -> bool {
        self.max_age().is_some()
            || self.stale_while_revalidate().is_some()
            || self.stale_if_error().is_some()
    }

    pub fn with_max_age(mut self, max_age: Option<u64>) -> Self {
        self.max_age = max_age;
        self
    }

    /// Classifies an entry of the given age.
    pub fn classify_age(&self, age: Duration) -> Freshness {
        let max_age = Duration::from_secs(self.max_age().unwrap_or(0));
        let revalidate = Duration::from_secs(self.stale_while_revalidate().unwrap_or(0));
        let on_error = Duration::from_secs(self.stale_if_error().unwrap_or(0));

        if age <= max_age {
            Freshness::Fresh
        } else if age <= max_age + revalidate {
            Freshness::Revalidate
        } else if age <= max_age + on_error {
            Freshness::StaleOnErrorOnly
        } else {
            Freshness::Expired
        }
    }

    /// Classifies an entry stored at `stored_at` as seen at `now`.
    pub fn classify(&self, stored_at: Timestamp, now: Timestamp) -> Freshness {
        self.classify_age(age_between(stored_at, now))
    }

    /// Renders the window as a `Cache-Control` value.
    ///
    /// Returns `None` when no directive is present, in which case the header
    /// must be left out.
    pub fn cache_control_header(&self) -> Option<String> {
        let directives: Vec<String> = [
            ("max-age", self.max_age()),
            ("stale-while-revalidate", self.stale_while_revalidate()),
            ("stale-if-error", self.stale_if_error()),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| format!("{}={}", name, v)))
        .collect();

        if directives.is_empty() {
            None
        } else {
            Some(format!("{}, public", directives.join(", ")))
        }
    }
}

/// Windows for per-title metadata, tiered by content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaPolicy {
    #[serde(default = "default_meta_stale_while_revalidate", alias = "staleRevalidate")]
    pub stale_while_revalidate: Option<u64>,

    #[serde(default = "default_meta_stale_if_error", alias = "staleError")]
    pub stale_if_error: Option<u64>,

    #[serde(default = "default_meta_long_max_age")]
    pub movie_max_age: Option<u64>,

    #[serde(default = "default_meta_long_max_age")]
    pub series_ended_max_age: Option<u64>,

    #[serde(default = "default_meta_series_ongoing_max_age")]
    pub series_ongoing_max_age: Option<u64>,
}

fn default_meta_stale_while_revalidate() -> Option<u64> {
    Some(20 * DAY)
}

fn default_meta_stale_if_error() -> Option<u64> {
    Some(30 * DAY)
}

fn default_meta_long_max_age() -> Option<u64> {
    Some(14 * DAY)
}

fn default_meta_series_ongoing_max_age() -> Option<u64> {
    Some(DAY)
}

impl Default for MetaPolicy {
    fn default() -> Self {
        Self {
            stale_while_revalidate: default_meta_stale_while_revalidate(),
            stale_if_error: default_meta_stale_if_error(),
            movie_max_age: default_meta_long_max_age(),
            series_ended_max_age: default_meta_long_max_age(),
            series_ongoing_max_age: default_meta_series_ongoing_max_age(),
        }
    }
}

/// A series has ended when its release range carries an end year
/// (`"2008-2013"`); `"2008-"` or an empty range means it is still running.
pub fn series_has_ended(release_info: Option<&str>) -> bool {
    release_info.is_some_and(|r| r.chars().count() > 5)
}

impl MetaPolicy {
    pub fn window_for(&self, content_type: ContentType, release_info: Option<&str>) -> FreshnessWindow {
        let max_age = match content_type {
            ContentType::Movie => self.movie_max_age,
            ContentType::Series if series_has_ended(release_info) => self.series_ended_max_age,
            ContentType::Series => self.series_ongoing_max_age,
        };
        FreshnessWindow::new(max_age, self.stale_while_revalidate, self.stale_if_error)
    }

    /// Window for id lookups, which do not change once a title exists.
    pub fn lookup_window(&self) -> FreshnessWindow {
        self.window_for(ContentType::Movie, None)
    }
}

/// Windows for every cached call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePolicies {
    #[serde(default = "default_manifest_window")]
    pub manifest: FreshnessWindow,

    #[serde(default = "default_catalog_window")]
    pub catalog: FreshnessWindow,

    #[serde(default)]
    pub meta: MetaPolicy,
}

fn default_manifest_window() -> FreshnessWindow {
    FreshnessWindow::new(Some(12 * 60 * 60), Some(14 * DAY), Some(30 * DAY))
}

fn default_catalog_window() -> FreshnessWindow {
    FreshnessWindow::new(Some(DAY), Some(7 * DAY), Some(14 * DAY))
}

impl Default for CachePolicies {
    fn default() -> Self {
        Self {
            manifest: default_manifest_window(),
            catalog: default_catalog_window(),
            meta: MetaPolicy::default(),
        }
    }
}
