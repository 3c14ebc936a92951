//! Content types and title identifiers.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

static IMDB_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^tt\d+$").expect("Failed to compile IMDb id pattern"));

/// Stremio content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Movie,
    Series,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Movie => "movie",
            ContentType::Series => "series",
        }
    }

    /// Path segment TMDB uses for this type.
    pub fn tmdb_path(&self) -> &'static str {
        match self {
            ContentType::Movie => "movie",
            ContentType::Series => "tv",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(ContentType::Movie),
            "series" => Ok(ContentType::Series),
            other => Err(AppError::Validation {
                field: "type".to_string(),
                reason: format!("unsupported content type '{}', expected movie or series", other),
            }),
        }
    }
}

/// Title identifier as it appears in meta routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaId {
    /// `tmdb:<id>`
    Tmdb(u64),
    /// `tt<digits>`, optionally followed by `:season:episode`
    Imdb(String),
}

impl MetaId {
    pub fn tmdb_prefixed(id: u64) -> String {
        format!("tmdb:{}", id)
    }
}

impl FromStr for MetaId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::Validation {
            field: "id".to_string(),
            reason: format!("'{}' is neither a tmdb:<id> nor an IMDb id", s),
        };

        if let Some(rest) = s.strip_prefix("tmdb:") {
            let id = rest.split(':').next().unwrap_or_default();
            return id.parse::<u64>().map(MetaId::Tmdb).map_err(|_| invalid());
        }

        let head = s.split(':').next().unwrap_or_default();
        if IMDB_ID.is_match(head) {
            return Ok(MetaId::Imdb(head.to_string()));
        }

        Err(invalid())
    }
}
