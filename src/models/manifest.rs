//! Add-on manifest.

use serde::{Deserialize, Serialize};

use crate::models::ContentType;

pub const CATALOG_POPULAR: &str = "tmdb.top";
pub const CATALOG_YEAR: &str = "tmdb.year";
pub const CATALOG_LANGUAGE: &str = "tmdb.language";
pub const CATALOG_TRENDING: &str = "tmdb.trending";
pub const CATALOG_FAVORITES: &str = "tmdb.favorites";
pub const CATALOG_WATCHLIST: &str = "tmdb.watchlist";

/// Oldest year offered by the year catalog.
const FIRST_YEAR: i16 = 1900;

/// Original languages offered by the language catalog.
pub const CATALOG_LANGUAGES: &[&str] = &[
    "en", "fr", "de", "es", "it", "pt", "ja", "ko", "zh", "hi", "ru", "sv", "da", "no", "nl",
    "pl", "tr",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraField {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_required: bool,
}

impl ExtraField {
    fn optional(name: &str) -> Self {
        Self {
            name: name.to_string(),
            options: Vec::new(),
            is_required: false,
        }
    }

    fn choice(options: Vec<String>, is_required: bool) -> Self {
        Self {
            name: "genre".to_string(),
            options,
            is_required,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestCatalog {
    pub id: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<ExtraField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorHints {
    pub configurable: bool,
    pub configuration_required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub id: String,
    pub version: String,
    pub name: String,
    pub description: String,
    pub resources: Vec<String>,
    pub types: Vec<ContentType>,
    pub id_prefixes: Vec<String>,
    pub catalogs: Vec<ManifestCatalog>,
    pub behavior_hints: BehaviorHints,
}

/// Everything the manifest depends on.
#[derive(Debug, Clone, Default)]
pub struct ManifestInput {
    pub version: String,
    pub movie_genres: Vec<String>,
    pub series_genres: Vec<String>,
    pub current_year: i16,
    pub has_session: bool,
}

fn catalogs_for(content_type: ContentType, genres: &[String], input: &ManifestInput) -> Vec<ManifestCatalog> {
    let label = match content_type {
        ContentType::Movie => "Movies",
        ContentType::Series => "Series",
    };
    let catalog = |id: &str, name: &str, extra: Vec<ExtraField>| ManifestCatalog {
        id: id.to_string(),
        content_type,
        name: format!("TMDB {} {}", name, label),
        extra,
    };

    let years: Vec<String> = (FIRST_YEAR..=input.current_year.max(FIRST_YEAR))
        .rev()
        .map(|y| y.to_string())
        .collect();
    let languages = CATALOG_LANGUAGES.iter().map(|l| l.to_string()).collect();
    let windows = vec!["Day".to_string(), "Week".to_string()];

    let mut catalogs = vec![
        catalog(
            CATALOG_POPULAR,
            "Popular",
            vec![
                ExtraField::choice(genres.to_vec(), false),
                ExtraField::optional("skip"),
                ExtraField::optional("search"),
            ],
        ),
        catalog(
            CATALOG_YEAR,
            "Year",
            vec![ExtraField::choice(years, true), ExtraField::optional("skip")],
        ),
        catalog(
            CATALOG_LANGUAGE,
            "Language",
            vec![ExtraField::choice(languages, true), ExtraField::optional("skip")],
        ),
        catalog(
            CATALOG_TRENDING,
            "Trending",
            vec![ExtraField::choice(windows, true), ExtraField::optional("skip")],
        ),
    ];

    if input.has_session {
        catalogs.push(catalog(CATALOG_FAVORITES, "Favorite", vec![ExtraField::optional("skip")]));
        catalogs.push(catalog(CATALOG_WATCHLIST, "Watchlist", vec![ExtraField::optional("skip")]));
    }

    catalogs
}

impl Manifest {
    pub fn build(input: &ManifestInput) -> Self {
        let mut catalogs = catalogs_for(ContentType::Movie, &input.movie_genres, input);
        catalogs.extend(catalogs_for(ContentType::Series, &input.series_genres, input));

        Self {
            id: "org.tmdb-addon".to_string(),
            version: input.version.clone(),
            name: "The Movie Database".to_string(),
            description: "Metadata and catalogs from The Movie Database".to_string(),
            resources: vec!["catalog".to_string(), "meta".to_string()],
            types: vec![ContentType::Movie, ContentType::Series],
            id_prefixes: vec!["tmdb:".to_string(), "tt".to_string()],
            catalogs,
            behavior_hints: BehaviorHints {
                configurable: true,
                configuration_required: false,
            },
        }
    }
}
