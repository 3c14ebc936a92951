//! Stremio meta objects.

use serde::{Deserialize, Serialize};

use crate::models::ContentType;

/// Catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaPreview {
    pub id: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_rating: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
}

/// One episode of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    /// `<series id>:<season>:<episode>`
    pub id: String,
    pub title: String,
    pub season: u32,
    pub episode: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub released: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// Full metadata for one title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub id: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `YYYY` for movies; `YYYY-` or `YYYY-YYYY` for series.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub released: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_rating: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cast: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub director: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub videos: Vec<Video>,
}

/// `{"metas": [...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetasResponse {
    pub metas: Vec<MetaPreview>,
}

/// `{"meta": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaResponse {
    pub meta: Meta,
}

/// A TMDB genre.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: u64,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_preview_wire_format() {
        let preview = MetaPreview {
            id: "tmdb:550".to_string(),
            content_type: ContentType::Movie,
            name: "Fight Club".to_string(),
            poster: Some("https://image.tmdb.org/t/p/w500/a.jpg".to_string()),
            background: None,
            description: None,
            release_info: Some("1999".to_string()),
            imdb_rating: Some("8.4".to_string()),
            genres: vec![],
        };

        let json = serde_json::to_value(&preview).unwrap();
        assert_eq!(json["type"], "movie");
        assert_eq!(json["releaseInfo"], "1999");
        assert_eq!(json["imdbRating"], "8.4");
        assert!(json.get("background").is_none());
        assert!(json.get("genres").is_none());
    }

    #[test]
    fn test_meta_reads_back_without_optional_fields() {
        let meta: Meta =
            serde_json::from_str(r#"{"id":"tmdb:1399","type":"series","name":"Game of Thrones"}"#)
                .unwrap();
        assert_eq!(meta.content_type, ContentType::Series);
        assert!(meta.videos.is_empty());
        assert!(meta.release_info.is_none());
    }
}
