//! Reshapes TMDB payloads into Stremio objects.

use super::types::{TmdbDetails, TmdbEpisode, TmdbListItem};
use crate::models::{ContentType, Genre, Meta, MetaId, MetaPreview, Video};

const POSTER_SIZE: &str = "w500";
const BACKGROUND_SIZE: &str = "original";
const STILL_SIZE: &str = "w500";
const CAST_LIMIT: usize = 10;

/// Builds image URLs from TMDB file paths.
#[derive(Debug, Clone)]
pub(super) struct Images<'a> {
    base_url: &'a str,
}

impl<'a> Images<'a> {
    pub fn new(base_url: &'a str) -> Self {
        Self { base_url }
    }

    fn url(&self, size: &str, path: Option<&str>) -> Option<String> {
        path.filter(|p| !p.is_empty())
            .map(|p| format!("{}/{}{}", self.base_url.trim_end_matches('/'), size, p))
    }

    pub fn poster(&self, path: Option<&str>) -> Option<String> {
        self.url(POSTER_SIZE, path)
    }

    pub fn background(&self, path: Option<&str>) -> Option<String> {
        self.url(BACKGROUND_SIZE, path)
    }

    pub fn still(&self, path: Option<&str>) -> Option<String> {
        self.url(STILL_SIZE, path)
    }
}

fn year(date: Option<&str>) -> Option<&str> {
    date.and_then(|d| d.get(..4)).filter(|y| y.bytes().all(|b| b.is_ascii_digit()))
}

fn rating(vote_average: Option<f64>) -> Option<String> {
    vote_average.filter(|v| *v > 0.0).map(|v| format!("{v:.1}"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// `2010-07-16` to `2010-07-16T00:00:00.000Z`.
fn released(date: Option<&str>) -> Option<String> {
    date.filter(|d| d.len() == 10).map(|d| format!("{d}T00:00:00.000Z"))
}

fn series_has_ended(status: Option<&str>) -> bool {
    matches!(status, Some("Ended") | Some("Canceled"))
}

/// `YYYY` for movies; `YYYY-` while a series runs, `YYYY-YYYY` once it ended.
pub(super) fn release_info(content_type: ContentType, details: &TmdbDetails) -> Option<String> {
    match content_type {
        ContentType::Movie => year(details.release_date.as_deref()).map(str::to_string),
        ContentType::Series => {
            let first = year(details.first_air_date.as_deref())?;
            if series_has_ended(details.status.as_deref()) {
                let last = year(details.last_air_date.as_deref()).unwrap_or(first);
                Some(format!("{first}-{last}"))
            } else {
                Some(format!("{first}-"))
            }
        }
    }
}

pub(super) fn preview(
    content_type: ContentType,
    item: TmdbListItem,
    genres: &[Genre],
    images: &Images<'_>,
) -> MetaPreview {
    let date = match content_type {
        ContentType::Movie => item.release_date.as_deref(),
        ContentType::Series => item.first_air_date.as_deref(),
    };
    let release_info = year(date).map(str::to_string);
    let genre_names = item
        .genre_ids
        .iter()
        .filter_map(|id| genres.iter().find(|g| g.id == *id))
        .map(|g| g.name.clone())
        .collect();

    MetaPreview {
        id: MetaId::tmdb_prefixed(item.id),
        content_type,
        name: item.title.or(item.name).unwrap_or_default(),
        poster: images.poster(item.poster_path.as_deref()),
        background: images.background(item.backdrop_path.as_deref()),
        description: non_empty(item.overview),
        release_info,
        imdb_rating: rating(item.vote_average),
        genres: genre_names,
    }
}

fn video(meta_id: &str, episode: TmdbEpisode, images: &Images<'_>) -> Video {
    Video {
        id: format!("{}:{}:{}", meta_id, episode.season_number, episode.episode_number),
        title: episode
            .name
            .unwrap_or_else(|| format!("Episode {}", episode.episode_number)),
        season: episode.season_number,
        episode: episode.episode_number,
        released: released(episode.air_date.as_deref()),
        overview: non_empty(episode.overview),
        thumbnail: images.still(episode.still_path.as_deref()),
    }
}

pub(super) fn meta(
    content_type: ContentType,
    details: TmdbDetails,
    episodes: Vec<TmdbEpisode>,
    images: &Images<'_>,
) -> Meta {
    let id = MetaId::tmdb_prefixed(details.id);
    let release_info = release_info(content_type, &details);

    let (released_on, runtime, director, imdb_id) = match content_type {
        ContentType::Movie => (
            details.release_date.as_deref(),
            details.runtime,
            details
                .credits
                .crew
                .iter()
                .filter(|c| c.job.as_deref() == Some("Director"))
                .map(|c| c.name.clone())
                .collect::<Vec<_>>(),
            details.imdb_id.clone().or(details.external_ids.imdb_id.clone()),
        ),
        ContentType::Series => (
            details.first_air_date.as_deref(),
            details.episode_run_time.first().copied(),
            details.created_by.iter().map(|c| c.name.clone()).collect(),
            details.external_ids.imdb_id.clone(),
        ),
    };
    let released_on = released(released_on);

    let country = details
        .production_countries
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let videos = episodes
        .into_iter()
        .map(|episode| video(&id, episode, images))
        .collect();

    Meta {
        name: details.title.or(details.name).unwrap_or_default(),
        content_type,
        imdb_id: non_empty(imdb_id),
        poster: images.poster(details.poster_path.as_deref()),
        background: images.background(details.backdrop_path.as_deref()),
        logo: None,
        description: non_empty(details.overview),
        release_info,
        released: released_on,
        runtime: runtime.filter(|m| *m > 0).map(|m| format!("{m} min")),
        imdb_rating: rating(details.vote_average),
        genres: details.genres.into_iter().map(|g| g.name).collect(),
        cast: details
            .credits
            .cast
            .into_iter()
            .take(CAST_LIMIT)
            .map(|c| c.name)
            .collect(),
        director,
        country: Some(country).filter(|c| !c.is_empty()),
        website: non_empty(details.homepage),
        videos,
        id,
    }
}
