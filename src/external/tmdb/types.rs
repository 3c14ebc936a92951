use serde::Deserialize;

use crate::models::Genre;

#[derive(Debug, Deserialize)]
pub(super) struct TmdbPage<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

/// A row of a discover, trending, search or account listing.
///
/// Movies carry `title`/`release_date`, series `name`/`first_air_date`.
#[derive(Debug, Deserialize)]
pub(super) struct TmdbListItem {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub genre_ids: Vec<u64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TmdbGenres {
    #[serde(default)]
    pub genres: Vec<Genre>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TmdbNamed {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct TmdbCredits {
    #[serde(default)]
    pub cast: Vec<TmdbNamed>,
    #[serde(default)]
    pub crew: Vec<TmdbCrew>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TmdbCrew {
    pub name: String,
    #[serde(default)]
    pub job: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct TmdbExternalIds {
    #[serde(default)]
    pub imdb_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TmdbSeasonSummary {
    pub season_number: u32,
}

/// `/movie/{id}` and `/tv/{id}` with credits and external ids appended.
#[derive(Debug, Deserialize)]
pub(super) struct TmdbDetails {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub last_air_date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub episode_run_time: Vec<u32>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub production_countries: Vec<TmdbNamed>,
    #[serde(default)]
    pub created_by: Vec<TmdbNamed>,
    #[serde(default)]
    pub credits: TmdbCredits,
    #[serde(default)]
    pub external_ids: TmdbExternalIds,
    #[serde(default)]
    pub seasons: Vec<TmdbSeasonSummary>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TmdbSeason {
    #[serde(default)]
    pub episodes: Vec<TmdbEpisode>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TmdbEpisode {
    pub season_number: u32,
    pub episode_number: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub air_date: Option<String>,
    #[serde(default)]
    pub still_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TmdbFindResult {
    #[serde(default)]
    pub movie_results: Vec<TmdbFindRow>,
    #[serde(default)]
    pub tv_results: Vec<TmdbFindRow>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TmdbFindRow {
    pub id: u64,
}

#[derive(Debug, Deserialize)]
pub(super) struct TmdbAccount {
    pub id: u64,
}

#[derive(Debug, Deserialize)]
pub(super) struct TmdbStatus {
    #[serde(default)]
    pub status_message: Option<String>,
}
