pub mod client;
pub mod provider;
pub mod rpdb;
pub mod tmdb;

pub use provider::{
    CatalogRequest, MetadataProvider, PersonalList, RequestToken, SessionId, TrendingWindow,
};
pub use rpdb::{PosterProvider, RpdbClient};
pub use tmdb::TmdbClient;
