mod client;
mod mapping;
mod types;

pub use client::TmdbClient;
