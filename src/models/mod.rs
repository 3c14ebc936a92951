mod addon_config;
mod content;
mod manifest;
mod meta;

pub use addon_config::AddonConfig;
pub use content::{ContentType, MetaId};
pub use manifest::{
    BehaviorHints, CATALOG_FAVORITES, CATALOG_LANGUAGE, CATALOG_LANGUAGES, CATALOG_POPULAR,
    CATALOG_TRENDING, CATALOG_WATCHLIST, CATALOG_YEAR, ExtraField, Manifest, ManifestCatalog,
    ManifestInput,
};
pub use meta::{Genre, Meta, MetaPreview, MetaResponse, MetasResponse, Video};
