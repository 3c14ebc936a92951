//! Response cache with stale-while-revalidate and stale-if-error semantics.
//!
//! Values are stored together with the time they were written. Each call
//! site supplies a [`FreshnessWindow`]; [`CacheManager::wrap`] classifies the
//! stored value against it and decides whether to serve it, refresh it in the
//! background, refresh it now, or fail.
//!
//! # Configuration
//!
//! ```toml
//! [cache]
//! backend = "memory"  # or "disk" or "redis"
//! wait_budget_ms = 2000
//! fetch_timeout_seconds = 15
//! poll_interval_ms = 100
//! fetch_lease_seconds = 60
//!
//! [cache.memory]
//! max_size = 10000
//!
//! [cache.disk]
//! directory = "cache"
//! retention_seconds = 5184000
//!
//! [cache.redis]
//! url = "redis://127.0.0.1:6379"
//! pool_size = 4
//! connection_timeout = 5
//! key_prefix = "tmdb-addon"
//! retention_seconds = 5184000
//!
//! [cache.policies.catalog]
//! max_age = 86400
//! stale_while_revalidate = 604800
//! stale_if_error = 1209600
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let cached = cache
//!     .wrap_with_window(key.as_str(), policies.catalog, move || async move {
//!         provider.catalog(&request).await
//!     })
//!     .await?;
//! ```

mod clock;
mod disk;
mod entry;
mod error;
mod inflight;
mod key;
mod manager;
mod memory;
mod policy;
mod redis;
mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use disk::DiskStore;
pub use entry::CacheEntry;
pub use error::CacheError;
pub use key::CacheKey;
pub use manager::{CacheManager, CacheStatus, Cached, WrapOptions};
pub use memory::MemoryStore;
pub use policy::{CachePolicies, Freshness, FreshnessWindow, MetaPolicy, series_has_ended};
pub use redis::RedisStore;
pub use traits::CacheStore;

// Re-export config types
pub use crate::config::settings::{
    CacheBackend, CacheConfig, DiskCacheConfig, MemoryCacheConfig, RedisCacheConfig,
};
