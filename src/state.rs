//! Application state for Axum web framework.
//!
//! Contains shared services and resources that are accessible
//! across all request handlers.

use crate::cache::CacheManager;
use crate::services::Services;

/// Application state containing all shared services and resources.
///
/// Cloning is cheap since services and the cache manager hold `Arc`s.
#[derive(Clone)]
pub struct AppState {
    /// All add-on services
    pub services: Services,
    /// Direct access to the response cache for health probes
    pub cache: CacheManager,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        let cache = services.addon.cache().clone();
        Self { services, cache }
    }
}
