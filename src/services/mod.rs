//! Service layer for add-on operations.
//!
//! Services coordinate the cache manager and upstream providers for the
//! HTTP handlers.

mod addon_service;

pub use addon_service::{AddonResponse, AddonService, CatalogExtra, PAGE_SIZE};

#[cfg(test)]
pub(crate) use addon_service::tests as test_support;

/// Aggregates all services for convenient access.
///
/// Cloning is cheap since every service holds `Arc`s internally.
#[derive(Clone)]
pub struct Services {
    pub addon: AddonService,
}

impl Services {
    pub fn new(addon: AddonService) -> Self {
        Self { addon }
    }
}
