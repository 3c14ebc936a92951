//! Memory store using cached::SizedCache.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cached::{Cached, SizedCache};
use jiff::Timestamp;

use crate::cache::inflight::InFlightMarkers;
use crate::cache::{CacheEntry, CacheError, CacheStore, Clock};
use crate::config::settings::MemoryCacheConfig;

/// In-memory store, least-recently-used eviction once `max_size` entries are held.
pub struct MemoryStore {
    entries: Mutex<SizedCache<String, (Vec<u8>, Timestamp)>>,
    in_flight: InFlightMarkers,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new(config: &MemoryCacheConfig, lease: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(SizedCache::with_size(config.max_size)),
            in_flight: InFlightMarkers::new(lease, clock.clone()),
            clock,
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|s| s.cache_size()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let found = {
            let mut entries = self
                .entries
                .lock()
                .map_err(|e| CacheError::Operation(e.to_string()))?;
            entries.cache_get(key).cloned()
        };

        Ok(found.map(|(value, stored_at)| CacheEntry {
            value,
            stored_at,
            fetching: self.in_flight.is_held(key),
        }))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        {
            let mut entries = self
                .entries
                .lock()
                .map_err(|e| CacheError::Operation(e.to_string()))?;
            entries.cache_set(key.to_string(), (value, self.clock.now()));
        }
        self.in_flight.release(key);
        Ok(())
    }

    async fn try_begin_fetch(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.in_flight.try_acquire(key))
    }

    async fn end_fetch(&self, key: &str) -> Result<(), CacheError> {
        self.in_flight.release(key);
        Ok(())
    }
}
