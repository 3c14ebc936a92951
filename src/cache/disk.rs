//! Disk store on top of cached's sled-backed DiskCache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cached::IOCached;
use cached::stores::DiskCache as CachedDiskCache;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::cache::inflight::InFlightMarkers;
use crate::cache::{CacheEntry, CacheError, CacheStore, Clock};
use crate::config::settings::DiskCacheConfig;

#[derive(Serialize, Deserialize)]
struct DiskRecord {
    value: Vec<u8>,
    stored_at: Timestamp,
}

/// Disk-based store. Entries survive restarts until the retention lifespan
/// removes them; in-flight markers are per process.
pub struct DiskStore {
    store: Mutex<CachedDiskCache<String, Vec<u8>>>,
    in_flight: InFlightMarkers,
    clock: Arc<dyn Clock>,
}

impl DiskStore {
    pub fn new(
        config: &DiskCacheConfig,
        cache_name: &str,
        lease: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CacheError> {
        let store = CachedDiskCache::new(cache_name)
            .set_disk_directory(&config.directory)
            .set_lifespan(Duration::from_secs(config.retention_seconds))
            .build()
            .map_err(|e| CacheError::Connection(e.to_string()))?;
        Ok(Self {
            store: Mutex::new(store),
            in_flight: InFlightMarkers::new(lease, clock.clone()),
            clock,
        })
    }
}

#[async_trait]
impl CacheStore for DiskStore {
    fn backend(&self) -> &'static str {
        "disk"
    }

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let key_string = key.to_string();
        let bytes = {
            let store = self.store.lock().await;
            store
                .cache_get(&key_string)
                .map_err(|e| CacheError::Operation(e.to_string()))?
        };

        let Some(bytes) = bytes else {
            return Ok(None);
        };
        match serde_json::from_slice::<DiskRecord>(&bytes) {
            Ok(record) => Ok(Some(CacheEntry {
                value: record.value,
                stored_at: record.stored_at,
                fetching: self.in_flight.is_held(key),
            })),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding unreadable disk cache record");
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        let record = DiskRecord {
            value,
            stored_at: self.clock.now(),
        };
        let bytes = serde_json::to_vec(&record)?;

        {
            let store = self.store.lock().await;
            store
                .cache_set(key.to_string(), bytes)
                .map_err(|e| CacheError::Operation(e.to_string()))?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SystemClock;
    use tempfile::TempDir;

    fn disk_store(dir: &TempDir, name: &str) -> DiskStore {
        let config = DiskCacheConfig {
            directory: dir.path().to_str().unwrap().to_string(),
            retention_seconds: 3600,
        };
        DiskStore::new(&config, name, Duration::from_secs(60), Arc::new(SystemClock)).unwrap()
    }

    #[tokio::test]
    async fn test_get_set() {
        let dir = TempDir::new().unwrap();
        let store = disk_store(&dir, "test_get_set");
        assert!(store.get("key").await.unwrap().is_none());

        store.set("key", b"value".to_vec()).await.unwrap();
        let entry = store.get("key").await.unwrap().unwrap();
        assert_eq!(entry.value, b"value".to_vec());
        assert!(entry.stored_at <= Timestamp::now());
    }

    #[tokio::test]
    async fn test_overwrite_keeps_latest() {
        let dir = TempDir::new().unwrap();
        let store = disk_store(&dir, "test_overwrite");
        store.set("key", b"one".to_vec()).await.unwrap();
        store.set("key", b"two".to_vec()).await.unwrap();
        assert_eq!(store.get("key").await.unwrap().unwrap().value, b"two".to_vec());
    }

    #[tokio::test]
    async fn test_fetch_markers() {
        let dir = TempDir::new().unwrap();
        let store = disk_store(&dir, "test_markers");
        assert!(store.try_begin_fetch("key").await.unwrap());
        assert!(!store.try_begin_fetch("key").await.unwrap());
        store.set("key", b"v".to_vec()).await.unwrap();
        assert!(!store.get("key").await.unwrap().unwrap().fetching);
        assert!(store.try_begin_fetch("key").await.unwrap());
        store.end_fetch("key").await.unwrap();
        assert!(store.try_begin_fetch("key").await.unwrap());
    }
}
