//! CacheStore trait definition.

use async_trait::async_trait;

use crate::cache::{CacheEntry, CacheError};

/// Storage behind the cache manager.
///
/// All backends keep the payload together with the time it was stored and
/// provide an atomic per-key in-flight marker used to keep at most one
/// producer call running for a key.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Backend name for logs and health output.
    fn backend(&self) -> &'static str;

    /// Look up an entry.
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;

    /// Store a value stamped with the current time and clear the key's
    /// in-flight marker.
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError>;

    /// Mark the key in-flight. Returns false when it already is.
    async fn try_begin_fetch(&self, key: &str) -> Result<bool, CacheError>;

    /// Clear the key's in-flight marker.
    async fn end_fetch(&self, key: &str) -> Result<(), CacheError>;
}
