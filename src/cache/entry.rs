//! Stored cache entries.

use std::time::Duration;

use jiff::Timestamp;

/// A value as held by a cache store.
///
/// `value` is the serialized payload; `fetching` reports whether a producer
/// call for the key is currently in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub value: Vec<u8>,
    pub stored_at: Timestamp,
    pub fetching: bool,
}

impl CacheEntry {
    pub fn new(value: Vec<u8>, stored_at: Timestamp) -> Self {
        Self {
            value,
            stored_at,
            fetching: false,
        }
    }

    /// Age of the entry at `now`. Entries stamped in the future have age zero.
    pub fn age(&self, now: Timestamp) -> Duration {
        age_between(self.stored_at, now)
    }
}

pub(crate) fn age_between(stored_at: Timestamp, now: Timestamp) -> Duration {
    let ms = now.as_millisecond() - stored_at.as_millisecond();
    Duration::from_millis(u64::try_from(ms).unwrap_or(0))
}
