//! In-process in-flight markers for the memory and disk stores.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use jiff::Timestamp;

use crate::cache::Clock;
use crate::cache::entry::age_between;

/// Per-key "fetch in progress" markers with a lease.
///
/// A marker older than the lease is treated as abandoned (its fetch task
/// panicked or was aborted) and may be taken over.
pub(crate) struct InFlightMarkers {
    markers: DashMap<String, Timestamp>,
    lease: Duration,
    clock: Arc<dyn Clock>,
}

impl InFlightMarkers {
    pub(crate) fn new(lease: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            markers: DashMap::new(),
            lease,
            clock,
        }
    }

    pub(crate) fn try_acquire(&self, key: &str) -> bool {
        let now = self.clock.now();
        match self.markers.entry(key.to_string()) {
            Entry::Vacant(vacant) => {
                vacant.insert(now);
                true
            }
            Entry::Occupied(mut occupied) => {
                if age_between(*occupied.get(), now) > self.lease {
                    tracing::warn!(key = %key, "Taking over abandoned in-flight marker");
                    occupied.insert(now);
                    true
                } else {
                    false
                }
            }
        }
    }

    pub(crate) fn release(&self, key: &str) {
        self.markers.remove(key);
    }

    pub(crate) fn is_held(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.markers
            .get(key)
            .is_some_and(|started| age_between(*started, now) <= self.lease)
    }
}
