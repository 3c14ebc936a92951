//! Cache manager: stale-while-revalidate / stale-if-error wrapping of
//! producer calls, with at most one producer call in flight per key.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use jiff::Timestamp;
use rand::Rng;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::cache::disk::DiskStore;
use crate::cache::memory::MemoryStore;
use crate::cache::redis::RedisStore;
use crate::cache::{CacheError, CacheStore, Clock, Freshness, FreshnessWindow, SystemClock};
use crate::config::settings::{CacheBackend, CacheConfig};
use crate::error::{AppError, AppResult};

/// Timing bounds applied by [`CacheManager::wrap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrapOptions {
    /// How long a caller holding a usable stale value waits for a refresh.
    pub wait_budget: Duration,
    /// Bound on each producer call and on waiting for another process's fetch.
    pub fetch_timeout: Duration,
    /// Base interval between checks of a store-level marker held elsewhere.
    pub poll_interval: Duration,
}

impl Default for WrapOptions {
    fn default() -> Self {
        Self {
            wait_budget: Duration::from_millis(2000),
            fetch_timeout: Duration::from_secs(15),
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl WrapOptions {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            wait_budget: Duration::from_millis(config.wait_budget_ms),
            fetch_timeout: Duration::from_secs(config.fetch_timeout_seconds),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        }
    }
}

/// Where a wrapped value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Fresh stored value.
    Hit,
    /// Stale stored value, refresh running in the background.
    Stale,
    /// Value produced by this call (or the fetch it joined).
    Miss,
    /// Stale stored value served because the refresh failed.
    StaleOnError,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Stale => "stale",
            CacheStatus::Miss => "miss",
            CacheStatus::StaleOnError => "stale-on-error",
        }
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A wrapped value and how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
    pub value: T,
    pub status: CacheStatus,
}

impl<T> Cached<T> {
    pub fn new(value: T, status: CacheStatus) -> Self {
        Self { value, status }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Cached<U> {
        Cached {
            value: f(self.value),
            status: self.status,
        }
    }
}

type FlightOutcome = Result<Arc<Vec<u8>>, Arc<AppError>>;

/// One running fetch. Every caller joining it observes the same outcome.
#[derive(Clone)]
struct Flight {
    id: u64,
    rx: watch::Receiver<Option<FlightOutcome>>,
}

impl Flight {
    /// The fetch task ended without publishing an outcome.
    fn is_abandoned(&self) -> bool {
        self.rx.has_changed().is_err() && self.rx.borrow().is_none()
    }

    async fn outcome(self) -> FlightOutcome {
        let mut rx = self.rx;
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        };
        outcome.unwrap_or_else(|| {
            Err(Arc::new(AppError::Internal {
                source: anyhow::anyhow!("cache fetch ended without a result"),
            }))
        })
    }
}

/// Shared response cache.
///
/// Constructed once at startup and handed to the services that need it.
#[derive(Clone)]
pub struct CacheManager {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    flights: Arc<DashMap<String, Flight>>,
    next_flight: Arc<AtomicU64>,
    options: WrapOptions,
}

impl CacheManager {
    /// Build the configured backend.
    pub async fn new(config: &CacheConfig, cache_name: &str) -> Result<Self, CacheError> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let lease = Duration::from_secs(config.fetch_lease_seconds);

        let store: Arc<dyn CacheStore> = match config.backend {
            CacheBackend::Memory => Arc::new(MemoryStore::new(&config.memory, lease, clock.clone())),
            CacheBackend::Disk => Arc::new(DiskStore::new(
                &config.disk,
                cache_name,
                lease,
                clock.clone(),
            )?),
            CacheBackend::Redis => Arc::new(
                RedisStore::new(&config.redis, cache_name, lease, clock.clone()).await?,
            ),
        };

        Ok(Self::with_store(store, clock, WrapOptions::from_config(config)))
    }

    pub fn with_store(store: Arc<dyn CacheStore>, clock: Arc<dyn Clock>, options: WrapOptions) -> Self {
        Self {
            store,
            clock,
            flights: Arc::new(DashMap::new()),
            next_flight: Arc::new(AtomicU64::new(0)),
            options,
        }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub fn options(&self) -> &WrapOptions {
        &self.options
    }

    /// Checks that the store answers reads.
    pub async fn probe(&self) -> Result<(), CacheError> {
        self.store.get("health:probe").await.map(|_| ())
    }

    /// [`wrap`](Self::wrap) with a window that does not depend on the value.
    pub async fn wrap_with_window<T, F, Fut>(
        &self,
        key: &str,
        window: FreshnessWindow,
        producer: F,
    ) -> AppResult<Cached<T>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        self.wrap(key, move |_: &T| window, producer).await
    }

    /// Returns the value for `key`, calling `producer` only when the stored
    /// value is missing or too old for `policy`.
    ///
    /// `policy` picks the window from the stored value itself, so one key can
    /// carry a window that depends on its content.
    pub async fn wrap<T, P, F, Fut>(&self, key: &str, policy: P, producer: F) -> AppResult<Cached<T>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        P: Fn(&T) -> FreshnessWindow + Send,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        let Some((stale, stored_at)) = self.lookup::<T>(key).await else {
            return self.fetch_now(key, None, producer).await;
        };

        let freshness = policy(&stale).classify(stored_at, self.clock.now());
        match freshness {
            Freshness::Fresh => Ok(Cached::new(stale, CacheStatus::Hit)),
            Freshness::Revalidate => {
                let (_, started) = self.join_or_start(key, Some(stored_at), producer);
                if started {
                    tracing::debug!(key = %key, "Revalidating stale cache entry in background");
                }
                Ok(Cached::new(stale, CacheStatus::Stale))
            }
            Freshness::StaleOnErrorOnly => {
                let (flight, _) = self.join_or_start(key, Some(stored_at), producer);
                match tokio::time::timeout(self.options.wait_budget, flight.outcome()).await {
                    Ok(Ok(bytes)) => match decode::<T>(&bytes) {
                        Ok(value) => Ok(Cached::new(value, CacheStatus::Miss)),
                        Err(err) => {
                            tracing::warn!(key = %key, error = %err, "Serving stale value, refreshed value unreadable");
                            Ok(Cached::new(stale, CacheStatus::StaleOnError))
                        }
                    },
                    Ok(Err(err)) => {
                        tracing::warn!(key = %key, error = %err, "Serving stale value after failed refresh");
                        Ok(Cached::new(stale, CacheStatus::StaleOnError))
                    }
                    Err(_) => {
                        tracing::warn!(
                            key = %key,
                            wait_budget_ms = self.options.wait_budget.as_millis() as u64,
                            "Serving stale value, refresh still running"
                        );
                        Ok(Cached::new(stale, CacheStatus::StaleOnError))
                    }
                }
            }
            Freshness::Expired => self.fetch_now(key, Some(stored_at), producer).await,
        }
    }

    async fn fetch_now<T, F, Fut>(
        &self,
        key: &str,
        baseline: Option<Timestamp>,
        producer: F,
    ) -> AppResult<Cached<T>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        let (flight, _) = self.join_or_start(key, baseline, producer);

        match flight.outcome().await {
            Ok(bytes) => Ok(Cached::new(decode::<T>(&bytes)?, CacheStatus::Miss)),
            Err(err) => Err(AppError::from_shared(err)),
        }
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<(T, Timestamp)> {
        match self.store.get(key).await {
            Ok(Some(entry)) => match decode::<T>(&entry.value) {
                Ok(value) => Some((value, entry.stored_at)),
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "Ignoring undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(
                    key = %key,
                    backend = self.store.backend(),
                    error = %err,
                    "Cache read failed, treating as miss"
                );
                None
            }
        }
    }

    #[cfg(test)]
    fn current_flight(&self, key: &str) -> Option<Flight> {
        self.flights.get(key).map(|flight| flight.clone())
    }

    /// Joins the running fetch for `key` or starts one. The flag is true when
    /// a new fetch was started.
    fn join_or_start<T, F, Fut>(
        &self,
        key: &str,
        baseline: Option<Timestamp>,
        producer: F,
    ) -> (Flight, bool)
    where
        T: Serialize + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        let id = self.next_flight.fetch_add(1, Ordering::Relaxed);
        let (tx, flight) = match self.flights.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if !occupied.get().is_abandoned() {
                    return (occupied.get().clone(), false);
                }
                let (tx, rx) = watch::channel(None);
                let flight = Flight { id, rx };
                occupied.insert(flight.clone());
                (tx, flight)
            }
            Entry::Vacant(vacant) => {
                let (tx, rx) = watch::channel(None);
                let flight = Flight { id, rx };
                vacant.insert(flight.clone());
                (tx, flight)
            }
        };

        let store = self.store.clone();
        let flights = self.flights.clone();
        let options = self.options;
        let key = key.to_string();

        tokio::spawn(async move {
            let outcome = run_flight(store, &key, baseline, options, producer).await;
            tx.send_replace(Some(outcome));
            flights.remove_if(&key, |_, flight| flight.id == id);
        });

        (flight, true)
    }
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> AppResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

fn jittered(base: Duration) -> Duration {
    let spread = (base.as_millis() as u64 / 2).max(1);
    base + Duration::from_millis(rand::rng().random_range(0..=spread))
}

fn timed_out(key: &str, operation: &str, after: Duration) -> Arc<AppError> {
    Arc::new(AppError::Timeout {
        operation: format!("{} for cache key {}", operation, key),
        timeout_ms: after.as_millis() as u64,
    })
}

async fn release(store: &Arc<dyn CacheStore>, key: &str) {
    if let Err(err) = store.end_fetch(key).await {
        tracing::warn!(key = %key, error = %err, "Failed to clear in-flight marker");
    }
}

/// Body of a spawned fetch: take the store-level marker, run the producer,
/// store the result.
async fn run_flight<T, F, Fut>(
    store: Arc<dyn CacheStore>,
    key: &str,
    baseline: Option<Timestamp>,
    options: WrapOptions,
    producer: F,
) -> FlightOutcome
where
    T: Serialize + Send + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = AppResult<T>> + Send + 'static,
{
    let deadline = Instant::now() + options.fetch_timeout;
    let mut waited = false;

    loop {
        let acquired = match store.try_begin_fetch(key).await {
            Ok(acquired) => acquired,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "In-flight marker unavailable, fetching anyway");
                true
            }
        };
        if acquired {
            break;
        }
        if Instant::now() >= deadline {
            return Err(timed_out(key, "waiting for in-flight fetch", options.fetch_timeout));
        }
        waited = true;
        tokio::time::sleep(jittered(options.poll_interval)).await;
    }

    if waited {
        // another process held the marker; its result may already be stored
        if let Ok(Some(entry)) = store.get(key).await
            && baseline.is_none_or(|seen| entry.stored_at > seen)
        {
            release(&store, key).await;
            return Ok(Arc::new(entry.value));
        }
    }

    let started = Instant::now();
    let produced = tokio::time::timeout(
        options.fetch_timeout,
        AssertUnwindSafe(producer()).catch_unwind(),
    )
    .await;

    let value = match produced {
        Ok(Ok(Ok(value))) => value,
        Ok(Ok(Err(err))) => {
            release(&store, key).await;
            tracing::warn!(key = %key, error = %err, "Cache producer failed");
            return Err(Arc::new(err));
        }
        Ok(Err(_panic)) => {
            release(&store, key).await;
            tracing::error!(key = %key, "Cache producer panicked");
            return Err(Arc::new(AppError::Internal {
                source: anyhow::anyhow!("producer for cache key {} panicked", key),
            }));
        }
        Err(_) => {
            release(&store, key).await;
            tracing::warn!(key = %key, "Cache producer timed out");
            return Err(timed_out(key, "producer", options.fetch_timeout));
        }
    };

    let bytes = match serde_json::to_vec(&value) {
        Ok(bytes) => bytes,
        Err(err) => {
            release(&store, key).await;
            return Err(Arc::new(err.into()));
        }
    };

    if let Err(err) = store.set(key, bytes.clone()).await {
        tracing::warn!(key = %key, error = %err, "Cache write failed");
        release(&store, key).await;
    }

    tracing::debug!(
        key = %key,
        elapsed_ms = started.elapsed().as_millis() as u64,
        bytes = bytes.len(),
        "Cache entry refreshed"
    );

    Ok(Arc::new(bytes))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;

    use super::*;
    use crate::cache::{CacheEntry, ManualClock};
    use crate::config::settings::MemoryCacheConfig;

    const HOUR: u64 = 60 * 60;

    fn options() -> WrapOptions {
        WrapOptions {
            wait_budget: Duration::from_millis(200),
            fetch_timeout: Duration::from_secs(2),
            poll_interval: Duration::from_millis(10),
        }
    }

    fn window() -> FreshnessWindow {
        FreshnessWindow::new(Some(HOUR), Some(2 * HOUR), Some(5 * HOUR))
    }

    struct Fixture {
        manager: CacheManager,
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        calls: Arc<AtomicUsize>,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new());
        let store = Arc::new(MemoryStore::new(
            &MemoryCacheConfig { max_size: 100 },
            Duration::from_secs(60),
            clock.clone(),
        ));
        let manager = CacheManager::with_store(store.clone(), clock.clone(), options());
        Fixture {
            manager,
            store,
            clock,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn counting(
        calls: &Arc<AtomicUsize>,
        result: AppResult<String>,
        delay: Duration,
    ) -> impl FnOnce() -> futures::future::BoxFuture<'static, AppResult<String>> + Send + 'static {
        let calls = calls.clone();
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                result
            }
            .boxed()
        }
    }

    fn ok(value: &str) -> AppResult<String> {
        Ok(value.to_string())
    }

    fn upstream_failure() -> AppResult<String> {
        Err(AppError::Upstream {
            provider: "tmdb".to_string(),
            message: "service unavailable".to_string(),
            status: Some(503),
            source: None,
        })
    }

    async fn seed(f: &Fixture, key: &str, value: &str) {
        f.store
            .set(key, serde_json::to_vec(value).unwrap())
            .await
            .unwrap();
    }

    async fn stored(f: &Fixture, key: &str) -> Option<String> {
        f.store
            .get(key)
            .await
            .unwrap()
            .map(|entry| serde_json::from_slice(&entry.value).unwrap())
    }

    async fn wait_until_stored(f: &Fixture, key: &str, expected: &str) {
        for _ in 0..200 {
            if stored(f, key).await.as_deref() == Some(expected) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("value for {} never became {}", key, expected);
    }

    #[tokio::test]
    async fn test_miss_calls_producer_and_stores() {
        let f = fixture();
        let result = f
            .manager
            .wrap_with_window("k", window(), counting(&f.calls, ok("v1"), Duration::ZERO))
            .await
            .unwrap();

        assert_eq!(result, Cached::new("v1".to_string(), CacheStatus::Miss));
        assert_eq!(f.calls.load(Ordering::SeqCst), 1);
        assert_eq!(stored(&f, "k").await.as_deref(), Some("v1"));
    }

    #[tokio::test]
    async fn test_fresh_value_skips_producer() {
        let f = fixture();
        seed(&f, "k", "cached").await;
        f.clock.advance(Duration::from_secs(HOUR - 1));

        let result = f
            .manager
            .wrap_with_window("k", window(), counting(&f.calls, ok("new"), Duration::ZERO))
            .await
            .unwrap();

        assert_eq!(result, Cached::new("cached".to_string(), CacheStatus::Hit));
        assert_eq!(f.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_revalidate_serves_stale_and_refreshes_once() {
        let f = fixture();
        seed(&f, "k", "old").await;
        f.clock.advance(Duration::from_secs(HOUR + 60));

        for _ in 0..3 {
            let result = f
                .manager
                .wrap_with_window(
                    "k",
                    window(),
                    counting(&f.calls, ok("new"), Duration::from_millis(50)),
                )
                .await
                .unwrap();
            assert_eq!(result, Cached::new("old".to_string(), CacheStatus::Stale));
        }

        wait_until_stored(&f, "k", "new").await;
        assert_eq!(f.calls.load(Ordering::SeqCst), 1);

        let result = f
            .manager
            .wrap_with_window("k", window(), counting(&f.calls, ok("newer"), Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(result, Cached::new("new".to_string(), CacheStatus::Hit));
    }

    #[tokio::test]
    async fn test_background_failure_is_swallowed() {
        let f = fixture();
        seed(&f, "k", "old").await;
        f.clock.advance(Duration::from_secs(HOUR + 60));

        let result = f
            .manager
            .wrap_with_window("k", window(), counting(&f.calls, upstream_failure(), Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(result.status, CacheStatus::Stale);

        for _ in 0..200 {
            if f.manager.current_flight("k").is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(stored(&f, "k").await.as_deref(), Some("old"));
        assert!(!f.store.get("k").await.unwrap().unwrap().fetching);
    }

    #[tokio::test]
    async fn test_stale_if_error_serves_stale_on_failure() {
        let f = fixture();
        seed(&f, "k", "old").await;
        f.clock.advance(Duration::from_secs(4 * HOUR));

        let result = f
            .manager
            .wrap_with_window("k", window(), counting(&f.calls, upstream_failure(), Duration::ZERO))
            .await
            .unwrap();

        assert_eq!(result, Cached::new("old".to_string(), CacheStatus::StaleOnError));
        assert_eq!(f.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_if_error_returns_refreshed_value() {
        let f = fixture();
        seed(&f, "k", "old").await;
        f.clock.advance(Duration::from_secs(4 * HOUR));

        let result = f
            .manager
            .wrap_with_window("k", window(), counting(&f.calls, ok("new"), Duration::ZERO))
            .await
            .unwrap();

        assert_eq!(result, Cached::new("new".to_string(), CacheStatus::Miss));
        assert_eq!(stored(&f, "k").await.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_stale_if_error_wait_is_bounded() {
        let f = fixture();
        seed(&f, "k", "old").await;
        f.clock.advance(Duration::from_secs(4 * HOUR));

        let started = Instant::now();
        let result = f
            .manager
            .wrap_with_window(
                "k",
                window(),
                counting(&f.calls, ok("slow"), Duration::from_millis(800)),
            )
            .await
            .unwrap();

        assert_eq!(result, Cached::new("old".to_string(), CacheStatus::StaleOnError));
        assert!(started.elapsed() < Duration::from_millis(700));
        // the fetch keeps running and lands later
        wait_until_stored(&f, "k", "slow").await;
    }

    #[tokio::test]
    async fn test_expired_failure_propagates() {
        let f = fixture();
        seed(&f, "k", "ancient").await;
        f.clock.advance(Duration::from_secs(6 * HOUR + 1));

        let err = f
            .manager
            .wrap_with_window("k", window(), counting(&f.calls, upstream_failure(), Duration::ZERO))
            .await
            .unwrap_err();

        assert_eq!(err.upstream_status(), Some(503));
        assert_eq!(stored(&f, "k").await.as_deref(), Some("ancient"));
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_fetch() {
        let f = fixture();
        let mut handles = Vec::new();
        for _ in 0..10 {
            let manager = f.manager.clone();
            let producer = counting(&f.calls, ok("shared"), Duration::from_millis(50));
            handles.push(tokio::spawn(async move {
                manager.wrap_with_window("k", window(), producer).await
            }));
        }

        for handle in handles {
            let result = handle.await.unwrap().unwrap();
            assert_eq!(result.value, "shared");
        }
        assert_eq!(f.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_failure() {
        let f = fixture();
        let mut handles = Vec::new();
        for _ in 0..10 {
            let manager = f.manager.clone();
            let producer = counting(&f.calls, upstream_failure(), Duration::from_millis(50));
            handles.push(tokio::spawn(async move {
                manager.wrap_with_window("k", window(), producer).await
            }));
        }

        for handle in handles {
            let err = handle.await.unwrap().unwrap_err();
            assert_eq!(err.upstream_status(), Some(503));
        }
        assert_eq!(f.calls.load(Ordering::SeqCst), 1);
    }

    /// Runs `callers` concurrent wraps of "k", each with its own producer.
    async fn concurrent_wraps(
        f: &Fixture,
        callers: usize,
        result: fn() -> AppResult<String>,
        delay: Duration,
    ) -> Vec<AppResult<Cached<String>>> {
        let mut handles = Vec::new();
        for _ in 0..callers {
            let manager = f.manager.clone();
            let producer = counting(&f.calls, result(), delay);
            handles.push(tokio::spawn(async move {
                manager.wrap_with_window("k", window(), producer).await
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        results
    }

    #[tokio::test]
    async fn test_concurrent_expired_callers_share_one_fetch() {
        let f = fixture();
        seed(&f, "k", "ancient").await;
        f.clock.advance(Duration::from_secs(6 * HOUR + 1));

        let results = concurrent_wraps(&f, 20, || ok("new"), Duration::from_millis(100)).await;

        for result in results {
            assert_eq!(result.unwrap().value, "new");
        }
        assert_eq!(f.calls.load(Ordering::SeqCst), 1);
        assert_eq!(stored(&f, "k").await.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_concurrent_expired_callers_share_one_failure() {
        let f = fixture();
        seed(&f, "k", "ancient").await;
        f.clock.advance(Duration::from_secs(6 * HOUR + 1));

        let results =
            concurrent_wraps(&f, 20, upstream_failure, Duration::from_millis(100)).await;

        for result in results {
            assert_eq!(result.unwrap_err().upstream_status(), Some(503));
        }
        assert_eq!(f.calls.load(Ordering::SeqCst), 1);
        assert_eq!(stored(&f, "k").await.as_deref(), Some("ancient"));
        assert!(!f.store.get("k").await.unwrap().unwrap().fetching);
    }

    #[tokio::test]
    async fn test_concurrent_stale_if_error_callers_share_one_failure() {
        let f = fixture();
        seed(&f, "k", "old").await;
        f.clock.advance(Duration::from_secs(4 * HOUR));

        let results =
            concurrent_wraps(&f, 20, upstream_failure, Duration::from_millis(50)).await;

        for result in results {
            assert_eq!(
                result.unwrap(),
                Cached::new("old".to_string(), CacheStatus::StaleOnError)
            );
        }
        assert_eq!(f.calls.load(Ordering::SeqCst), 1);
        assert_eq!(stored(&f, "k").await.as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn test_concurrent_revalidate_starts_one_refresh() {
        let f = fixture();
        seed(&f, "k", "old").await;
        f.clock.advance(Duration::from_secs(HOUR + 60));

        let results = concurrent_wraps(&f, 20, || ok("new"), Duration::from_millis(200)).await;

        for result in results {
            assert_eq!(
                result.unwrap(),
                Cached::new("old".to_string(), CacheStatus::Stale)
            );
        }
        wait_until_stored(&f, "k", "new").await;
        assert_eq!(f.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_policy_uses_stored_value() {
        let f = fixture();
        seed(&f, "k", "long-lived").await;
        f.clock.advance(Duration::from_secs(3 * HOUR));

        let policy = |value: &String| {
            if value.starts_with("long") {
                FreshnessWindow::new(Some(10 * HOUR), None, None)
            } else {
                FreshnessWindow::default()
            }
        };
        let result = f
            .manager
            .wrap("k", policy, counting(&f.calls, ok("new"), Duration::ZERO))
            .await
            .unwrap();

        assert_eq!(result.status, CacheStatus::Hit);
        assert_eq!(f.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_waits_for_marker_held_elsewhere() {
        let f = fixture();
        assert!(f.store.try_begin_fetch("k").await.unwrap());

        let store = f.store.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            store
                .set("k", serde_json::to_vec("from elsewhere").unwrap())
                .await
                .unwrap();
        });

        let result = f
            .manager
            .wrap_with_window("k", window(), counting(&f.calls, ok("mine"), Duration::ZERO))
            .await
            .unwrap();

        assert_eq!(result.value, "from elsewhere");
        assert_eq!(f.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_panicking_producer_fails_and_key_recovers() {
        let f = fixture();
        let err = f
            .manager
            .wrap_with_window("k", window(), || async {
                if true {
                    panic!("producer exploded");
                }
                Ok::<String, AppError>(String::new())
            })
            .await
            .unwrap_err();
        assert!(matches!(err.root(), AppError::Internal { .. }));

        let result = f
            .manager
            .wrap_with_window("k", window(), counting(&f.calls, ok("v"), Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(result.value, "v");
    }

    #[tokio::test]
    async fn test_producer_timeout() {
        let f = fixture();
        let manager = CacheManager::with_store(
            f.store.clone(),
            f.clock.clone(),
            WrapOptions {
                fetch_timeout: Duration::from_millis(50),
                ..options()
            },
        );

        let err = manager
            .wrap_with_window("k", window(), counting(&f.calls, ok("late"), Duration::from_secs(1)))
            .await
            .unwrap_err();
        assert!(matches!(err.root(), AppError::Timeout { .. }));
    }

    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        fn backend(&self) -> &'static str {
            "broken"
        }

        async fn get(&self, _key: &str) -> Result<Option<CacheEntry>, CacheError> {
            Err(CacheError::Connection("refused".to_string()))
        }

        async fn set(&self, _key: &str, _value: Vec<u8>) -> Result<(), CacheError> {
            Err(CacheError::Connection("refused".to_string()))
        }

        async fn try_begin_fetch(&self, _key: &str) -> Result<bool, CacheError> {
            Err(CacheError::Connection("refused".to_string()))
        }

        async fn end_fetch(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::Connection("refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_store_failures_do_not_fail_requests() {
        let calls = Arc::new(AtomicUsize::new(0));
        let manager = CacheManager::with_store(Arc::new(BrokenStore), Arc::new(SystemClock), options());

        let result = manager
            .wrap_with_window("k", window(), counting(&calls, ok("direct"), Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(result, Cached::new("direct".to_string(), CacheStatus::Miss));
        assert!(manager.probe().await.is_err());
    }

    #[test]
    fn test_status_header_values() {
        assert_eq!(CacheStatus::Hit.as_str(), "hit");
        assert_eq!(CacheStatus::StaleOnError.to_string(), "stale-on-error");
    }

    #[test]
    fn test_jitter_stays_within_half_interval() {
        let base = Duration::from_millis(100);
        for _ in 0..50 {
            let d = jittered(base);
            assert!(d >= base && d <= Duration::from_millis(150));
        }
    }
}
