use std::sync::Arc;
use std::time::Duration;

use crate::error::{RedirectorError, Result};
use crate::redirector::{Redirector, Resolution};
use async_trait::async_trait;
use jiff::Timestamp;
use redishort_cache::ScoredCache;
use redishort_core::{Clock, LinkRecord, LinkStore, ShortCode, SystemClock};
use tracing::{debug, trace, warn};
use typed_builder::TypedBuilder;

/// Tuning knobs for [`RedirectorService`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct ResolverConfig {
    /// Upper bound for one background visit increment. Increments that take
    /// longer are abandoned and logged, never retried.
    #[builder(default = Duration::from_secs(2))]
    pub visit_timeout: Duration,
    /// How many times a lookup that failed with a transient store error is
    /// retried before the failure is surfaced.
    #[builder(default = 1)]
    pub lookup_retries: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Service for handling URL redirects.
///
/// Consults the [`ScoredCache`] first and falls back to the [`LinkStore`] on
/// a miss. Records read from the store are offered to the cache with one
/// more visit recorded; the cache decides whether they are worth keeping.
#[derive(Debug)]
pub struct RedirectorService<S, C = SystemClock> {
    store: Arc<S>,
    cache: Arc<ScoredCache>,
    clock: C,
    config: ResolverConfig,
}

impl<S: LinkStore> RedirectorService<S, SystemClock> {
    /// Creates a service backed by the system clock and default settings.
    pub fn new(store: S, cache: Arc<ScoredCache>) -> Self {
        Self::with_config(store, cache, SystemClock, ResolverConfig::default())
    }
}

impl<S: LinkStore, C: Clock> RedirectorService<S, C> {
    pub fn with_config(store: S, cache: Arc<ScoredCache>, clock: C, config: ResolverConfig) -> Self {
        Self {
            store: Arc::new(store),
            cache,
            clock,
            config,
        }
    }

    /// Returns the cache this service resolves through.
    pub fn cache(&self) -> &Arc<ScoredCache> {
        &self.cache
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolves a short code to its redirect target.
    ///
    /// # Returns
    ///
    /// * `Ok(Resolution::Redirect { .. })` - The code is known
    /// * `Ok(Resolution::NotFound)` - Neither cache nor store knows the code
    /// * `Err(RedirectorError::StoreUnavailable(_))` - The store lookup failed
    pub async fn resolve(&self, code: &ShortCode) -> Result<Resolution> {
        Redirector::resolve(self, code).await
    }

    /// Answers from the cache, or `None` if the store has to be consulted.
    fn resolve_cached(&self, code: &ShortCode) -> Option<LinkRecord> {
        if !self.cache.contains(code) {
            return None;
        }
        let now = self.clock.now();

        // the entry can be evicted between the check and the touch
        let record = match self.cache.touch(code, now) {
            Ok(record) => record?,
            Err(err) => {
                warn!(code = %code, error = %err, "dropped incoherent cache entry, falling back to store");
                return None;
            }
        };

        self.cache.stats().record_hit();
        self.record_visit(code.clone(), now);
        Some(record)
    }

    async fn find_in_store(&self, code: &ShortCode) -> Result<Option<LinkRecord>> {
        let mut attempt = 0;
        loop {
            match self.store.find_by_code(code).await {
                Ok(record) => return Ok(record),
                Err(err) if err.is_transient() && attempt < self.config.lookup_retries => {
                    attempt += 1;
                    debug!(code = %code, error = %err, attempt, "retrying store lookup");
                }
                Err(err) => {
                    warn!(code = %code, error = %err, "store lookup failed");
                    return Err(RedirectorError::StoreUnavailable(err));
                }
            }
        }
    }

    /// Pushes one visit to the store without making the caller wait.
    fn record_visit(&self, code: ShortCode, at: Timestamp) {
        let store = Arc::clone(&self.store);
        let timeout = self.config.visit_timeout;

        tokio::spawn(async move {
            match tokio::time::timeout(timeout, store.increment_visit(&code, at)).await {
                Ok(Ok(())) => trace!(code = %code, "recorded visit"),
                Ok(Err(err)) => warn!(code = %code, error = %err, "failed to record visit"),
                Err(_) => warn!(
                    code = %code,
                    timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    "visit increment timed out, abandoning"
                ),
            }
        });
    }
}

#[async_trait]
impl<S: LinkStore, C: Clock> Redirector for RedirectorService<S, C> {
    async fn resolve(&self, code: &ShortCode) -> Result<Resolution> {
        trace!(code = %code, "resolving short code");

        if let Some(record) = self.resolve_cached(code) {
            debug!(code = %code, target = %record.target, "cache hit");
            return Ok(Resolution::Redirect {
                target: record.target,
            });
        }

        let Some(record) = self.find_in_store(code).await? else {
            trace!(code = %code, "short code not found");
            return Ok(Resolution::NotFound);
        };

        let now = self.clock.now();
        let admission = self.cache.admit(record.visited(now));
        self.cache.stats().record_miss();
        self.record_visit(code.clone(), now);

        debug!(
            code = %code,
            target = %record.target,
            cached = admission.is_cached(),
            "resolved from store"
        );
        Ok(Resolution::Redirect {
            target: record.target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redishort_core::{ManualClock, StorageError};
    use redishort_storage::InMemoryLinkStore;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const NOW_MS: i64 = 1_700_000_000_000;

    /// Wraps the in-memory store with call counters and injectable failures.
    #[derive(Default)]
    struct ScriptedStore {
        inner: InMemoryLinkStore,
        lookups: AtomicUsize,
        failing_lookups: AtomicUsize,
        lookup_error_is_transient: AtomicBool,
        failing_increments: AtomicBool,
        increment_delay: Option<Duration>,
    }

    impl ScriptedStore {
        fn lookups(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }

        fn fail_next_lookups(&self, n: usize, transient: bool) {
            self.failing_lookups.store(n, Ordering::SeqCst);
            self.lookup_error_is_transient.store(transient, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl LinkStore for ScriptedStore {
        async fn find_by_code(&self, code: &ShortCode) -> redishort_core::store::Result<Option<LinkRecord>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            let failing = self
                .failing_lookups
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(if self.lookup_error_is_transient.load(Ordering::SeqCst) {
                    StorageError::Unavailable("connection refused".to_string())
                } else {
                    StorageError::Query("syntax error".to_string())
                });
            }
            self.inner.find_by_code(code).await
        }

        async fn find_by_target(&self, target: &str) -> redishort_core::store::Result<Option<LinkRecord>> {
            self.inner.find_by_target(target).await
        }

        async fn insert(&self, record: LinkRecord) -> redishort_core::store::Result<()> {
            self.inner.insert(record).await
        }

        async fn increment_visit(&self, code: &ShortCode, at: Timestamp) -> redishort_core::store::Result<()> {
            if let Some(delay) = self.increment_delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing_increments.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable("write failed".to_string()));
            }
            self.inner.increment_visit(code, at).await
        }
    }

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    fn created(c: &str, target: &str) -> LinkRecord {
        LinkRecord::new(
            code(c),
            target,
            Timestamp::from_millisecond(NOW_MS - 60_000).unwrap(),
        )
    }

    fn service_with(
        store: ScriptedStore,
        capacity: usize,
        config: ResolverConfig,
    ) -> RedirectorService<Arc<ScriptedStore>, ManualClock> {
        RedirectorService::with_config(
            Arc::new(store),
            Arc::new(ScoredCache::new(capacity)),
            ManualClock::at_millis(NOW_MS),
            config,
        )
    }

    fn service(store: ScriptedStore) -> RedirectorService<Arc<ScriptedStore>, ManualClock> {
        service_with(store, 8, ResolverConfig::default())
    }

    async fn store_with(records: &[(&str, &str)]) -> ScriptedStore {
        let store = ScriptedStore::default();
        for (c, target) in records {
            store.inner.insert(created(c, target)).await.unwrap();
        }
        store
    }

    async fn stored_visits(service: &RedirectorService<Arc<ScriptedStore>, ManualClock>, c: &str) -> u64 {
        service
            .store()
            .inner
            .find_by_code(&code(c))
            .await
            .unwrap()
            .map_or(0, |r| r.visit_count)
    }

    #[tokio::test]
    async fn resolve_missing_code_is_not_found() {
        let service = service(ScriptedStore::default());

        let result = service.resolve(&code("missing")).await.unwrap();

        assert_eq!(result, Resolution::NotFound);
        assert!(service.cache().is_empty());
        assert_eq!(service.cache().stats().resolutions(), 0);
        assert!(service.store().inner.is_empty());
    }

    #[tokio::test]
    async fn resolve_cached_code_skips_the_store() {
        let service = service(ScriptedStore::default());
        service.cache().admit(created("hit1", "https://cached.example"));

        let result = service.resolve(&code("hit1")).await.unwrap();

        assert_eq!(
            result,
            Resolution::Redirect {
                target: "https://cached.example".to_string()
            }
        );
        assert_eq!(service.store().lookups(), 0);
        assert_eq!(service.cache().lookup(&code("hit1")).unwrap().visit_count, 1);
        assert_eq!(service.cache().hit_ratio(), 1.0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn store_hit_is_admitted_and_counted() {
        let service = service(store_with(&[("abc123", "https://example.com")]).await);

        let result = service.resolve(&code("abc123")).await.unwrap();

        assert_eq!(
            result,
            Resolution::Redirect {
                target: "https://example.com".to_string()
            }
        );
        let cached = service.cache().lookup(&code("abc123")).unwrap();
        assert_eq!(cached.visit_count, 1);
        assert_eq!(cached.last_visit_at.as_millisecond(), NOW_MS);
        assert!(service.cache().is_coherent());

        awaitility::at_most(Duration::from_secs(2))
            .poll_interval(Duration::from_millis(10))
            .until_async(|| async { stored_visits(&service, "abc123").await == 1 })
            .await;
    }

    #[tokio::test]
    async fn incoherent_cache_entry_is_served_from_store() {
        let service = service(store_with(&[("abc123", "https://example.com")]).await);
        service.cache().admit(created("abc123", "https://example.com"));
        assert!(service.cache().detach_score_entry(&code("abc123")));

        let result = service.resolve(&code("abc123")).await.unwrap();

        assert_eq!(
            result,
            Resolution::Redirect {
                target: "https://example.com".to_string()
            }
        );
        assert_eq!(service.store().lookups(), 1);
        assert_eq!(service.cache().stats().hits(), 0);
        assert_eq!(service.cache().stats().resolutions(), 1);
        // purged, then re-admitted from the store record
        assert!(service.cache().contains(&code("abc123")));
        assert!(service.cache().is_coherent());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn second_resolution_is_a_cache_hit() {
        let service = service(store_with(&[("abc123", "https://example.com")]).await);

        service.resolve(&code("abc123")).await.unwrap();
        service.resolve(&code("abc123")).await.unwrap();
        service.resolve(&code("abc123")).await.unwrap();

        assert_eq!(service.store().lookups(), 1);
        assert_eq!(service.cache().stats().hits(), 2);
        assert_eq!(service.cache().stats().resolutions(), 3);
        assert_eq!(service.cache().lookup(&code("abc123")).unwrap().visit_count, 3);

        awaitility::at_most(Duration::from_secs(2))
            .poll_interval(Duration::from_millis(10))
            .until_async(|| async { stored_visits(&service, "abc123").await == 3 })
            .await;
    }

    #[tokio::test]
    async fn transient_lookup_failure_is_retried_once() {
        let store = store_with(&[("abc123", "https://example.com")]).await;
        store.fail_next_lookups(1, true);
        let service = service(store);

        let result = service.resolve(&code("abc123")).await.unwrap();

        assert!(matches!(result, Resolution::Redirect { .. }));
        assert_eq!(service.store().lookups(), 2);
    }

    #[tokio::test]
    async fn persistent_lookup_failure_is_surfaced() {
        let store = store_with(&[("abc123", "https://example.com")]).await;
        store.fail_next_lookups(5, true);
        let service = service(store);

        let err = service.resolve(&code("abc123")).await.unwrap_err();

        assert!(matches!(
            err,
            RedirectorError::StoreUnavailable(StorageError::Unavailable(_))
        ));
        assert_eq!(service.store().lookups(), 2);
        assert!(service.cache().is_empty());
        assert_eq!(stored_visits(&service, "abc123").await, 0);
    }

    #[tokio::test]
    async fn non_transient_failure_is_not_retried() {
        let store = store_with(&[("abc123", "https://example.com")]).await;
        store.fail_next_lookups(1, false);
        let service = service(store);

        let err = service.resolve(&code("abc123")).await.unwrap_err();

        assert!(matches!(
            err,
            RedirectorError::StoreUnavailable(StorageError::Query(_))
        ));
        assert_eq!(service.store().lookups(), 1);
    }

    #[tokio::test]
    async fn zero_retries_surface_the_first_failure() {
        let store = store_with(&[("abc123", "https://example.com")]).await;
        store.fail_next_lookups(1, true);
        let config = ResolverConfig::builder().lookup_retries(0).build();
        let service = service_with(store, 8, config);

        assert!(service.resolve(&code("abc123")).await.is_err());
        assert_eq!(service.store().lookups(), 1);
    }

    #[tokio::test]
    async fn failing_visit_increment_does_not_change_the_outcome() {
        let store = store_with(&[("abc123", "https://example.com")]).await;
        store.failing_increments.store(true, Ordering::SeqCst);
        let service = service(store);

        for _ in 0..3 {
            let result = service.resolve(&code("abc123")).await.unwrap();
            assert_eq!(
                result,
                Resolution::Redirect {
                    target: "https://example.com".to_string()
                }
            );
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(stored_visits(&service, "abc123").await, 0);
    }

    #[tokio::test]
    async fn slow_visit_increment_is_abandoned() {
        let mut store = store_with(&[("abc123", "https://example.com")]).await;
        store.increment_delay = Some(Duration::from_secs(5));
        let config = ResolverConfig::builder()
            .visit_timeout(Duration::from_millis(20))
            .build();
        let service = service_with(store, 8, config);

        let started = std::time::Instant::now();
        let result = service.resolve(&code("abc123")).await.unwrap();
        assert!(matches!(result, Resolution::Redirect { .. }));
        assert!(started.elapsed() < Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(stored_visits(&service, "abc123").await, 0);
    }

    #[tokio::test]
    async fn low_ranked_record_still_redirects_when_rejected() {
        let store = store_with(&[("cold1", "https://cold.example")]).await;
        let service = service_with(store, 1, ResolverConfig::default());
        // a single, very hot entry fills the cache
        service
            .cache()
            .admit_with_score(created("hot1", "https://hot.example"), f64::MAX);

        let result = service.resolve(&code("cold1")).await.unwrap();

        assert_eq!(
            result,
            Resolution::Redirect {
                target: "https://cold.example".to_string()
            }
        );
        assert!(service.cache().contains(&code("hot1")));
        assert!(!service.cache().contains(&code("cold1")));
        assert_eq!(service.cache().len(), 1);
    }

    #[tokio::test]
    async fn busier_record_displaces_idle_one() {
        let store = store_with(&[("busy1", "https://busy.example")]).await;
        let service = service_with(store, 1, ResolverConfig::default());
        // cached, but never visited: scores zero
        service.cache().admit(created("idle1", "https://idle.example"));

        service.resolve(&code("busy1")).await.unwrap();

        assert!(service.cache().contains(&code("busy1")));
        assert!(!service.cache().contains(&code("idle1")));
    }

    #[tokio::test]
    async fn works_through_the_trait_object() {
        let service: Arc<dyn Redirector> =
            Arc::new(service(store_with(&[("abc123", "https://example.com")]).await));

        assert!(matches!(
            service.resolve(&code("abc123")).await.unwrap(),
            Resolution::Redirect { .. }
        ));
        assert_eq!(
            service.resolve(&code("zzz999")).await.unwrap(),
            Resolution::NotFound
        );
    }
}
