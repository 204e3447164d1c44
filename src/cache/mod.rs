//! Rule cache: one cached or in-flight rule list per `(provider, model)`.
//!
//! Backed by moka's async cache. Concurrent lookups for the same key share a
//! single fetch (`try_get_with` coalesces initialisers); failed fetches are
//! not cached, so the next lookup for that key fetches again.

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::future::Cache;
use tracing::debug;

use crate::MimirError;
use crate::rules::RuleFetcher;
use crate::telemetry;
use crate::types::{ParameterRule, RuleKey};

/// Shared, immutable rule list as handed out by the cache.
pub type SharedRules = Arc<[ParameterRule]>;

/// Configuration for the rule cache.
///
/// ```rust
/// # use mimir::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(64)
///     .ttl(Duration::from_secs(300));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum cached rule lists. Default: 256.
    pub max_entries: u64,
    /// Time-to-live for a cached rule list. Default: 10 minutes.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 256,
            ttl: Duration::from_secs(600),
        }
    }
}

impl CacheConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached rule lists.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the time-to-live for cached rule lists.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// In-memory cache of fetched rule lists keyed on [`RuleKey`].
pub struct RuleCache {
    cache: Cache<RuleKey, SharedRules>,
}

impl RuleCache {
    /// Create a cache from the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .build();
        Self { cache }
    }

    /// Cached rules for `key`, without fetching.
    pub async fn get(&self, key: &RuleKey) -> Option<SharedRules> {
        self.cache.get(key).await
    }

    /// Return cached rules for `key`, fetching through `fetcher` on a miss.
    ///
    /// Concurrent callers for the same key wait on the same fetch.
    pub async fn get_or_fetch(
        &self,
        key: &RuleKey,
        fetcher: &dyn RuleFetcher,
    ) -> Result<SharedRules, Arc<MimirError>> {
        if let Some(hit) = self.cache.get(key).await {
            metrics::counter!(telemetry::RULE_CACHE_HITS_TOTAL).increment(1);
            return Ok(hit);
        }
        metrics::counter!(telemetry::RULE_CACHE_MISSES_TOTAL).increment(1);

        self.cache
            .try_get_with(key.clone(), async {
                debug!(fetcher = fetcher.name(), %key, "fetching parameter rules");
                let start = Instant::now();
                let result = fetcher.fetch_rules(key).await;
                record_fetch(key.provider(), start, result.is_ok());
                result.map(SharedRules::from)
            })
            .await
    }

    /// Drop the cached entry for `key`.
    pub async fn invalidate(&self, key: &RuleKey) {
        self.cache.invalidate(key).await;
    }

    /// Drop all cached entries.
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    /// Approximate number of cached entries.
    pub fn len(&self) -> u64 {
        self.cache.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn record_fetch(provider: &str, start: Instant, ok: bool) {
    let status = if ok { "ok" } else { "error" };
    metrics::counter!(telemetry::RULE_FETCHES_TOTAL,
        "provider" => provider.to_owned(),
        "status" => status,
    )
    .increment(1);
    metrics::histogram!(telemetry::RULE_FETCH_DURATION_SECONDS,
        "provider" => provider.to_owned(),
    )
    .record(start.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::Result;
    use crate::types::ParameterType;

    struct CountingFetcher {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl RuleFetcher for CountingFetcher {
        fn name(&self) -> &str {
            "counting"
        }

        async fn fetch_rules(&self, _key: &RuleKey) -> Result<Vec<ParameterRule>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(MimirError::Http("connection refused".into()));
            }
            Ok(vec![ParameterRule::new("temperature", ParameterType::Float)])
        }
    }

    fn key() -> RuleKey {
        RuleKey::new("openai", "gpt-4o").unwrap()
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let cache = RuleCache::new(&CacheConfig::new());
        let fetcher = CountingFetcher {
            calls: AtomicUsize::new(0),
            fail: false,
        };

        let first = cache.get_or_fetch(&key(), &fetcher).await.unwrap();
        let second = cache.get_or_fetch(&key(), &fetcher).await.unwrap();

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cache = RuleCache::new(&CacheConfig::new());
        let fetcher = CountingFetcher {
            calls: AtomicUsize::new(0),
            fail: true,
        };

        assert!(cache.get_or_fetch(&key(), &fetcher).await.is_err());
        assert!(cache.get_or_fetch(&key(), &fetcher).await.is_err());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        assert!(cache.get(&key()).await.is_none());
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let cache = RuleCache::new(&CacheConfig::new());
        let fetcher = CountingFetcher {
            calls: AtomicUsize::new(0),
            fail: false,
        };

        cache.get_or_fetch(&key(), &fetcher).await.unwrap();
        cache.invalidate(&key()).await;
        cache.get_or_fetch(&key(), &fetcher).await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn config_builder_pattern() {
        let config = CacheConfig::new()
            .max_entries(10)
            .ttl(Duration::from_secs(5));
        assert_eq!(config.max_entries, 10);
        assert_eq!(config.ttl, Duration::from_secs(5));
    }
}
