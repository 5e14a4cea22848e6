use crate::{config::Config, DomainResult};
use moka::future::Cache;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// In-memory TTL cache of domain check results.
///
/// Expired entries are never returned. A background task additionally runs
/// moka's maintenance every sweep interval so expired entries are evicted
/// even when nobody reads them.
pub struct CacheService {
    cache: Cache<String, DomainResult>,
    normalize_keys: bool,
    sweeper: Option<JoinHandle<()>>,
}

impl CacheService {
    pub fn new(config: &Config) -> Self {
        Self::with_settings(
            Duration::from_secs(config.cache_ttl_seconds),
            Duration::from_secs(config.cache_sweep_interval_seconds),
            config.cache_max_entries,
            config.normalize_cache_keys,
        )
    }

    pub fn with_settings(ttl: Duration, sweep_interval: Duration, max_entries: u64, normalize_keys: bool) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        let sweeper = Self::spawn_sweeper(cache.clone(), sweep_interval);

        Self { cache, normalize_keys, sweeper }
    }

    fn spawn_sweeper(cache: Cache<String, DomainResult>, sweep_interval: Duration) -> Option<JoinHandle<()>> {
        if sweep_interval.is_zero() {
            return None;
        }

        // Outside a runtime there is nothing to drive the task; reads still
        // honor the TTL.
        let handle = tokio::runtime::Handle::try_current().ok()?;
        Some(handle.spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                cache.run_pending_tasks().await;
                debug!("Cache sweep finished, {} entries remain", cache.entry_count());
            }
        }))
    }

    pub async fn get(&self, domain: &str) -> Option<DomainResult> {
        let key = self.key_for(domain);

        match self.cache.get(&key).await {
            Some(result) => {
                debug!("Cache hit for domain: {}", domain);
                Some(result)
            }
            None => {
                debug!("Cache miss for domain: {}", domain);
                None
            }
        }
    }

    pub async fn set(&self, domain: &str, result: &DomainResult) {
        let key = self.key_for(domain);
        self.cache.insert(key, result.clone()).await;
        debug!("Cached result for domain: {}", domain);
    }

    /// Evict expired entries now instead of waiting for the next sweep.
    pub async fn sweep(&self) {
        self.cache.run_pending_tasks().await;
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    fn key_for(&self, domain: &str) -> String {
        if !self.normalize_keys {
            return domain.to_string();
        }

        let normalized = domain.trim().to_lowercase();
        match normalized.strip_suffix('.') {
            Some(stripped) => stripped.to_string(),
            None => normalized,
        }
    }
}

impl Drop for CacheService {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
    }
}
