use crate::{
    cache::CacheService,
    classifier,
    config::{Config, LockPolicy},
    date,
    errors::CheckError,
    lock::LookupLock,
    parser::{TextWhoisParser, WhoisParser},
    whois::{TcpWhoisClient, WhoisFetcher},
    DomainResult,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A check result and whether it was served from cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub result: DomainResult,
    pub cached: bool,
}

/// Process-scoped state for domain age checks: collaborators, cache and
/// the lock serializing upstream lookups.
pub struct DomainAgeChecker {
    fetcher: Arc<dyn WhoisFetcher>,
    parser: Arc<dyn WhoisParser>,
    cache: Arc<CacheService>,
    lookup_lock: LookupLock,
    cache_failures: bool,
}

impl DomainAgeChecker {
    pub fn new(
        fetcher: Arc<dyn WhoisFetcher>,
        parser: Arc<dyn WhoisParser>,
        cache: Arc<CacheService>,
        lock_policy: LockPolicy,
        cache_failures: bool,
    ) -> Self {
        Self {
            fetcher,
            parser,
            cache,
            lookup_lock: LookupLock::new(lock_policy),
            cache_failures,
        }
    }

    /// Wire the port-43 client and text parser from configuration.
    pub fn from_config(config: &Config) -> Self {
        info!(
            "Domain age checker: lock={:?}, cache_ttl={}s, cache_failures={}",
            config.lookup_lock, config.cache_ttl_seconds, config.cache_failures
        );

        Self::new(
            Arc::new(TcpWhoisClient::new(config)),
            Arc::new(TextWhoisParser::new()),
            Arc::new(CacheService::new(config)),
            config.lookup_lock,
            config.cache_failures,
        )
    }

    /// Check a domain, consulting the cache before going upstream.
    ///
    /// Failures never escape: they come back as a result with `error` set.
    pub async fn check(&self, domain: &str) -> CheckOutcome {
        if let Some(result) = self.cache.get(domain).await {
            return CheckOutcome { result, cached: true };
        }

        let _guard = self.lookup_lock.acquire(domain).await;

        // Another request may have filled the slot while this one queued.
        if let Some(result) = self.cache.get(domain).await {
            debug!("Lookup for {} satisfied while waiting for the lock", domain);
            return CheckOutcome { result, cached: true };
        }

        let result = match self.lookup(domain).await {
            Ok(result) => {
                info!(
                    "Domain {} created {} (recent: {})",
                    domain, result.created_date, result.is_recently_registered
                );
                result
            }
            Err(e) => {
                warn!("Domain check for {} failed: {}", domain, e);
                DomainResult::failed(domain, &e)
            }
        };

        if !result.is_error() || self.cache_failures {
            self.cache.set(domain, &result).await;
        }

        CheckOutcome { result, cached: false }
    }

    async fn lookup(&self, domain: &str) -> Result<DomainResult, CheckError> {
        let raw = self.fetcher.fetch(domain).await.map_err(CheckError::WhoisFetch)?;
        let parsed = self.parser.parse(&raw).map_err(CheckError::WhoisParse)?;

        let creation_date = parsed
            .creation_date
            .filter(|date| !date.trim().is_empty())
            .ok_or(CheckError::MissingCreationDate)?;

        let created = date::normalize_creation_date(&creation_date)?;
        let recent = classifier::is_recently_registered(created, Utc::now());

        Ok(DomainResult::resolved(domain, date::format_canonical(&created), recent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::WhoisError;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    struct StubFetcher {
        reply: Option<String>,
        calls: AtomicUsize,
    }

    impl StubFetcher {
        fn answering(raw: &str) -> Arc<Self> {
            Arc::new(Self { reply: Some(raw.to_string()), calls: AtomicUsize::new(0) })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self { reply: None, calls: AtomicUsize::new(0) })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WhoisFetcher for StubFetcher {
        async fn fetch(&self, _domain: &str) -> Result<String, WhoisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone().ok_or(WhoisError::Timeout)
        }
    }

    fn checker_with(fetcher: Arc<StubFetcher>, cache: CacheService, cache_failures: bool) -> DomainAgeChecker {
        DomainAgeChecker::new(
            fetcher,
            Arc::new(TextWhoisParser::new()),
            Arc::new(cache),
            LockPolicy::Global,
            cache_failures,
        )
    }

    fn default_cache() -> CacheService {
        CacheService::new(&Config::default())
    }

    fn whois_created(created: &str) -> String {
        format!("Domain Name: example.com\nCreation Date: {}\nRegistrar: Example Registrar\n", created)
    }

    #[tokio::test]
    async fn test_recent_domain() {
        let created = (Utc::now() - ChronoDuration::days(30)).format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let checker = checker_with(StubFetcher::answering(&whois_created(&created)), default_cache(), true);

        let outcome = checker.check("example.com").await;
        assert!(!outcome.cached);
        assert!(outcome.result.is_recently_registered);
        assert_eq!(outcome.result.created_date, &created[..10]);
        assert!(outcome.result.error.is_none());
    }

    #[tokio::test]
    async fn test_old_domain_with_annotated_date() {
        let checker = checker_with(StubFetcher::answering(&whois_created("1995-08-14 #REF-42")), default_cache(), true);

        let outcome = checker.check("example.com").await;
        assert_eq!(outcome.result.created_date, "1995-08-14");
        assert!(!outcome.result.is_recently_registered);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_upstream() {
        let fetcher = StubFetcher::answering(&whois_created("1995-08-14T04:00:00Z"));
        let checker = checker_with(fetcher.clone(), default_cache(), true);

        let first = checker.check("example.com").await;
        let second = checker.check("example.com").await;

        assert!(second.cached);
        assert_eq!(first.result, second.result);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_in_band() {
        let checker = checker_with(StubFetcher::failing(), default_cache(), true);

        let result = checker.check("example.com").await.result;
        assert_eq!(result.created_date, "");
        assert!(!result.is_recently_registered);
        assert_eq!(result.error.as_deref(), Some("Failed to fetch WHOIS: Network timeout"));
    }

    #[tokio::test]
    async fn test_failures_cached_by_default() {
        let fetcher = StubFetcher::failing();
        let checker = checker_with(fetcher.clone(), default_cache(), true);

        checker.check("example.com").await;
        let second = checker.check("example.com").await;

        assert!(second.cached);
        assert!(second.result.is_error());
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_failures_not_cached_when_disabled() {
        let fetcher = StubFetcher::failing();
        let checker = checker_with(fetcher.clone(), default_cache(), false);

        checker.check("example.com").await;
        let second = checker.check("example.com").await;

        assert!(!second.cached);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_parse_and_date_failures() {
        let cases = [
            ("No match for \"EXAMPLE.COM\".\n", "Failed to parse WHOIS data: domain is not found"),
            ("Domain Name: example.com\nRegistrar: Example Registrar\n", "Creation date not found in WHOIS data"),
            (
                "Domain Name: example.com\nCreation Date: not-a-date\n",
                "Failed to parse creation date: unsupported date format: not-a-date",
            ),
        ];

        for (raw, expected) in cases {
            let checker = checker_with(StubFetcher::answering(raw), default_cache(), true);
            let result = checker.check("example.com").await.result;
            assert_eq!(result.error.as_deref(), Some(expected));
            assert_eq!(result.created_date, "");
        }
    }

    #[tokio::test]
    async fn test_expired_entry_triggers_fresh_lookup() {
        let fetcher = StubFetcher::answering(&whois_created("20240115"));
        let cache = CacheService::with_settings(Duration::from_millis(100), Duration::from_secs(3600), 100, false);
        let checker = checker_with(fetcher.clone(), cache, true);

        checker.check("example.com").await;
        checker.check("example.com").await;
        assert_eq!(fetcher.calls(), 1);

        tokio::time::sleep(Duration::from_millis(250)).await;
        let outcome = checker.check("example.com").await;

        assert!(!outcome.cached);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_lookup() {
        let fetcher = StubFetcher::answering(&whois_created("2024-01-15"));
        let checker = Arc::new(checker_with(fetcher.clone(), default_cache(), true));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let checker = checker.clone();
                tokio::spawn(async move { checker.check("example.com").await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().result.created_date, "2024-01-15");
        }
        assert_eq!(fetcher.calls(), 1);
    }
}
