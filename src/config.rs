use serde::{Deserialize, Serialize};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_WHOIS_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RESPONSE_SIZE: usize = 1024 * 1024;
const DEFAULT_MAX_REFERRALS: usize = 2;
const DEFAULT_CACHE_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_CACHE_SWEEP_SECS: u64 = 60 * 60;
const DEFAULT_CACHE_MAX_ENTRIES: u64 = 100_000;

/// How upstream WHOIS lookups are serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockPolicy {
    /// One lock for every lookup in the process.
    Global,
    /// One lock per domain being looked up.
    PerDomain,
}

impl LockPolicy {
    fn as_str(&self) -> &'static str {
        match self {
            LockPolicy::Global => "global",
            LockPolicy::PerDomain => "per_domain",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub whois_timeout_seconds: u64,
    pub max_response_size: usize,
    pub max_referrals: usize,
    pub cache_ttl_seconds: u64,
    pub cache_sweep_interval_seconds: u64,
    pub cache_max_entries: u64,
    pub cache_failures: bool,        // Store error results like successes
    pub normalize_cache_keys: bool,  // Lowercase/trim keys before caching
    pub lookup_lock: LockPolicy,
    pub cors_enabled: bool,
    pub metrics_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigData {
    pub host: String,
    pub port: u16,
    pub whois_timeout_seconds: u64,
    pub max_response_size: usize,
    pub max_referrals: usize,
    pub cache_ttl_seconds: u64,
    pub cache_sweep_interval_seconds: u64,
    pub cache_max_entries: u64,
    pub cache_failures: bool,
    pub normalize_cache_keys: bool,
    pub lookup_lock: LockPolicy,
    pub cors_enabled: bool,
    pub metrics_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            whois_timeout_seconds: DEFAULT_WHOIS_TIMEOUT_SECS,
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
            max_referrals: DEFAULT_MAX_REFERRALS,
            cache_ttl_seconds: DEFAULT_CACHE_TTL_SECS,
            cache_sweep_interval_seconds: DEFAULT_CACHE_SWEEP_SECS,
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            cache_failures: true,
            normalize_cache_keys: false,
            lookup_lock: LockPolicy::Global,
            cors_enabled: true,
            metrics_enabled: false,
        }
    }
}

impl Config {
    /// Load configuration from defaults overridden by the process environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Load configuration from defaults overridden by the given variables.
    pub fn from_vars<I>(vars: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let defaults = Config::default();

        let mut settings = config::Config::builder()
            .set_default("host", defaults.host.as_str())?
            .set_default("port", defaults.port as i64)?
            .set_default("whois_timeout_seconds", defaults.whois_timeout_seconds)?
            .set_default("max_response_size", defaults.max_response_size as i64)?
            .set_default("max_referrals", defaults.max_referrals as i64)?
            .set_default("cache_ttl_seconds", defaults.cache_ttl_seconds)?
            .set_default("cache_sweep_interval_seconds", defaults.cache_sweep_interval_seconds)?
            .set_default("cache_max_entries", defaults.cache_max_entries)?
            .set_default("cache_failures", defaults.cache_failures)?
            .set_default("normalize_cache_keys", defaults.normalize_cache_keys)?
            .set_default("lookup_lock", defaults.lookup_lock.as_str())?
            .set_default("cors_enabled", defaults.cors_enabled)?
            .set_default("metrics_enabled", defaults.metrics_enabled)?;

        settings = Self::apply_env_overrides(settings, vars)?;

        let config_data: ConfigData = settings.build()?.try_deserialize()?;

        Ok(Config {
            host: config_data.host,
            port: config_data.port,
            whois_timeout_seconds: config_data.whois_timeout_seconds,
            max_response_size: config_data.max_response_size,
            max_referrals: config_data.max_referrals,
            cache_ttl_seconds: config_data.cache_ttl_seconds,
            cache_sweep_interval_seconds: config_data.cache_sweep_interval_seconds,
            cache_max_entries: config_data.cache_max_entries,
            cache_failures: config_data.cache_failures,
            normalize_cache_keys: config_data.normalize_cache_keys,
            lookup_lock: config_data.lookup_lock,
            cors_enabled: config_data.cors_enabled,
            metrics_enabled: config_data.metrics_enabled,
        })
    }

    fn apply_env_overrides<I>(
        mut settings: config::ConfigBuilder<config::builder::DefaultState>,
        vars: I,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let env_mappings = [
            ("LISTEN_HOST", "host"),
            ("PORT", "port"),
            ("WHOIS_TIMEOUT_SECONDS", "whois_timeout_seconds"),
            ("WHOIS_TIMEOUT", "whois_timeout_seconds"),
            ("MAX_RESPONSE_SIZE", "max_response_size"),
            ("MAX_REFERRALS", "max_referrals"),
            ("CACHE_TTL_SECONDS", "cache_ttl_seconds"),
            ("CACHE_TTL", "cache_ttl_seconds"),
            ("CACHE_SWEEP_INTERVAL_SECONDS", "cache_sweep_interval_seconds"),
            ("CACHE_MAX_ENTRIES", "cache_max_entries"),
            ("CACHE_FAILURES", "cache_failures"),
            ("NORMALIZE_CACHE_KEYS", "normalize_cache_keys"),
            ("LOOKUP_LOCK", "lookup_lock"),
            ("CORS_ENABLED", "cors_enabled"),
            ("METRICS_ENABLED", "metrics_enabled"),
        ];

        for (env_var, value) in vars {
            if let Some((_, config_key)) = env_mappings.iter().find(|(name, _)| *name == env_var) {
                settings = settings.set_override(*config_key, value)?;
            }
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(Vec::new()).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.cache_ttl_seconds, 86_400);
        assert_eq!(config.cache_sweep_interval_seconds, 3_600);
        assert!(config.cache_failures);
        assert!(!config.normalize_cache_keys);
        assert_eq!(config.lookup_lock, LockPolicy::Global);
        assert!(config.cors_enabled);
        assert!(!config.metrics_enabled);
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::from_vars(vars(&[
            ("PORT", "9090"),
            ("CACHE_TTL", "60"),
            ("CACHE_FAILURES", "false"),
            ("LOOKUP_LOCK", "per_domain"),
            ("UNRELATED", "ignored"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.cache_ttl_seconds, 60);
        assert!(!config.cache_failures);
        assert_eq!(config.lookup_lock, LockPolicy::PerDomain);
    }

    #[test]
    fn test_invalid_lock_policy() {
        let result = Config::from_vars(vars(&[("LOOKUP_LOCK", "sometimes")]));
        assert!(result.is_err());
    }
}
