//! Configuration management
//!
//! Settings are resolved in this order of precedence:
//! 1. Environment variables
//! 2. `pd-gateway.toml`
//! 3. Defaults
//!
//! `${VAR_NAME}` inside the TOML file is replaced with the environment value.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

use crate::Error;

/// Default PagerDuty REST endpoint
pub const DEFAULT_API_BASE_URL: &str = "https://api.pagerduty.com";

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "pd-gateway.toml";

/// Bounds for the rendered schedule window, in days
pub const MIN_LOOKAHEAD_DAYS: i64 = 1;
pub const MAX_LOOKAHEAD_DAYS: i64 = 90;

/// PagerDuty account settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PagerDutyConfig {
    /// REST API token
    pub api_token: String,

    /// API base URL. Empty means the public endpoint.
    #[serde(default)]
    pub api_base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Requester email sent as `From` when creating incidents
    #[serde(default)]
    pub from_email: Option<String>,
}

impl Default for PagerDutyConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            api_base_url: String::new(),
            timeout_secs: default_timeout_secs(),
            from_email: None,
        }
    }
}

impl PagerDutyConfig {
    /// Check that the account settings are usable.
    pub fn validate(&self) -> crate::Result<()> {
        if self.api_token.trim().is_empty() {
            return Err(Error::Config("API token is required".to_string()));
        }

        if !self.api_base_url.is_empty() {
            url::Url::parse(&self.api_base_url)
                .map_err(|e| Error::Config(format!("Invalid API base URL: {}", e)))?;
        }

        Ok(())
    }

    /// Effective base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        if self.api_base_url.is_empty() {
            DEFAULT_API_BASE_URL
        } else {
            self.api_base_url.trim_end_matches('/')
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Port for HTTP API server
    #[serde(default = "default_api_port")]
    pub port: u16,

    /// Allowed CORS origins. `None` means permissive.
    #[serde(default)]
    pub allowed_origins: Option<Vec<String>>,

    /// Requests allowed per user per minute
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
            allowed_origins: None,
            rate_limit_per_minute: default_rate_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// SQLite database path. `None` keeps the cache in memory.
    #[serde(default)]
    pub db_path: Option<String>,

    /// How long a cached schedule list is served without refetching
    #[serde(default = "default_schedules_ttl")]
    pub schedules_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            schedules_ttl_secs: default_schedules_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Days of coverage rendered for schedule details
    #[serde(default = "default_lookahead_days")]
    pub lookahead_days: i64,

    /// Page size for schedule and service listings
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            lookahead_days: default_lookahead_days(),
            page_limit: default_page_limit(),
        }
    }
}

impl ScheduleConfig {
    fn clamp_lookahead(mut self) -> Self {
        let days = self.lookahead_days.clamp(MIN_LOOKAHEAD_DAYS, MAX_LOOKAHEAD_DAYS);
        if days != self.lookahead_days {
            tracing::warn!("lookahead_days {} out of range, using {}", self.lookahead_days, days);
            self.lookahead_days = days;
        }
        self
    }

    /// Rendered window length, clamped to `MIN_LOOKAHEAD_DAYS..=MAX_LOOKAHEAD_DAYS`
    pub fn lookahead(&self) -> chrono::Duration {
        chrono::Duration::days(
            self.lookahead_days
                .clamp(MIN_LOOKAHEAD_DAYS, MAX_LOOKAHEAD_DAYS),
        )
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_api_port() -> u16 {
    3000
}

fn default_rate_limit() -> u32 {
    120
}

fn default_schedules_ttl() -> u64 {
    300
}

fn default_lookahead_days() -> i64 {
    7
}

fn default_page_limit() -> u32 {
    100
}

/// Main configuration for pd-gateway
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pagerduty: PagerDutyConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl Config {
    /// Replace `${VAR_NAME}` with the environment value (empty when unset).
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Load configuration from a TOML file, then apply environment overrides.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let mut cfg = Self::from_toml_str(&toml_content)?;
        cfg.apply_env_overrides();

        Ok(cfg)
    }

    /// Parse TOML content (after `${VAR}` expansion) without environment overrides.
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let expanded_content = Self::expand_env_vars(content);

        let toml: TomlConfig = toml::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;

        Ok(Self::from_toml_config(toml))
    }

    /// Load from `./pd-gateway.toml` when present, otherwise from the environment.
    pub fn load() -> crate::Result<Self> {
        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            return Self::from_toml_file(DEFAULT_CONFIG_FILE);
        }

        Ok(Self::from_env())
    }

    fn from_toml_config(toml: TomlConfig) -> Self {
        let pd = toml.pagerduty.unwrap_or_default();
        let api = toml.api.unwrap_or_default();
        let cache = toml.cache.unwrap_or_default();
        let schedule = toml.schedule.unwrap_or_default();

        Config {
            pagerduty: PagerDutyConfig {
                api_token: pd.api_token.unwrap_or_default(),
                api_base_url: pd.api_base_url.unwrap_or_default(),
                timeout_secs: pd.timeout_secs.unwrap_or_else(default_timeout_secs),
                from_email: pd.from_email.filter(|e| !e.is_empty()),
            },
            api: ApiConfig {
                port: api.port.unwrap_or_else(default_api_port),
                allowed_origins: api.allowed_origins,
                rate_limit_per_minute: api.rate_limit_per_minute.unwrap_or_else(default_rate_limit),
            },
            cache: CacheConfig {
                db_path: cache.db_path,
                schedules_ttl_secs: cache.schedules_ttl_secs.unwrap_or_else(default_schedules_ttl),
            },
            schedule: ScheduleConfig {
                lookahead_days: schedule.lookahead_days.unwrap_or_else(default_lookahead_days),
                page_limit: schedule.page_limit.unwrap_or_else(default_page_limit),
            }
            .clamp_lookahead(),
        }
    }

    /// Overwrite settings from environment variables
    fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("PAGERDUTY_API_TOKEN") {
            if !token.is_empty() {
                self.pagerduty.api_token = token;
            }
        }
        if let Ok(base_url) = std::env::var("PAGERDUTY_API_BASE_URL") {
            if !base_url.is_empty() {
                self.pagerduty.api_base_url = base_url;
            }
        }
        if let Ok(email) = std::env::var("PAGERDUTY_FROM_EMAIL") {
            if !email.is_empty() {
                self.pagerduty.from_email = Some(email);
            }
        }
        if let Ok(timeout) = std::env::var("PAGERDUTY_TIMEOUT_SECS") {
            if let Ok(t) = timeout.parse() {
                self.pagerduty.timeout_secs = t;
            }
        }

        if let Ok(port) = std::env::var("API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }
        if let Ok(origins) = std::env::var("API_ALLOWED_ORIGINS") {
            self.api.allowed_origins = Some(
                origins.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            );
        }
        if let Ok(limit) = std::env::var("API_RATE_LIMIT") {
            if let Ok(l) = limit.parse() {
                self.api.rate_limit_per_minute = l;
            }
        }

        if let Ok(path) = std::env::var("CACHE_DB_PATH") {
            self.cache.db_path = Some(path);
        }
        if let Ok(ttl) = std::env::var("CACHE_TTL_SECS") {
            if let Ok(t) = ttl.parse() {
                self.cache.schedules_ttl_secs = t;
            }
        }

        if let Ok(days) = std::env::var("SCHEDULE_LOOKAHEAD_DAYS") {
            if let Ok(d) = days.parse() {
                self.schedule.lookahead_days = d;
            }
        }

        self.schedule = self.schedule.clone().clamp_lookahead();
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        cfg
    }
}

/// Configuration shared between the HTTP API, the commands and the reload signal.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<Config>>,
}

impl SharedConfig {
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Snapshot of the active configuration
    pub fn get(&self) -> Config {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace the active configuration
    pub fn set(&self, config: Config) {
        let mut guard = self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = config;
    }
}

// ============================================================================
// TOML file structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct TomlConfig {
    pagerduty: Option<TomlPagerDutyConfig>,
    api: Option<TomlApiConfig>,
    cache: Option<TomlCacheConfig>,
    schedule: Option<TomlScheduleConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlPagerDutyConfig {
    api_token: Option<String>,
    api_base_url: Option<String>,
    timeout_secs: Option<u64>,
    from_email: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlApiConfig {
    port: Option<u16>,
    allowed_origins: Option<Vec<String>>,
    rate_limit_per_minute: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlCacheConfig {
    db_path: Option<String>,
    schedules_ttl_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlScheduleConfig {
    lookahead_days: Option<i64>,
    page_limit: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.port, 3000);
        assert_eq!(config.pagerduty.timeout_secs, 30);
        assert_eq!(config.cache.schedules_ttl_secs, 300);
        assert_eq!(config.schedule.lookahead_days, 7);
        assert_eq!(config.schedule.page_limit, 100);
        assert!(config.cache.db_path.is_none());
    }

    #[test]
    fn test_validate_requires_token() {
        let config = PagerDutyConfig {
            api_token: String::new(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = PagerDutyConfig {
            api_token: "   ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_empty_base_url() {
        let config = PagerDutyConfig {
            api_token: "test-token".to_string(),
            api_base_url: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.base_url(), DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_validate_rejects_malformed_base_url() {
        let config = PagerDutyConfig {
            api_token: "test-token".to_string(),
            api_base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_base_url_trims_trailing_slash() {
        let config = PagerDutyConfig {
            api_token: "t".to_string(),
            api_base_url: "https://pd.example.com/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.base_url(), "https://pd.example.com");
    }

    #[test]
    fn test_expand_env_vars() {
        unsafe {
            std::env::set_var("PD_GATEWAY_TEST_VAR", "test_value");
        }

        let result = Config::expand_env_vars("prefix_${PD_GATEWAY_TEST_VAR}_suffix");
        assert_eq!(result, "prefix_test_value_suffix");

        let result = Config::expand_env_vars("prefix_${PD_GATEWAY_NONEXISTENT}_suffix");
        assert_eq!(result, "prefix__suffix");

        unsafe {
            std::env::remove_var("PD_GATEWAY_TEST_VAR");
        }
    }

    #[test]
    fn test_expand_env_vars_no_braces() {
        assert_eq!(Config::expand_env_vars("no_vars_here"), "no_vars_here");
        assert_eq!(Config::expand_env_vars("cost: $5"), "cost: $5");
    }

    #[test]
    fn test_toml_config_parsing() {
        let toml_content = r#"
[pagerduty]
api_token = "token-123"
api_base_url = "https://pd.example.com"
timeout_secs = 10

[api]
port = 8080
allowed_origins = ["https://chat.example.com"]
rate_limit_per_minute = 30

[cache]
db_path = "/tmp/pd.db"
schedules_ttl_secs = 60

[schedule]
lookahead_days = 14
"#;

        let config = Config::from_toml_str(toml_content).unwrap();
        assert_eq!(config.pagerduty.api_token, "token-123");
        assert_eq!(config.pagerduty.base_url(), "https://pd.example.com");
        assert_eq!(config.pagerduty.timeout_secs, 10);
        assert_eq!(config.api.port, 8080);
        assert_eq!(
            config.api.allowed_origins,
            Some(vec!["https://chat.example.com".to_string()])
        );
        assert_eq!(config.api.rate_limit_per_minute, 30);
        assert_eq!(config.cache.db_path.as_deref(), Some("/tmp/pd.db"));
        assert_eq!(config.cache.schedules_ttl_secs, 60);
        assert_eq!(config.schedule.lookahead_days, 14);
        assert_eq!(config.schedule.page_limit, 100);
    }

    #[test]
    fn test_lookahead_days_are_clamped() {
        let config = Config::from_toml_str("[schedule]\nlookahead_days = 200000000\n").unwrap();
        assert_eq!(config.schedule.lookahead_days, MAX_LOOKAHEAD_DAYS);

        let config = Config::from_toml_str("[schedule]\nlookahead_days = -3\n").unwrap();
        assert_eq!(config.schedule.lookahead_days, MIN_LOOKAHEAD_DAYS);

        let schedule = ScheduleConfig {
            lookahead_days: i64::MAX,
            ..Default::default()
        };
        assert_eq!(schedule.lookahead(), chrono::Duration::days(MAX_LOOKAHEAD_DAYS));

        let schedule = ScheduleConfig {
            lookahead_days: 0,
            ..Default::default()
        };
        assert_eq!(schedule.lookahead(), chrono::Duration::days(MIN_LOOKAHEAD_DAYS));
    }

    #[test]
    fn test_toml_config_empty_file_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert!(config.pagerduty.api_token.is_empty());
        assert_eq!(config.api.port, 3000);
    }

    #[test]
    fn test_toml_config_invalid() {
        let result = Config::from_toml_str("[pagerduty\napi_token = ");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_shared_config_set_is_visible_to_clones() {
        let shared = SharedConfig::new(Config::default());
        let other = shared.clone();

        let mut updated = Config::default();
        updated.pagerduty.api_token = "new-token".to_string();
        updated.pagerduty.api_base_url = "https://new.pagerduty.com".to_string();
        shared.set(updated);

        let seen = other.get();
        assert_eq!(seen.pagerduty.api_token, "new-token");
        assert_eq!(seen.pagerduty.base_url(), "https://new.pagerduty.com");
    }

    #[test]
    fn test_shared_config_concurrent_reads() {
        let mut config = Config::default();
        config.pagerduty.api_token = "test-token".to_string();
        let shared = SharedConfig::new(config);

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let shared = shared.clone();
                std::thread::spawn(move || shared.get().pagerduty.api_token)
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), "test-token");
        }
    }
}
