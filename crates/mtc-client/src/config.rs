//! Client configuration.

use crate::retry::RetryConfig;
use std::time::Duration;

/// Configuration for the HTTP gateway.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Retry configuration. `None` disables retries.
    pub retry: Option<RetryConfig>,
    /// Response cache lifetimes and toggles.
    pub cache: CacheConfig,
    /// Request timeout.
    pub timeout: Duration,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Timeout for the unauthenticated base URL probe.
    pub probe_timeout: Duration,
    /// User-Agent header value.
    pub user_agent: String,
    /// Whether each API call is logged at info level.
    pub log_api_calls: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retry: None,
            cache: CacheConfig::default(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(10),
            user_agent: crate::USER_AGENT.to_string(),
            log_api_calls: false,
        }
    }
}

impl ClientConfig {
    /// Create a new client config builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for ClientConfig.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = Some(retry);
        self
    }

    /// Disable retries.
    pub fn without_retry(mut self) -> Self {
        self.config.retry = None;
        self
    }

    /// Set the cache configuration.
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.config.cache = cache;
        self
    }

    /// Set request timeout. A zero duration keeps the default.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.config.timeout = timeout;
        }
        self
    }

    /// Set connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the base URL probe timeout.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout = timeout;
        self
    }

    /// Set custom User-Agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Enable or disable per-call API logging.
    pub fn with_api_logging(mut self, enabled: bool) -> Self {
        self.config.log_api_calls = enabled;
        self
    }

    /// Build the client configuration.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

/// Cache toggles and lifetimes, in seconds.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether form endpoints are cached by the typed helpers.
    pub form_enabled: bool,
    /// Lifetime for endpoints under `forms`.
    pub form_lifetime: u64,
    /// Whether segment endpoints are cached by the typed helpers.
    pub segment_enabled: bool,
    /// Lifetime for endpoints under `segments`, also used for visitor segment sets.
    pub segment_lifetime: u64,
    /// Lifetime for every other endpoint.
    pub default_lifetime: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            form_enabled: true,
            form_lifetime: 3600,
            segment_enabled: true,
            segment_lifetime: 300,
            default_lifetime: 300,
        }
    }
}

impl CacheConfig {
    /// Set form caching. A zero lifetime keeps the default.
    pub fn with_forms(mut self, enabled: bool, lifetime: u64) -> Self {
        self.form_enabled = enabled;
        if lifetime > 0 {
            self.form_lifetime = lifetime;
        }
        self
    }

    /// Set segment caching. A zero lifetime keeps the default.
    pub fn with_segments(mut self, enabled: bool, lifetime: u64) -> Self {
        self.segment_enabled = enabled;
        if lifetime > 0 {
            self.segment_lifetime = lifetime;
        }
        self
    }

    /// Lifetime in seconds for responses from `endpoint`.
    pub fn lifetime_for(&self, endpoint: &str) -> u64 {
        let endpoint = endpoint.trim_start_matches('/');
        if endpoint.starts_with("forms") {
            self.form_lifetime
        } else if endpoint.starts_with("segments") {
            self.segment_lifetime
        } else {
            self.default_lifetime
        }
    }
}
