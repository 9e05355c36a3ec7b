//! Flat configuration surface.
//!
//! One struct holds everything an operator sets. It deserializes from any
//! serde source with per-field defaults, or loads from `MAUTIC_*` environment
//! variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use mtcbridge_auth::{AuthMethod, Error as AuthError, ErrorKind as AuthErrorKind, Result as AuthResult};
use mtcbridge_client::{CacheConfig, ClientConfig, RetryConfig};

const DEFAULT_FORM_CACHE_LIFETIME: u64 = 3600;
const DEFAULT_SEGMENT_CACHE_LIFETIME: u64 = 300;
const DEFAULT_API_TIMEOUT: u64 = 30;

/// Integration settings.
///
/// Secrets are redacted in Debug output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mautic_url: String,
    /// `oauth2`, `basic`, or anything else for no authentication.
    pub auth_method: String,
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub form_cache_enabled: bool,
    pub form_cache_lifetime: u64,
    pub segment_cache_enabled: bool,
    pub segment_cache_lifetime: u64,
    /// Seconds.
    pub api_timeout: u64,
    /// Retries after the first attempt for 5xx and timeouts.
    pub api_retry_attempts: u32,
    pub log_api_calls: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mautic_url: String::new(),
            auth_method: "oauth2".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            username: String::new(),
            password: String::new(),
            form_cache_enabled: true,
            form_cache_lifetime: DEFAULT_FORM_CACHE_LIFETIME,
            segment_cache_enabled: true,
            segment_cache_lifetime: DEFAULT_SEGMENT_CACHE_LIFETIME,
            api_timeout: DEFAULT_API_TIMEOUT,
            api_retry_attempts: 0,
            log_api_calls: false,
        }
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("mautic_url", &self.mautic_url)
            .field("auth_method", &self.auth_method)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("form_cache_enabled", &self.form_cache_enabled)
            .field("form_cache_lifetime", &self.form_cache_lifetime)
            .field("segment_cache_enabled", &self.segment_cache_enabled)
            .field("segment_cache_lifetime", &self.segment_cache_lifetime)
            .field("api_timeout", &self.api_timeout)
            .field("api_retry_attempts", &self.api_retry_attempts)
            .field("log_api_calls", &self.log_api_calls)
            .finish()
    }
}

impl Settings {
    /// Settings for a Mautic instance with everything else at defaults.
    pub fn new(mautic_url: impl Into<String>) -> Self {
        Self {
            mautic_url: mautic_url.into(),
            ..Self::default()
        }
        .normalized()
    }

    /// Use OAuth2 client credentials.
    pub fn with_oauth2(mut self, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        self.auth_method = "oauth2".to_string();
        self.client_id = client_id.into();
        self.client_secret = client_secret.into();
        self
    }

    /// Use HTTP Basic.
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth_method = "basic".to_string();
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Load from environment variables.
    ///
    /// Required:
    /// - `MAUTIC_URL`
    ///
    /// Optional:
    /// - `MAUTIC_AUTH_METHOD` (default: `oauth2`)
    /// - `MAUTIC_CLIENT_ID`, `MAUTIC_CLIENT_SECRET`
    /// - `MAUTIC_USERNAME`, `MAUTIC_PASSWORD`
    /// - `MAUTIC_API_TIMEOUT` (seconds, default: 30)
    /// - `MAUTIC_RETRY_ATTEMPTS` (default: 0)
    /// - `MAUTIC_LOG_API_CALLS`
    /// - `MAUTIC_FORM_CACHE_ENABLED`, `MAUTIC_FORM_CACHE_LIFETIME`
    /// - `MAUTIC_SEGMENT_CACHE_ENABLED`, `MAUTIC_SEGMENT_CACHE_LIFETIME`
    pub fn from_env() -> AuthResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from any name -> value source, using the same names as [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> AuthResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let mautic_url = var("MAUTIC_URL")
            .ok_or_else(|| AuthError::new(AuthErrorKind::EnvVar("MAUTIC_URL".to_string())))?;

        let settings = Self {
            mautic_url,
            auth_method: var("MAUTIC_AUTH_METHOD").unwrap_or(defaults.auth_method),
            client_id: var("MAUTIC_CLIENT_ID").unwrap_or_default(),
            client_secret: var("MAUTIC_CLIENT_SECRET").unwrap_or_default(),
            username: var("MAUTIC_USERNAME").unwrap_or_default(),
            password: var("MAUTIC_PASSWORD").unwrap_or_default(),
            form_cache_enabled: parse_flag("MAUTIC_FORM_CACHE_ENABLED", var("MAUTIC_FORM_CACHE_ENABLED"))?
                .unwrap_or(defaults.form_cache_enabled),
            form_cache_lifetime: parse_number("MAUTIC_FORM_CACHE_LIFETIME", var("MAUTIC_FORM_CACHE_LIFETIME"))?
                .unwrap_or(defaults.form_cache_lifetime),
            segment_cache_enabled: parse_flag(
                "MAUTIC_SEGMENT_CACHE_ENABLED",
                var("MAUTIC_SEGMENT_CACHE_ENABLED"),
            )?
            .unwrap_or(defaults.segment_cache_enabled),
            segment_cache_lifetime: parse_number(
                "MAUTIC_SEGMENT_CACHE_LIFETIME",
                var("MAUTIC_SEGMENT_CACHE_LIFETIME"),
            )?
            .unwrap_or(defaults.segment_cache_lifetime),
            api_timeout: parse_number("MAUTIC_API_TIMEOUT", var("MAUTIC_API_TIMEOUT"))?
                .unwrap_or(defaults.api_timeout),
            api_retry_attempts: parse_number("MAUTIC_RETRY_ATTEMPTS", var("MAUTIC_RETRY_ATTEMPTS"))?
                .unwrap_or(defaults.api_retry_attempts),
            log_api_calls: parse_flag("MAUTIC_LOG_API_CALLS", var("MAUTIC_LOG_API_CALLS"))?
                .unwrap_or(defaults.log_api_calls),
        };

        Ok(settings.normalized())
    }

    /// Trim the URL's trailing `/` and replace zero lifetimes/timeouts with defaults.
    pub fn normalized(mut self) -> Self {
        self.mautic_url = self.mautic_url.trim().trim_end_matches('/').to_string();
        if self.form_cache_lifetime == 0 {
            self.form_cache_lifetime = DEFAULT_FORM_CACHE_LIFETIME;
        }
        if self.segment_cache_lifetime == 0 {
            self.segment_cache_lifetime = DEFAULT_SEGMENT_CACHE_LIFETIME;
        }
        if self.api_timeout == 0 {
            self.api_timeout = DEFAULT_API_TIMEOUT;
        }
        self
    }

    /// The selected authentication method with its credentials.
    pub fn auth(&self) -> AuthMethod {
        AuthMethod::from_parts(
            &self.auth_method,
            &self.client_id,
            &self.client_secret,
            &self.username,
            &self.password,
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout)
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::default()
            .with_forms(self.form_cache_enabled, self.form_cache_lifetime)
            .with_segments(self.segment_cache_enabled, self.segment_cache_lifetime)
    }

    /// Gateway configuration derived from these settings.
    pub fn client_config(&self) -> ClientConfig {
        let builder = ClientConfig::builder()
            .with_timeout(self.timeout())
            .with_cache(self.cache_config())
            .with_api_logging(self.log_api_calls);

        match RetryConfig::from_attempts(self.api_retry_attempts) {
            Some(retry) => builder.with_retry(retry).build(),
            None => builder.without_retry().build(),
        }
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: Option<String>) -> AuthResult<Option<T>> {
    raw.map(|value| {
        value.parse().map_err(|_| {
            AuthError::new(AuthErrorKind::EnvVar(format!(
                "{}: expected a non-negative integer, got '{}'",
                name, value
            )))
        })
    })
    .transpose()
}

fn parse_flag(name: &str, raw: Option<String>) -> AuthResult<Option<bool>> {
    raw.map(|value| match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AuthError::new(AuthErrorKind::EnvVar(format!(
            "{}: expected true or false, got '{}'",
            name, value
        )))),
    })
    .transpose()
}
