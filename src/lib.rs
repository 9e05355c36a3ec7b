//! # mtcbridge
//!
//! Mautic visitor tracking and API access for Rust web backends.
//!
//! ## Security
//!
//! - Tokens, client secrets and passwords are redacted in Debug output
//! - Tracing spans skip credential parameters
//! - API error messages are sanitized before they are logged or returned
//!
//! ## Crates
//!
//! - **mtcbridge-client** - HTTP gateway with response cache, retry and auth seam
//! - **mtcbridge-auth** - OAuth2 token lifecycle, Basic auth, token stores
//! - **mtcbridge-contacts** - contact resolution, visitor segments, form/segment catalogs
//! - **mtcbridge-diagnostics** - configuration checks against a live instance
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mtcbridge::{MauticIntegration, Settings, TrackingSources};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mautic = MauticIntegration::new(Settings::from_env()?)?;
//!
//!     let sources = TrackingSources::new().with_mtc_id_cookie("42");
//!     let visitor = mautic.current_user_info(&sources).await;
//!     if visitor.segments.contains("Customers") {
//!         println!("welcome back");
//!     }
//!
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

mod error;
mod settings;

pub use error::{Error, Result};
pub use settings::Settings;

// Re-export all crates for convenient access
pub use mtcbridge_auth as auth;
pub use mtcbridge_client as client;
pub use mtcbridge_contacts as contacts;
pub use mtcbridge_diagnostics as diagnostics;

// Re-export commonly used types at the top level
pub use mtcbridge_auth::{AuthMethod, TokenStatus};
pub use mtcbridge_client::{MauticClient, RequestMethod, RequestOptions};
pub use mtcbridge_contacts::{ContactRecord, SegmentSet, TrackingSources, VisitorInfo};
pub use mtcbridge_diagnostics::{ConnectionReport, DiagnosticResult};

use mtcbridge_auth::{
    BasicAuth, MemoryTokenStore, OAuth2Auth, OAuthClient, OAuthConfig, TokenManager, TokenStore,
};
use mtcbridge_client::{CacheStore, Clock, MemoryCache, SystemClock};
use mtcbridge_contacts::{ContactResolver, FormCatalog, MauticRestClient, SegmentCatalog};
use mtcbridge_diagnostics::ConfigValidator;

/// Everything the page layer calls, wired from one [`Settings`].
#[derive(Debug)]
pub struct MauticIntegration {
    settings: Settings,
    client: MauticClient,
    tokens: Option<Arc<TokenManager>>,
    resolver: ContactResolver,
    forms: FormCatalog,
    segments: SegmentCatalog,
    validator: ConfigValidator,
}

impl MauticIntegration {
    /// Integration with in-memory token and response stores.
    pub fn new(settings: Settings) -> Result<Self> {
        Self::builder(settings).build()
    }

    /// Start a builder to inject stores or a clock.
    pub fn builder(settings: Settings) -> MauticIntegrationBuilder {
        MauticIntegrationBuilder {
            settings,
            token_store: None,
            cache: None,
            clock: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The underlying gateway.
    pub fn client(&self) -> &MauticClient {
        &self.client
    }

    pub fn resolver(&self) -> &ContactResolver {
        &self.resolver
    }

    pub fn forms(&self) -> &FormCatalog {
        &self.forms
    }

    pub fn segments(&self) -> &SegmentCatalog {
        &self.segments
    }

    /// Current OAuth2 access token. `None` when OAuth2 is not configured or no token can be obtained.
    pub async fn get_access_token(&self) -> Option<String> {
        self.tokens.as_ref()?.get_access_token().await
    }

    /// Call `{base}/api/{endpoint}`. Failures are logged and give `None`.
    pub async fn request(
        &self,
        method: RequestMethod,
        endpoint: &str,
        options: &RequestOptions,
        use_cache: bool,
    ) -> Option<Value> {
        self.client.request(method, endpoint, options, use_cache).await
    }

    pub async fn find_contact_by_tracking_id(&self, tracking_id: &str) -> Option<ContactRecord> {
        self.resolver.find_contact_by_tracking_id(tracking_id).await
    }

    pub async fn get_user_segments_by_tracking_id(&self, tracking_id: &str) -> SegmentSet {
        self.resolver.get_user_segments_by_tracking_id(tracking_id).await
    }

    /// Contact, segments and tracking state for the identifier carried by a request.
    pub async fn current_user_info(&self, sources: &TrackingSources) -> VisitorInfo {
        let tracking_id = sources.tracking_id();
        self.resolver.current_user_info(tracking_id.as_deref()).await
    }

    pub async fn validate_configuration(&self) -> DiagnosticResult {
        self.validator.validate_configuration().await
    }

    pub async fn test_connection(&self) -> ConnectionReport {
        self.validator.test_connection().await
    }

    /// Redacted OAuth2 token status, when OAuth2 is configured.
    pub fn token_info(&self) -> Option<TokenStatus> {
        self.tokens.as_ref().map(|tokens| tokens.token_info())
    }

    /// Forget the stored OAuth2 token so the next call acquires a new one.
    pub fn clear_token(&self) {
        if let Some(tokens) = &self.tokens {
            if let Err(err) = tokens.clear_token() {
                warn!(error = %err, "Failed to clear stored token");
            }
        }
    }

    /// Drop cached API responses for one endpoint, or all of them.
    pub fn clear_cache(&self, endpoint: Option<&str>) -> usize {
        self.client.clear_cache(endpoint)
    }
}

/// Builder for [`MauticIntegration`].
pub struct MauticIntegrationBuilder {
    settings: Settings,
    token_store: Option<Arc<dyn TokenStore>>,
    cache: Option<Arc<dyn CacheStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl MauticIntegrationBuilder {
    /// Persist OAuth2 tokens somewhere other than memory.
    pub fn with_token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.token_store = Some(store);
        self
    }

    /// Share a response cache.
    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<MauticIntegration> {
        let settings = self.settings.normalized();
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let cache = self.cache.unwrap_or_else(|| Arc::new(MemoryCache::new()));

        let mut client = MauticClient::new(settings.mautic_url.clone(), settings.client_config())?
            .with_cache(cache)
            .with_clock(clock.clone());

        let mut tokens = None;
        match settings.auth() {
            AuthMethod::OAuth2 {
                client_id,
                client_secret,
            } => {
                let oauth = OAuthClient::new(
                    OAuthConfig::new(client_id, client_secret),
                    settings.mautic_url.clone(),
                    settings.timeout(),
                )?;
                let store = self
                    .token_store
                    .unwrap_or_else(|| Arc::new(MemoryTokenStore::new()));
                let manager = Arc::new(TokenManager::new(oauth, store, clock));
                client = client.with_auth(Arc::new(OAuth2Auth::new(manager.clone())));
                tokens = Some(manager);
            }
            AuthMethod::Basic { username, password } => {
                client = client.with_auth(Arc::new(BasicAuth::new(username, password)));
            }
            AuthMethod::None => {}
        }

        debug!(
            mautic_url = %settings.mautic_url,
            auth_method = client.auth_method().unwrap_or("None"),
            "Configured Mautic integration"
        );

        let rest = MauticRestClient::new(client.clone());
        let mut validator = ConfigValidator::new(rest.clone());
        if let Some(manager) = &tokens {
            validator = validator.with_token_manager(manager.clone());
        }

        Ok(MauticIntegration {
            resolver: ContactResolver::new(rest.clone()),
            forms: FormCatalog::new(rest.clone()),
            segments: SegmentCatalog::new(rest),
            validator,
            tokens,
            client,
            settings,
        })
    }
}
