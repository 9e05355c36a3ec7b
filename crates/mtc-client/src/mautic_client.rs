//! Caching, authenticated gateway to the Mautic REST API.
//!
//! `MauticClient` combines the raw HTTP client with an [`AuthProvider`], a
//! [`CacheStore`] and a [`Clock`]. Cacheable `GET` responses are served from
//! the cache while fresh; everything else goes to the network with the
//! configured retry policy.
//!
//! `send` is the internal, `Result`-returning entry point. `request` is the
//! boundary form: failures are logged and surface as `None`.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, instrument};

use crate::auth::AuthProvider;
use crate::cache::{
    endpoint_prefix, normalize_endpoint, response_key, CacheStore, MemoryCache, API_CACHE_PREFIX,
};
use crate::client::MtcHttpClient;
use crate::clock::{Clock, SystemClock};
use crate::config::ClientConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::request::{RequestMethod, RequestOptions};

/// Gateway to `{base_url}/api/...`.
#[derive(Clone)]
pub struct MauticClient {
    http: MtcHttpClient,
    base_url: String,
    auth: Option<Arc<dyn AuthProvider>>,
    cache: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for MauticClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MauticClient")
            .field("base_url", &self.base_url)
            .field("auth", &self.auth_method())
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl MauticClient {
    /// Create a gateway with an in-memory cache, the system clock and no credentials.
    ///
    /// A trailing `/` on `base_url` is dropped. An empty URL is accepted here;
    /// every call then fails with `ConfigMissing`.
    pub fn new(base_url: impl Into<String>, config: ClientConfig) -> Result<Self> {
        Ok(Self {
            http: MtcHttpClient::new(config)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth: None,
            cache: Arc::new(MemoryCache::new()),
            clock: Arc::new(SystemClock),
        })
    }

    /// Attach a credential source.
    pub fn with_auth(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Replace the cache store.
    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = cache;
        self
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Name of the configured auth method, if any.
    pub fn auth_method(&self) -> Option<&str> {
        self.auth.as_deref().map(|a| a.method_name())
    }

    /// Gateway configuration.
    pub fn config(&self) -> &ClientConfig {
        self.http.config()
    }

    /// Shared cache store.
    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    /// Shared clock.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Build the API URL for an endpoint.
    ///
    /// Example: `api_url("/contacts/5")` -> `{base}/api/contacts/5`
    pub fn api_url(&self, endpoint: &str) -> String {
        format!("{}/api/{}", self.base_url, normalize_endpoint(endpoint))
    }

    /// Perform an API call, consulting the cache for `GET` when `use_cache` is set.
    #[instrument(skip(self, options))]
    pub async fn send(
        &self,
        method: RequestMethod,
        endpoint: &str,
        options: &RequestOptions,
        use_cache: bool,
    ) -> Result<Value> {
        if self.base_url.is_empty() {
            error!("Mautic URL not configured");
            return Err(Error::new(ErrorKind::ConfigMissing(
                "Mautic URL not configured".to_string(),
            )));
        }

        let endpoint = normalize_endpoint(endpoint);
        let cache_key = (use_cache && method == RequestMethod::Get)
            .then(|| response_key(endpoint, &options.cache_fingerprint()));

        if let Some(ref key) = cache_key {
            if let Some(value) = self.cache.get(key, self.clock.now()) {
                debug!(endpoint, "Serving response from cache");
                return Ok(value);
            }
        }

        let authorization = self.authorization().await?;

        let request = self
            .http
            .request(method, self.api_url(endpoint))
            .authorization(authorization)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .options(options);

        if self.config().log_api_calls {
            info!(method = method.as_str(), endpoint, "Mautic API request");
        }

        let body: Value = match self.http.send_json(request).await {
            Ok(body) => body,
            Err(err) => {
                error!(method = method.as_str(), endpoint, error = %err, "Mautic API request failed");
                return Err(err);
            }
        };

        if let Some(key) = cache_key {
            let lifetime = self.config().cache.lifetime_for(endpoint);
            self.cache.set(&key, body.clone(), self.clock.now(), lifetime);
        }

        Ok(body)
    }

    /// Boundary form of [`send`](Self::send): any failure becomes `None`.
    pub async fn request(
        &self,
        method: RequestMethod,
        endpoint: &str,
        options: &RequestOptions,
        use_cache: bool,
    ) -> Option<Value> {
        self.send(method, endpoint, options, use_cache).await.ok()
    }

    /// Shorthand for a cached `GET`.
    pub async fn get(&self, endpoint: &str, options: &RequestOptions) -> Result<Value> {
        self.send(RequestMethod::Get, endpoint, options, true).await
    }

    /// Drop cached responses for one endpoint, or every API response when `None`.
    pub fn clear_cache(&self, endpoint: Option<&str>) -> usize {
        let prefix = match endpoint {
            Some(endpoint) => endpoint_prefix(endpoint),
            None => API_CACHE_PREFIX.to_string(),
        };
        let removed = self.cache.delete_prefix(&prefix);
        debug!(prefix = %prefix, removed, "Cleared API cache");
        removed
    }

    /// Unauthenticated `GET {base_url}`; succeeds only on HTTP 200.
    pub async fn probe_base_url(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(Error::new(ErrorKind::ConfigMissing(
                "Mautic URL not configured".to_string(),
            )));
        }

        let request = self
            .http
            .get(self.base_url.clone())
            .timeout(self.config().probe_timeout);
        let response = self.http.execute_once(&request).await?;

        match response.status() {
            200 => Ok(()),
            status => Err(Error::new(ErrorKind::Http {
                status,
                message: format!("Mautic instance not reachable (HTTP {})", status),
            })),
        }
    }

    async fn authorization(&self) -> Result<String> {
        match self.auth {
            Some(ref auth) => auth.authorization().await,
            None => Err(Error::new(ErrorKind::ConfigMissing(
                "No authentication method configured".to_string(),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticAuth;
    use crate::clock::ManualClock;
    use crate::config::CacheConfig;
    use crate::retry::RetryConfig;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, clock: Arc<ManualClock>) -> MauticClient {
        MauticClient::new(server.uri(), ClientConfig::default())
            .unwrap()
            .with_auth(Arc::new(StaticAuth::bearer("tok")))
            .with_clock(clock)
    }

    #[tokio::test]
    async fn test_cached_get_hits_network_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/contacts"))
            .and(query_param("limit", "1"))
            .and(header("Authorization", "Bearer tok"))
            .and(header("Accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 7})))
            .expect(1)
            .mount(&server)
            .await;

        let clock = Arc::new(ManualClock::new(10_000));
        let client = client_for(&server, clock.clone());
        let options = RequestOptions::new().query("limit", 1);

        let first = client.get("contacts", &options).await.unwrap();
        clock.advance(299);
        let second = client.get("/contacts", &options).await.unwrap();

        assert_eq!(first, json!({"total": 7}));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_cache_entry_expires_after_default_lifetime() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/contacts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 1})))
            .expect(2)
            .mount(&server)
            .await;

        let clock = Arc::new(ManualClock::new(10_000));
        let client = client_for(&server, clock.clone());

        client.get("contacts", &RequestOptions::new()).await.unwrap();
        clock.advance(300);
        client.get("contacts", &RequestOptions::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_forms_use_form_lifetime() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/forms"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 2})))
            .expect(1)
            .mount(&server)
            .await;

        let clock = Arc::new(ManualClock::new(10_000));
        let client = client_for(&server, clock.clone());

        client.get("forms", &RequestOptions::new()).await.unwrap();
        clock.advance(3599);
        client.get("forms", &RequestOptions::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_custom_segment_lifetime() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/segments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 2})))
            .expect(2)
            .mount(&server)
            .await;

        let clock = Arc::new(ManualClock::new(10_000));
        let config = ClientConfig::builder()
            .with_cache(CacheConfig::default().with_segments(true, 60))
            .build();
        let client = MauticClient::new(server.uri(), config)
            .unwrap()
            .with_auth(Arc::new(StaticAuth::bearer("tok")))
            .with_clock(clock.clone());

        client.get("segments", &RequestOptions::new()).await.unwrap();
        clock.advance(59);
        client.get("segments", &RequestOptions::new()).await.unwrap();
        clock.advance(1);
        client.get("segments", &RequestOptions::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_oversized_lifetime_still_caches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/segments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 2})))
            .expect(1)
            .mount(&server)
            .await;

        let clock = Arc::new(ManualClock::new(10_000));
        let config = ClientConfig::builder()
            .with_cache(CacheConfig::default().with_segments(true, u64::MAX))
            .build();
        let client = MauticClient::new(server.uri(), config)
            .unwrap()
            .with_auth(Arc::new(StaticAuth::bearer("tok")))
            .with_clock(clock.clone());

        client.get("segments", &RequestOptions::new()).await.unwrap();
        clock.advance(1_000_000);
        client.get("segments", &RequestOptions::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_post_is_never_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/contacts/new"))
            .and(body_json(json!({"email": "a@example.com"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"contact": {"id": 3}})))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server, Arc::new(ManualClock::new(0)));
        let options = RequestOptions::new()
            .json(&json!({"email": "a@example.com"}))
            .unwrap();

        for _ in 0..2 {
            let body = client
                .send(RequestMethod::Post, "contacts/new", &options, true)
                .await
                .unwrap();
            assert_eq!(body["contact"]["id"], 3);
        }
    }

    #[tokio::test]
    async fn test_uncached_get_when_use_cache_false() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/contacts/5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"contact": {"id": 5}})))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server, Arc::new(ManualClock::new(0)));
        for _ in 0..2 {
            client
                .send(RequestMethod::Get, "contacts/5", &RequestOptions::new(), false)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_missing_base_url_is_config_missing() {
        let client = MauticClient::new("", ClientConfig::default())
            .unwrap()
            .with_auth(Arc::new(StaticAuth::bearer("tok")));

        let err = client
            .send(RequestMethod::Get, "contacts", &RequestOptions::new(), true)
            .await
            .unwrap_err();
        assert!(err.is_config_missing());

        assert!(client
            .request(RequestMethod::Get, "contacts", &RequestOptions::new(), true)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_missing_auth_is_config_missing() {
        let server = MockServer::start().await;
        let client = MauticClient::new(server.uri(), ClientConfig::default()).unwrap();

        let err = client
            .send(RequestMethod::Get, "contacts", &RequestOptions::new(), false)
            .await
            .unwrap_err();
        assert!(err.is_config_missing());
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn test_retry_then_success_through_gateway() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let server = MockServer::start().await;
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        Mock::given(method("GET"))
            .and(path("/api/contacts"))
            .respond_with(move |_: &wiremock::Request| {
                if calls_clone.fetch_add(1, Ordering::SeqCst) < 2 {
                    ResponseTemplate::new(503)
                } else {
                    ResponseTemplate::new(200).set_body_json(json!({"total": 1}))
                }
            })
            .mount(&server)
            .await;

        let config = ClientConfig::builder()
            .with_retry(
                RetryConfig::default()
                    .with_max_attempts(3)
                    .with_initial_delay(Duration::from_millis(5)),
            )
            .build();
        let client = MauticClient::new(server.uri(), config)
            .unwrap()
            .with_auth(Arc::new(StaticAuth::bearer("tok")));

        let body = client
            .request(RequestMethod::Get, "contacts", &RequestOptions::new(), false)
            .await;
        assert_eq!(body, Some(json!({"total": 1})));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_clear_cache_by_endpoint_and_all() {
        let server = MockServer::start().await;
        for p in ["/api/forms", "/api/segments"] {
            Mock::given(method("GET"))
                .and(path(p))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 0})))
                .mount(&server)
                .await;
        }

        let client = client_for(&server, Arc::new(ManualClock::new(0)));
        client.get("forms", &RequestOptions::new()).await.unwrap();
        client.get("forms", &RequestOptions::new().query("limit", 100)).await.unwrap();
        client.get("segments", &RequestOptions::new()).await.unwrap();

        assert_eq!(client.clear_cache(Some("forms")), 2);
        assert_eq!(client.clear_cache(None), 1);
        assert_eq!(client.clear_cache(None), 0);
    }

    #[tokio::test]
    async fn test_probe_base_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let client = MauticClient::new(format!("{}/", server.uri()), ClientConfig::default()).unwrap();
        assert_eq!(client.base_url(), server.uri());
        client.probe_base_url().await.unwrap();
    }

    #[tokio::test]
    async fn test_probe_base_url_rejects_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = MauticClient::new(server.uri(), ClientConfig::default()).unwrap();
        let err = client.probe_base_url().await.unwrap_err();
        assert_eq!(err.status(), Some(503));
    }

    #[test]
    fn test_api_url() {
        let client = MauticClient::new("https://m.example.com/", ClientConfig::default()).unwrap();
        assert_eq!(
            client.api_url("/contacts/5"),
            "https://m.example.com/api/contacts/5"
        );
        assert!(client.auth_method().is_none());
    }
}
