//! Raw HTTP client with retry and Mautic error handling.

use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::request::{RequestBuilder, RequestMethod};
use crate::response::{Response, ResponseExt};
use crate::retry::RetryPolicy;

/// HTTP client for the Mautic API with built-in retry and error handling.
#[derive(Debug, Clone)]
pub struct MtcHttpClient {
    inner: reqwest::Client,
    config: ClientConfig,
}

impl MtcHttpClient {
    /// Create a new HTTP client.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .gzip(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::with_source(ErrorKind::Other(e.to_string()), e))?;

        Ok(Self { inner, config })
    }

    /// Create a new HTTP client with default configuration.
    pub fn default_client() -> Result<Self> {
        Self::new(ClientConfig::default())
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Create a request builder for an arbitrary method.
    pub fn request(&self, method: RequestMethod, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(method, url)
    }

    /// Create a GET request builder.
    pub fn get(&self, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(RequestMethod::Get, url)
    }

    /// Execute a request with automatic retry handling.
    ///
    /// Only server errors and timeouts are retried; the delay before retry
    /// `i` doubles each time (1s, 2s, 4s, ... by default).
    #[instrument(skip(self, request), fields(method = request.method.as_str(), url = %request.url))]
    pub async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let mut retry_policy = self
            .config
            .retry
            .as_ref()
            .map(|c| RetryPolicy::new(c.clone()));

        loop {
            match self.execute_once(&request).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() => {
                    if let Some(ref mut policy) = retry_policy {
                        if let Some(delay) = policy.next_delay() {
                            warn!(
                                attempt = policy.attempt(),
                                delay_ms = delay.as_millis() as u64,
                                error = %err,
                                "Request failed, retrying"
                            );
                            tokio::time::sleep(delay).await;
                            continue;
                        }

                        warn!(attempts = policy.attempt(), error = %err, "Retries exhausted");
                        return Err(Error::with_source(
                            ErrorKind::RetriesExhausted {
                                attempts: policy.attempt(),
                            },
                            err,
                        ));
                    }

                    return Err(err);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Execute a single request without retry logic.
    pub async fn execute_once(&self, request: &RequestBuilder) -> Result<Response> {
        let url = request.full_url()?;
        let mut req = self.inner.request(request.method.to_reqwest(), url);

        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        if let Some(ref body) = request.body {
            req = req.json(body);
        }

        debug!("Sending request");

        let response = Response::new(req.send().await?);
        debug!(status = response.status(), "Response received");

        response.check_mautic_error().await
    }

    /// Execute a request and deserialize the JSON response.
    pub async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T> {
        let response = self.execute(request).await?;
        response.json().await
    }
}
