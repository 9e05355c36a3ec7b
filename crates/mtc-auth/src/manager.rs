//! OAuth2 access token lifecycle.
//!
//! The manager hands out the stored access token while it is valid. Once it
//! is absent or within 60 seconds of expiry, exactly one acquisition sequence
//! runs: the refresh grant when a refresh token is stored, then the client
//! credentials grant. Concurrent callers wait on a single-flight lock and
//! re-check the store, so only one of them talks to the token endpoint.

use std::sync::Arc;

use mtcbridge_client::Clock;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{Error, ErrorKind, Result};
use crate::oauth::OAuthClient;
use crate::storage::{TokenStore, TOKEN_STATE_KEY};
use crate::token::{TokenRecord, TokenStatus};

/// Obtains, refreshes, and invalidates the OAuth2 access token.
pub struct TokenManager {
    oauth: OAuthClient,
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    key: String,
    refresh_lock: Mutex<()>,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("oauth", &self.oauth)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Create a manager storing its token under the default state key.
    pub fn new(oauth: OAuthClient, store: Arc<dyn TokenStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            oauth,
            store,
            clock,
            key: TOKEN_STATE_KEY.to_string(),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Use a different storage key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Underlying OAuth client.
    pub fn oauth(&self) -> &OAuthClient {
        &self.oauth
    }

    /// Return a valid access token, acquiring a new one if needed.
    #[instrument(skip(self))]
    pub async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.valid_stored_token() {
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited.
        let stored = self.stored();
        let now = self.clock.now();
        if let Some(ref record) = stored {
            if record.is_valid(now) {
                debug!("Token refreshed by concurrent caller");
                return Ok(record.access_token.clone());
            }
        }

        let mut last_error = None;

        if let Some(refresh_token) = stored.as_ref().and_then(|r| r.refresh_token()) {
            match self.refresh(refresh_token).await {
                Ok(record) => return Ok(record.access_token),
                Err(err) => {
                    warn!(error = %err, "Token refresh failed, falling back to client credentials");
                    last_error = Some(err);
                }
            }
        }

        match self.acquire_client_credentials().await {
            Ok(record) => Ok(record.access_token),
            Err(err) if err.is_config_missing() => {
                error!(error = %err, "Missing OAuth2 configuration");
                Err(err)
            }
            Err(err) => {
                error!(error = %err, "Failed to obtain OAuth2 access token");
                let detail = match last_error {
                    Some(refresh_err) => format!("refresh: {}; client credentials: {}", refresh_err, err),
                    None => err.to_string(),
                };
                Err(Error::with_source(ErrorKind::AuthUnavailable(detail), err))
            }
        }
    }

    /// Boundary form of [`access_token`](Self::access_token).
    pub async fn get_access_token(&self) -> Option<String> {
        self.access_token().await.ok()
    }

    /// Delete the stored token.
    pub fn clear_token(&self) -> Result<()> {
        self.store.delete(&self.key)?;
        info!("OAuth2 token cleared");
        Ok(())
    }

    /// Redacted view of the stored token.
    pub fn token_info(&self) -> TokenStatus {
        match self.stored() {
            Some(record) => TokenStatus::Stored(record.summary(self.clock.now())),
            None => TokenStatus::no_token(),
        }
    }

    /// Stored record. An unreadable record counts as absent so a grant can replace it.
    fn stored(&self) -> Option<TokenRecord> {
        match self.store.load(&self.key) {
            Ok(record) => record,
            Err(err) => {
                warn!(error = %err, "Unable to read stored token, treating it as absent");
                None
            }
        }
    }

    fn valid_stored_token(&self) -> Option<String> {
        let now = self.clock.now();
        self.stored()
            .filter(|record| record.is_valid(now))
            .map(|record| record.access_token)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenRecord> {
        let issued_at = self.clock.now();
        let response = self.oauth.refresh_token(refresh_token).await?;
        let record = response.into_record(issued_at, Some(refresh_token.to_string()));
        self.store.save(&self.key, &record)?;
        info!("OAuth2 token refreshed successfully");
        Ok(record)
    }

    async fn acquire_client_credentials(&self) -> Result<TokenRecord> {
        let issued_at = self.clock.now();
        let response = self.oauth.client_credentials().await?;
        let record = response.into_record(issued_at, None);
        self.store.save(&self.key, &record)?;
        info!("OAuth2 client credentials token obtained successfully");
        Ok(record)
    }
}
