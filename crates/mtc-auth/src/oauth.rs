//! OAuth 2.0 grants against Mautic's token endpoint.
//!
//! Two grants are supported:
//! - **Refresh Token** - exchange a stored refresh token for a new access token
//! - **Client Credentials** - server-to-server token without user interaction
//!
//! Both POST a form body to `{base_url}/oauth/v2/token`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{Error, ErrorKind, Result};
use crate::token::TokenRecord;

/// Default lifetime assumed when the server omits `expires_in`.
pub const DEFAULT_EXPIRES_IN: i64 = 3600;

/// OAuth 2.0 client credentials for a Mautic API client.
///
/// `client_secret` is redacted in Debug output.
#[derive(Clone)]
pub struct OAuthConfig {
    /// Public client id.
    pub client_id: String,
    client_secret: String,
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

impl OAuthConfig {
    /// Create a new OAuth config.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub(crate) fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

/// OAuth client for Mautic's token endpoint.
#[derive(Clone)]
pub struct OAuthClient {
    config: OAuthConfig,
    base_url: String,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for OAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClient")
            .field("config", &self.config)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OAuthClient {
    /// Create a new OAuth client for the Mautic instance at `base_url`.
    pub fn new(config: OAuthConfig, base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(mtcbridge_client::USER_AGENT)
            .build()?;

        Ok(Self {
            config,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Get the OAuth config.
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Token endpoint URL.
    pub fn token_url(&self) -> String {
        format!("{}/oauth/v2/token", self.base_url)
    }

    /// Fail with `ConfigMissing` unless base URL, client id and secret are all set.
    pub fn ensure_configured(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("Mautic URL", self.base_url.is_empty()),
            ("client ID", self.config.client_id.is_empty()),
            ("client secret", self.config.client_secret.is_empty()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::new(ErrorKind::ConfigMissing(format!(
                "Missing OAuth2 configuration: {}",
                missing.join(", ")
            ))))
        }
    }

    /// Refresh an access token using a refresh token.
    ///
    /// The refresh_token parameter is not logged to prevent credential exposure.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        self.ensure_configured()?;

        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];

        self.post_token_request(&params).await
    }

    /// Obtain a new access token with the client credentials grant.
    #[instrument(skip(self))]
    pub async fn client_credentials(&self) -> Result<TokenResponse> {
        self.ensure_configured()?;

        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret()),
            ("grant_type", "client_credentials"),
        ];

        self.post_token_request(&params).await
    }

    async fn post_token_request(&self, params: &[(&str, &str)]) -> Result<TokenResponse> {
        let body = serde_urlencoded::to_string(params)?;

        let response = self
            .http_client
            .post(self.token_url())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Accept", "application/json")
            .body(body)
            .send()
            .await?;

        self.handle_token_response(response).await
    }

    /// Handle a token response, checking for errors.
    async fn handle_token_response(&self, response: reqwest::Response) -> Result<TokenResponse> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<OAuthErrorResponse>(&body) {
                return Err(Error::new(ErrorKind::OAuth {
                    error: error.error,
                    description: error.error_description,
                }));
            }
            return Err(Error::new(ErrorKind::Http(format!(
                "Token endpoint returned HTTP {}",
                status.as_u16()
            ))));
        }

        let token: TokenResponse = serde_json::from_str(&body)?;
        if token.access_token.is_empty() {
            return Err(Error::new(ErrorKind::OAuth {
                error: "invalid_response".to_string(),
                description: "Token response did not include an access token".to_string(),
            }));
        }
        Ok(token)
    }
}

/// Token response from the OAuth endpoint.
///
/// Sensitive fields like `access_token` and `refresh_token` are redacted
/// in Debug output to prevent accidental exposure in logs.
#[derive(Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    /// Access token.
    pub access_token: String,
    /// Refresh token, if issued.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Token type (usually "bearer").
    #[serde(default)]
    pub token_type: Option<String>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .finish()
    }
}

impl TokenResponse {
    /// Convert to a stored record issued at `issued_at`.
    ///
    /// `fallback_refresh` is kept when the response carries no refresh token.
    /// Negative lifetimes count as already expired; huge ones saturate.
    pub fn into_record(self, issued_at: i64, fallback_refresh: Option<String>) -> TokenRecord {
        TokenRecord {
            access_token: self.access_token,
            refresh_token: self
                .refresh_token
                .filter(|t| !t.is_empty())
                .or(fallback_refresh),
            expires_at: issued_at
                .saturating_add(self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN).max(0)),
            token_type: self
                .token_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "bearer".to_string()),
        }
    }
}

/// OAuth error response.
#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    #[serde(default)]
    error_description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str) -> OAuthClient {
        OAuthClient::new(
            OAuthConfig::new("client-1", "secret-1"),
            base_url,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_oauth_config_debug_redacts_secret() {
        let config = OAuthConfig::new("client", "super_secret_value");
        let debug_output = format!("{:?}", config);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_value"));
    }

    #[test]
    fn test_ensure_configured_lists_missing_fields() {
        let client = OAuthClient::new(OAuthConfig::new("", ""), "", Duration::from_secs(1)).unwrap();
        let err = client.ensure_configured().unwrap_err();
        assert!(err.is_config_missing());
        let msg = err.to_string();
        assert!(msg.contains("Mautic URL"));
        assert!(msg.contains("client ID"));
        assert!(msg.contains("client secret"));
    }

    #[test]
    fn test_token_url() {
        assert_eq!(
            client("https://m.example.com/").token_url(),
            "https://m.example.com/oauth/v2/token"
        );
    }

    #[test]
    fn test_into_record_defaults() {
        let response = TokenResponse {
            access_token: "a".into(),
            refresh_token: None,
            expires_in: None,
            token_type: None,
        };
        let record = response.into_record(1_000, Some("old".into()));
        assert_eq!(record.expires_at, 4_600);
        assert_eq!(record.token_type, "bearer");
        assert_eq!(record.refresh_token.as_deref(), Some("old"));

        let response = TokenResponse {
            access_token: "a".into(),
            refresh_token: Some("new".into()),
            expires_in: Some(60),
            token_type: Some("Bearer".into()),
        };
        let record = response.into_record(1_000, Some("old".into()));
        assert_eq!(record.expires_at, 1_060);
        assert_eq!(record.token_type, "Bearer");
        assert_eq!(record.refresh_token.as_deref(), Some("new"));
    }

    #[test]
    fn test_into_record_clamps_server_lifetime() {
        let response = |expires_in| TokenResponse {
            access_token: "a".into(),
            refresh_token: None,
            expires_in: Some(expires_in),
            token_type: None,
        };

        let record = response(i64::MAX).into_record(1_000, None);
        assert_eq!(record.expires_at, i64::MAX);

        let record = response(-500).into_record(1_000, None);
        assert_eq!(record.expires_at, 1_000);
        assert!(!record.is_valid(1_000));
    }

    #[test]
    fn test_token_response_debug_redacts_tokens() {
        let token = TokenResponse {
            access_token: "super_secret_access_token".to_string(),
            refresh_token: Some("super_secret_refresh_token".to_string()),
            expires_in: Some(3600),
            token_type: None,
        };

        let debug_output = format!("{:?}", token);
        assert!(!debug_output.contains("super_secret_access_token"));
        assert!(!debug_output.contains("super_secret_refresh_token"));
    }

    #[tokio::test]
    async fn test_client_credentials_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/v2/token"))
            .and(header("Content-Type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_id=client-1"))
            .and(body_string_contains("client_secret=secret-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "issued",
                "expires_in": 3600,
                "token_type": "bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = client(&server.uri()).client_credentials().await.unwrap();
        assert_eq!(token.access_token, "issued");
        assert_eq!(token.expires_in, Some(3600));
    }

    #[tokio::test]
    async fn test_refresh_grant_sends_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/v2/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=r-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "refreshed",
                "refresh_token": "r-2"
            })))
            .mount(&server)
            .await;

        let token = client(&server.uri()).refresh_token("r-1").await.unwrap();
        assert_eq!(token.access_token, "refreshed");
        assert_eq!(token.refresh_token.as_deref(), Some("r-2"));
    }

    #[tokio::test]
    async fn test_oauth_error_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/v2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "The refresh token is invalid."
            })))
            .mount(&server)
            .await;

        let err = client(&server.uri()).refresh_token("bad").await.unwrap_err();
        assert!(matches!(err.kind, ErrorKind::OAuth { ref error, .. } if error == "invalid_grant"));
    }

    #[tokio::test]
    async fn test_non_json_success_is_json_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/v2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let err = client(&server.uri()).client_credentials().await.unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Json(_)));
    }

    #[tokio::test]
    async fn test_missing_config_makes_no_request() {
        let server = MockServer::start().await;
        let client = OAuthClient::new(
            OAuthConfig::new("client-1", ""),
            server.uri(),
            Duration::from_secs(1),
        )
        .unwrap();

        let err = client.client_credentials().await.unwrap_err();
        assert!(err.is_config_missing());
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }
}
