//! Authentication method selection and the `AuthProvider` implementations.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use mtcbridge_client::{AuthProvider, Error as ClientError, ErrorKind as ClientErrorKind};

use crate::manager::TokenManager;

/// Configured way of authenticating against Mautic.
///
/// Secrets are redacted in Debug output.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMethod {
    /// OAuth2 client credentials, with refresh when a refresh token is held.
    OAuth2 {
        client_id: String,
        client_secret: String,
    },
    /// HTTP Basic with a Mautic user.
    Basic { username: String, password: String },
    /// No credentials configured.
    None,
}

impl std::fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMethod::OAuth2 { client_id, .. } => f
                .debug_struct("OAuth2")
                .field("client_id", client_id)
                .field("client_secret", &"[REDACTED]")
                .finish(),
            AuthMethod::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            AuthMethod::None => f.write_str("None"),
        }
    }
}

impl AuthMethod {
    /// Select a method from its setting name (`oauth2`, `basic`, anything else is none).
    pub fn from_parts(
        kind: &str,
        client_id: &str,
        client_secret: &str,
        username: &str,
        password: &str,
    ) -> Self {
        match kind.trim().to_ascii_lowercase().as_str() {
            "oauth2" | "oauth" => AuthMethod::OAuth2 {
                client_id: client_id.to_string(),
                client_secret: client_secret.to_string(),
            },
            "basic" => AuthMethod::Basic {
                username: username.to_string(),
                password: password.to_string(),
            },
            _ => AuthMethod::None,
        }
    }

    /// Setting name.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthMethod::OAuth2 { .. } => "oauth2",
            AuthMethod::Basic { .. } => "basic",
            AuthMethod::None => "none",
        }
    }

    /// Name shown in diagnostics.
    pub fn display_name(&self) -> &'static str {
        match self {
            AuthMethod::OAuth2 { .. } => OAUTH2_NAME,
            AuthMethod::Basic { .. } => BASIC_NAME,
            AuthMethod::None => "None",
        }
    }
}

const OAUTH2_NAME: &str = "OAuth2";
const BASIC_NAME: &str = "Basic Auth";

/// Bearer credentials from a [`TokenManager`].
#[derive(Debug, Clone)]
pub struct OAuth2Auth {
    tokens: Arc<TokenManager>,
}

impl OAuth2Auth {
    /// Wrap a token manager.
    pub fn new(tokens: Arc<TokenManager>) -> Self {
        Self { tokens }
    }

    /// The wrapped token manager.
    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }
}

#[async_trait]
impl AuthProvider for OAuth2Auth {
    async fn authorization(&self) -> mtcbridge_client::Result<String> {
        let token = self.tokens.access_token().await?;
        Ok(format!("Bearer {}", token))
    }

    fn method_name(&self) -> &str {
        OAUTH2_NAME
    }
}

/// HTTP Basic credentials.
#[derive(Clone)]
pub struct BasicAuth {
    username: String,
    password: String,
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl BasicAuth {
    /// Create Basic credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[async_trait]
impl AuthProvider for BasicAuth {
    async fn authorization(&self) -> mtcbridge_client::Result<String> {
        if self.username.is_empty() || self.password.is_empty() {
            return Err(ClientError::new(ClientErrorKind::ConfigMissing(
                "Basic Auth username or password not configured".to_string(),
            )));
        }

        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", self.username, self.password));
        Ok(format!("Basic {}", encoded))
    }

    fn method_name(&self) -> &str {
        BASIC_NAME
    }
}
