//! Authentication seam between the gateway and credential sources.

use async_trait::async_trait;

use crate::error::Result;

/// Supplies the `Authorization` header value for API calls.
///
/// Implementations live in `mtcbridge-auth` (OAuth2 bearer tokens, HTTP Basic).
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Full header value, e.g. `Bearer abc` or `Basic dXNlcjpwYXNz`.
    async fn authorization(&self) -> Result<String>;

    /// Human-readable method name used in diagnostics ("OAuth2", "Basic Auth").
    fn method_name(&self) -> &str;
}

/// Fixed header value. Useful for tests and pre-issued tokens.
#[derive(Clone)]
pub struct StaticAuth {
    header: String,
    name: String,
}

impl std::fmt::Debug for StaticAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticAuth")
            .field("header", &"[REDACTED]")
            .field("name", &self.name)
            .finish()
    }
}

impl StaticAuth {
    /// Bearer header for an already-issued access token.
    pub fn bearer(token: impl AsRef<str>) -> Self {
        Self {
            header: format!("Bearer {}", token.as_ref()),
            name: "Bearer".to_string(),
        }
    }
}

#[async_trait]
impl AuthProvider for StaticAuth {
    async fn authorization(&self) -> Result<String> {
        Ok(self.header.clone())
    }

    fn method_name(&self) -> &str {
        &self.name
    }
}
