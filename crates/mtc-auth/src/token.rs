//! Stored OAuth2 token state and its redacted summary.

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Seconds of headroom required before a token counts as expired.
pub const EXPIRY_BUFFER_SECS: i64 = 60;

/// An access token as persisted between requests.
///
/// `access_token` and `refresh_token` are redacted in Debug output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Bearer access token.
    pub access_token: String,
    /// Refresh token, when the grant issued one.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Absolute expiry in epoch seconds.
    #[serde(default)]
    pub expires_at: i64,
    /// Token type reported by the server, usually "bearer".
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl std::fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRecord")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .field("token_type", &self.token_type)
            .finish()
    }
}

impl TokenRecord {
    /// Usable at `now`: non-empty token whose expiry is more than 60s away.
    pub fn is_valid(&self, now: i64) -> bool {
        !self.access_token.is_empty()
            && self.expires_at != 0
            && self.expires_at > now.saturating_add(EXPIRY_BUFFER_SECS)
    }

    /// Refresh token, if one is stored and non-empty.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Redacted summary at `now`.
    pub fn summary(&self, now: i64) -> TokenSummary {
        TokenSummary {
            status: if self.is_valid(now) {
                TokenValidity::Valid
            } else {
                TokenValidity::Expired
            },
            expires: format_timestamp(self.expires_at),
            token_type: self.token_type.clone(),
            has_refresh_token: self.refresh_token().is_some(),
        }
    }
}

/// Whether the stored token can still be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenValidity {
    Valid,
    Expired,
}

impl std::fmt::Display for TokenValidity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenValidity::Valid => f.write_str("Valid"),
            TokenValidity::Expired => f.write_str("Expired"),
        }
    }
}

/// Token metadata safe to display. Never contains token values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenSummary {
    pub status: TokenValidity,
    /// Expiry as `%Y-%m-%d %H:%M:%S` UTC.
    pub expires: String,
    pub token_type: String,
    pub has_refresh_token: bool,
}

/// Result of `TokenManager::token_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TokenStatus {
    /// Nothing stored.
    NoToken { status: &'static str },
    /// A token is stored; validity computed at inspection time.
    Stored(TokenSummary),
}

impl TokenStatus {
    /// Status for an empty store.
    pub fn no_token() -> Self {
        TokenStatus::NoToken {
            status: "No token stored",
        }
    }

    /// True only for a stored, currently valid token.
    pub fn is_valid(&self) -> bool {
        matches!(
            self,
            TokenStatus::Stored(TokenSummary {
                status: TokenValidity::Valid,
                ..
            })
        )
    }
}

impl std::fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenStatus::NoToken { status } => f.write_str(status),
            TokenStatus::Stored(summary) => {
                write!(f, "{} (expires {})", summary.status, summary.expires)
            }
        }
    }
}

/// Render epoch seconds as `%Y-%m-%d %H:%M:%S` in UTC.
pub fn format_timestamp(epoch: i64) -> String {
    Utc.timestamp_opt(epoch, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| epoch.to_string())
}
