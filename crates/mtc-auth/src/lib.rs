//! # mtc-auth
//!
//! Authentication for the Mautic REST API.
//!
//! ## Security
//!
//! - Tokens and secrets are redacted in Debug output
//! - Tracing spans skip credential parameters
//! - Token status reports never include token values
//!
//! ## Supported Authentication Methods
//!
//! - **OAuth2 Client Credentials** - server-to-server tokens
//! - **OAuth2 Refresh Token** - renewing a stored token before falling back
//! - **HTTP Basic** - username and password of a Mautic user
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mtcbridge_auth::{MemoryTokenStore, OAuth2Auth, OAuthClient, OAuthConfig, TokenManager};
//! use mtcbridge_client::SystemClock;
//!
//! let oauth = OAuthClient::new(
//!     OAuthConfig::new("client_id", "client_secret"),
//!     "https://mautic.example.com",
//!     std::time::Duration::from_secs(30),
//! )?;
//! let tokens = Arc::new(TokenManager::new(
//!     oauth,
//!     Arc::new(MemoryTokenStore::new()),
//!     Arc::new(SystemClock),
//! ));
//! let token = tokens.get_access_token().await;
//! let provider = OAuth2Auth::new(tokens);
//! ```

mod credentials;
mod error;
mod manager;
mod oauth;
mod storage;
mod token;

pub use credentials::{AuthMethod, BasicAuth, OAuth2Auth};
pub use error::{Error, ErrorKind, Result};
pub use manager::TokenManager;
pub use oauth::{OAuthClient, OAuthConfig, TokenResponse, DEFAULT_EXPIRES_IN};
pub use storage::{default_token_dir, FileTokenStore, MemoryTokenStore, TokenStore, TOKEN_STATE_KEY};
pub use token::{format_timestamp, TokenRecord, TokenStatus, TokenSummary, TokenValidity};
