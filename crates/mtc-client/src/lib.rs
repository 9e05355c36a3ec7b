//! # mtc-client
//!
//! Core HTTP gateway for the Mautic REST API.
//!
//! This crate provides:
//! - Response caching with per-endpoint lifetimes
//! - Retry with exponential backoff for server errors and timeouts
//! - Mautic error payload decoding and message sanitizing
//! - An [`AuthProvider`] seam for bearer or basic credentials
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Application Layer                        │
//! │  (mtc-contacts, mtc-diagnostics)                            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     MauticClient                            │
//! │  - Holds base URL, AuthProvider, CacheStore, Clock          │
//! │  - Cache lookup/store for GET                               │
//! │  - Builds {base}/api/{endpoint} requests                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    MtcHttpClient                            │
//! │  - Raw HTTP with retry and error mapping                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mtcbridge_client::{ClientConfig, MauticClient, RequestOptions, StaticAuth};
//!
//! let client = MauticClient::new("https://mautic.example.com", ClientConfig::default())?
//!     .with_auth(Arc::new(StaticAuth::bearer(token)));
//!
//! let contacts = client
//!     .get("contacts", &RequestOptions::new().query("limit", 1))
//!     .await?;
//! ```

mod auth;
pub mod cache;
mod client;
mod clock;
mod config;
mod error;
mod mautic_client;
mod request;
mod response;
mod retry;

pub use auth::{AuthProvider, StaticAuth};
pub use cache::{expires_after, CacheEntry, CacheStore, MemoryCache};
pub use client::MtcHttpClient;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, ClientConfig, ClientConfigBuilder};
pub use error::{Error, ErrorKind, Result};
pub use mautic_client::MauticClient;
pub use request::{RequestBuilder, RequestMethod, RequestOptions};
pub use response::{sanitize_error_message, Response, ResponseExt};
pub use retry::{RetryConfig, RetryPolicy};

/// User-Agent string for the client
pub const USER_AGENT: &str = concat!("mtcbridge/", env!("CARGO_PKG_VERSION"));
