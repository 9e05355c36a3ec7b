//! Error types for mtc-auth.
//!
//! Error messages are designed to avoid exposing sensitive credential data.

/// Result type alias for mtc-auth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for mtc-auth operations.
///
/// Error messages are sanitized to prevent accidental credential exposure.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional source error.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Create a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// Create a new error with the given kind and source.
    pub fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }

    /// Returns true if required OAuth2 or Basic settings are absent.
    pub fn is_config_missing(&self) -> bool {
        matches!(self.kind, ErrorKind::ConfigMissing(_))
    }
}

/// The kind of error that occurred.
///
/// Error messages avoid including credential values.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// OAuth error response from Mautic.
    #[error("OAuth error: {error} - {description}")]
    OAuth { error: String, description: String },

    /// Base URL, client id, secret, username or password not configured.
    #[error("Configuration missing: {0}")]
    ConfigMissing(String),

    /// Neither a stored, refreshed, nor newly granted token is available.
    #[error("No access token available: {0}")]
    AuthUnavailable(String),

    /// HTTP error during authentication.
    #[error("HTTP error: {0}")]
    Http(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Token store failure.
    #[error("Token storage error: {0}")]
    Storage(String),

    /// Environment variable missing or malformed.
    #[error("Environment variable error: {0}")]
    EnvVar(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Sanitize the error message to avoid exposing URLs with tokens
        let message = err.to_string();
        let sanitized = if message.contains("access_token") || message.contains("token=") {
            "HTTP request failed (details redacted for security)".to_string()
        } else {
            message
        };
        Error::with_source(ErrorKind::Http(sanitized), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json(err.to_string()), err)
    }
}

impl From<serde_urlencoded::ser::Error> for Error {
    fn from(err: serde_urlencoded::ser::Error) -> Self {
        Error::with_source(ErrorKind::Serialization(err.to_string()), err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::with_source(ErrorKind::Io(err.to_string()), err)
    }
}

impl From<std::env::VarError> for Error {
    fn from(err: std::env::VarError) -> Self {
        Error::with_source(ErrorKind::EnvVar(err.to_string()), err)
    }
}

impl From<Error> for mtcbridge_client::Error {
    fn from(err: Error) -> Self {
        use mtcbridge_client::ErrorKind as ClientKind;

        let kind = match &err.kind {
            ErrorKind::ConfigMissing(what) => ClientKind::ConfigMissing(what.clone()),
            other => ClientKind::AuthFailure(other.to_string()),
        };
        mtcbridge_client::Error::with_source(kind, err)
    }
}
