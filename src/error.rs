//! Errors raised while assembling the integration.

/// Result type alias for the facade.
pub type Result<T> = std::result::Result<T, Error>;

/// Construction error from one of the member crates.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Gateway setup failed.
    #[error(transparent)]
    Client(#[from] mtcbridge_client::Error),

    /// Credential or settings setup failed.
    #[error(transparent)]
    Auth(#[from] mtcbridge_auth::Error),
}
