//! HTTP response handling with Mautic error decoding.

use serde::de::DeserializeOwned;

use crate::error::{Error, ErrorKind, Result};

/// Wrapper around an HTTP response.
#[derive(Debug)]
pub struct Response {
    inner: reqwest::Response,
}

impl Response {
    pub(crate) fn new(inner: reqwest::Response) -> Self {
        Self { inner }
    }

    /// Get the HTTP status code.
    pub fn status(&self) -> u16 {
        self.inner.status().as_u16()
    }

    /// Returns true if the response status is successful (2xx).
    pub fn is_success(&self) -> bool {
        self.inner.status().is_success()
    }

    /// Get a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers().get(name)?.to_str().ok()
    }

    /// Get the Content-Type header.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Get the response body as text.
    pub async fn text(self) -> Result<String> {
        self.inner.text().await.map_err(Into::into)
    }

    /// Deserialize the response body as JSON.
    ///
    /// Reads the body as text first so that an HTML error page surfaces as a
    /// decode failure rather than a transport error.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let body = self.inner.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            Error::with_source(
                ErrorKind::Decode(format!(
                    "{} (body: {})",
                    e,
                    sanitize_error_message(&body)
                )),
                e,
            )
        })
    }
}

/// Extension trait for processing Mautic API responses.
pub trait ResponseExt {
    /// Check for Mautic API errors and convert to the matching error kind.
    fn check_mautic_error(self) -> impl std::future::Future<Output = Result<Response>> + Send;
}

impl ResponseExt for Response {
    async fn check_mautic_error(self) -> Result<Response> {
        if self.is_success() {
            return Ok(self);
        }

        let status = self.status();
        let body = self.text().await.unwrap_or_default();
        Err(parse_error_response(status, &body))
    }
}

/// Parse an error response body into an error kind.
fn parse_error_response(status: u16, body: &str) -> Error {
    if let Ok(envelope) = serde_json::from_str::<MauticErrorEnvelope>(body) {
        let first = match envelope {
            MauticErrorEnvelope::List { errors } => errors.into_iter().next(),
            MauticErrorEnvelope::Single { error } => Some(error),
        };
        if let Some(err) = first {
            let code = err.code.unwrap_or(status);
            let message = sanitize_error_message(&err.message);
            return Error::new(match code {
                401 => ErrorKind::Authentication(message),
                403 => ErrorKind::Authorization(message),
                404 => ErrorKind::NotFound(message),
                _ => ErrorKind::MauticApi { code, message },
            });
        }
    }

    let sanitized = sanitize_error_message(body);
    let kind = match status {
        401 => ErrorKind::Authentication(sanitized),
        403 => ErrorKind::Authorization(sanitized),
        404 => ErrorKind::NotFound(sanitized),
        _ => ErrorKind::Http {
            status,
            message: sanitized,
        },
    };

    Error::new(kind)
}

/// Sanitize an error message to prevent exposing credentials.
///
/// - Redacts bearer/basic credentials and `access_token`/`refresh_token` values
/// - Truncates messages longer than 500 characters
pub fn sanitize_error_message(message: &str) -> String {
    const MAX_LENGTH: usize = 500;

    let mut sanitized = message.to_string();

    if let Ok(auth_pattern) = regex_lite::Regex::new(r"(?i)\b(Bearer|Basic)\s+[A-Za-z0-9\-._~+/=]+") {
        sanitized = auth_pattern
            .replace_all(&sanitized, "$1 [REDACTED]")
            .to_string();
    }

    if let Ok(param_pattern) = regex_lite::Regex::new(
        r#"(access_token|refresh_token|client_secret)("?\s*[:=]\s*"?)[^"&,\s}]+"#,
    ) {
        sanitized = param_pattern
            .replace_all(&sanitized, "$1$2[REDACTED]")
            .to_string();
    }

    if sanitized.len() > MAX_LENGTH {
        let mut cut = MAX_LENGTH;
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized.truncate(cut);
        sanitized.push_str("...[truncated]");
    }

    sanitized
}

/// Mautic error payloads: `{"errors":[...]}` on current versions, `{"error":{...}}` on older ones.
#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
enum MauticErrorEnvelope {
    List { errors: Vec<MauticErrorResponse> },
    Single { error: MauticErrorResponse },
}

#[derive(Debug, serde::Deserialize)]
struct MauticErrorResponse {
    #[serde(default)]
    code: Option<u16>,
    message: String,
}
