//! Staged configuration checks against a live Mautic instance.

use std::sync::Arc;

use serde_json::Value;
use tracing::{error, instrument, warn};

use mtcbridge_auth::TokenManager;
use mtcbridge_client::{RequestMethod, RequestOptions, Result};
use mtcbridge_contacts::MauticRestClient;

use crate::report::{ConnectionDetails, ConnectionReport, DiagnosticResult};

/// Runs connectivity, forms-access and segments-access checks.
#[derive(Debug, Clone)]
pub struct ConfigValidator {
    rest: MauticRestClient,
    tokens: Option<Arc<TokenManager>>,
}

impl ConfigValidator {
    pub fn new(rest: MauticRestClient) -> Self {
        Self { rest, tokens: None }
    }

    /// Include OAuth2 token status in connection details.
    pub fn with_token_manager(mut self, tokens: Arc<TokenManager>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Run every stage and collect the findings.
    #[instrument(skip(self))]
    pub async fn validate_configuration(&self) -> DiagnosticResult {
        let mut result = DiagnosticResult::new();

        let connection = self.test_connection().await;
        if connection.success {
            result.info(format!("API Connection: {}", connection.message));
            for line in connection.details.lines() {
                result.info(line);
            }
        } else {
            result.error(format!("API Connection Failed: {}", connection.message));
        }

        match self.forms_access().await {
            Ok(message) => result.info(message),
            Err(message) => result.error(message),
        }

        match self.segments_access().await {
            Ok(message) => result.info(message),
            Err(message) => result.warning(message),
        }

        result
    }

    /// Base URL reachable and an authenticated `contacts?limit=1` succeeds.
    #[instrument(skip(self))]
    pub async fn test_connection(&self) -> ConnectionReport {
        let client = self.rest.inner();
        let base_url = client.base_url();
        if base_url.is_empty() {
            return ConnectionReport::failed("Mautic URL is not configured.");
        }

        if let Err(err) = client.probe_base_url().await {
            warn!(error = %err, "Mautic base URL probe failed");
            return match err.status() {
                Some(_) => ConnectionReport::failed("Mautic URL is not accessible."),
                None => ConnectionReport::failed(format!("Cannot connect to Mautic URL: {}", err)),
            };
        }

        let response = match self.fetch_uncached("contacts").await {
            Ok(response) => response,
            Err(err) => {
                error!(error = %err, "API authentication check failed");
                let mut report = ConnectionReport::failed("API authentication failed.");
                report.details.token_info = self.tokens.as_ref().map(|t| t.token_info());
                return report;
            }
        };

        let api_response = match total(&response) {
            Some(total) => format!("Found {} contacts", total),
            None => "API responding".to_string(),
        };

        ConnectionReport {
            success: true,
            message: "Connection successful!".to_string(),
            details: ConnectionDetails {
                mautic_url: Some(base_url.to_string()),
                auth_method: Some(client.auth_method().unwrap_or("None").to_string()),
                api_response: Some(api_response),
                token_info: self.tokens.as_ref().map(|t| t.token_info()),
            },
        }
    }

    /// `GET {endpoint}?limit=1`, bypassing the response cache so checks see current credentials.
    async fn fetch_uncached(&self, endpoint: &str) -> Result<Value> {
        self.rest
            .inner()
            .send(
                RequestMethod::Get,
                endpoint,
                &RequestOptions::new().query("limit", 1),
                false,
            )
            .await
    }

    async fn forms_access(&self) -> std::result::Result<String, String> {
        match self.fetch_uncached("forms").await {
            Ok(forms) => Ok(format!(
                "Forms Access: Found {} forms",
                total(&forms).unwrap_or_else(|| "0".to_string())
            )),
            Err(err) => {
                error!(error = %err, "Forms access check failed");
                Err("Unable to access Mautic forms. Check API permissions.".to_string())
            }
        }
    }

    async fn segments_access(&self) -> std::result::Result<String, String> {
        match self.fetch_uncached("segments").await {
            Ok(segments) => Ok(format!(
                "Segments Access: Found {} segments",
                total(&segments).unwrap_or_else(|| "0".to_string())
            )),
            Err(err) => {
                warn!(error = %err, "Segments access check failed");
                Err("Unable to access Mautic segments. Check API permissions.".to_string())
            }
        }
    }
}

/// The `total` field, which Mautic sends as a number or a numeric string.
fn total(body: &Value) -> Option<String> {
    match body.get("total")? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}
