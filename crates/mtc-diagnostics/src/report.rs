//! Report types.

use serde::{Deserialize, Serialize};

use mtcbridge_auth::TokenStatus;

/// Outcome of a full configuration check. Entries are only ever appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticResult {
    pub success: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub info: Vec<String>,
}

impl Default for DiagnosticResult {
    fn default() -> Self {
        Self {
            success: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            info: Vec::new(),
        }
    }
}

impl DiagnosticResult {
    /// A passing result with no entries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error and mark the result failed.
    pub fn error(&mut self, message: impl Into<String>) {
        self.success = false;
        self.errors.push(message.into());
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.info.push(message.into());
    }
}

/// Outcome of the connectivity stage.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConnectionReport {
    pub success: bool,
    pub message: String,
    pub details: ConnectionDetails,
}

impl ConnectionReport {
    pub(crate) fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            details: ConnectionDetails::default(),
        }
    }
}

/// Facts gathered while connecting. Unset fields are omitted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConnectionDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mautic_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_info: Option<TokenStatus>,
}

impl ConnectionDetails {
    /// One `"Label: value"` line per set field, in declaration order.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(url) = &self.mautic_url {
            lines.push(format!("Mautic url: {}", url));
        }
        if let Some(method) = &self.auth_method {
            lines.push(format!("Auth method: {}", method));
        }
        if let Some(response) = &self.api_response {
            lines.push(format!("Api response: {}", response));
        }
        if let Some(status) = &self.token_info {
            let rendered = serde_json::to_string(status).unwrap_or_else(|_| status.to_string());
            lines.push(format!("Token info: {}", rendered));
        }
        lines
    }
}
