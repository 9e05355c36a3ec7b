//! Choosing a tracking identifier from what the visitor's request carried.
//!
//! Callers own request parsing; they hand over the raw values and get back
//! the identifier to resolve.

use std::collections::HashMap;

use tracing::debug;

use crate::contact::is_numeric_id;

/// Cookie names a browser-side bridge may report, in priority order.
pub const BRIDGED_COOKIE_NAMES: [&str; 3] = ["mtc_id", "mautic_device_id", "mtc_sid"];

/// Identifier candidates from one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackingSources {
    /// `contact_id` URL parameter set by a Mautic redirect.
    pub contact_id_param: Option<String>,
    /// `mtc_id` cookie.
    pub mtc_id_cookie: Option<String>,
    /// Mautic cookies relayed by the browser bridge.
    pub bridged_cookies: HashMap<String, String>,
}

impl TrackingSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contact_id_param(mut self, value: impl Into<String>) -> Self {
        self.contact_id_param = Some(value.into());
        self
    }

    pub fn with_mtc_id_cookie(mut self, value: impl Into<String>) -> Self {
        self.mtc_id_cookie = Some(value.into());
        self
    }

    pub fn with_bridged_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.bridged_cookies.insert(name.into(), value.into());
        self
    }

    /// The identifier to use, if any.
    ///
    /// URL parameter and cookie count only when numeric; bridged cookies are
    /// taken as-is in [`BRIDGED_COOKIE_NAMES`] order.
    pub fn tracking_id(&self) -> Option<String> {
        if let Some(id) = self.contact_id_param.as_deref().filter(|id| is_numeric_id(id)) {
            debug!(source = "url", "Found tracking ID");
            return Some(id.to_string());
        }

        if let Some(id) = self.mtc_id_cookie.as_deref().filter(|id| is_numeric_id(id)) {
            debug!(source = "cookie", "Found tracking ID");
            return Some(id.to_string());
        }

        for name in BRIDGED_COOKIE_NAMES {
            if let Some(id) = self.bridged_cookies.get(name).filter(|id| !id.is_empty()) {
                debug!(source = name, "Found tracking ID in bridged cookies");
                return Some(id.clone());
            }
        }

        debug!("No tracking ID found in any source");
        None
    }

    pub fn is_tracking_active(&self) -> bool {
        self.tracking_id().is_some()
    }
}
