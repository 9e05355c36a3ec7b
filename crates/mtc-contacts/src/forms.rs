//! Form catalog: option lists, details and embed URLs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, instrument};

use mtcbridge_client::RequestOptions;

use crate::contact::{items_of, value_to_id};
use crate::keys::{form_details_key, CATALOG_LIFETIME, FORM_OPTIONS_KEY};
use crate::rest::MauticRestClient;

/// Summary numbers for one form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormStats {
    pub submissions: u64,
    pub published: bool,
    pub created: Option<String>,
    pub modified: Option<String>,
}

/// Cached views of Mautic forms.
#[derive(Debug, Clone)]
pub struct FormCatalog {
    rest: MauticRestClient,
}

impl FormCatalog {
    pub fn new(rest: MauticRestClient) -> Self {
        Self { rest }
    }

    /// Form id -> `"Name (ID: n)"` for the first 100 forms.
    ///
    /// Cached for an hour. Failures are logged and give an empty map.
    #[instrument(skip(self))]
    pub async fn form_options(&self) -> BTreeMap<String, String> {
        let client = self.rest.inner();
        if let Some(cached) = client.cache().get(FORM_OPTIONS_KEY, client.clock().now()) {
            if let Ok(options) = serde_json::from_value(cached) {
                return options;
            }
        }

        let body = match self
            .rest
            .get_forms(&RequestOptions::new().query("limit", 100))
            .await
        {
            Ok(body) => body,
            Err(err) => {
                error!(error = %err, "Failed to fetch form options");
                return BTreeMap::new();
            }
        };

        let options = body.get("forms").map(labelled_options).unwrap_or_default();
        store(&self.rest, FORM_OPTIONS_KEY, &options);
        options
    }

    /// The `form` object of `forms/{id}`, cached for an hour.
    #[instrument(skip(self))]
    pub async fn form_details(&self, form_id: &str) -> Option<Value> {
        if form_id.is_empty() {
            return None;
        }

        let client = self.rest.inner();
        let key = form_details_key(form_id);
        if let Some(cached) = client.cache().get(&key, client.clock().now()) {
            return Some(cached);
        }

        match self.rest.get_form(form_id).await {
            Ok(body) => {
                let form = body.get("form").filter(|form| is_non_empty_object(form))?.clone();
                store(&self.rest, &key, &form);
                Some(form)
            }
            Err(err) => {
                error!(form_id, error = %err, "Failed to fetch form details");
                None
            }
        }
    }

    /// Submission count, publish state and dates for a form.
    pub async fn form_stats(&self, form_id: &str) -> Option<FormStats> {
        let form = self.form_details(form_id).await?;
        Some(FormStats {
            submissions: form
                .get("submissionCount")
                .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
                .unwrap_or(0),
            published: form.get("isPublished").and_then(Value::as_bool).unwrap_or(false),
            created: form.get("dateAdded").and_then(Value::as_str).map(str::to_string),
            modified: form.get("dateModified").and_then(Value::as_str).map(str::to_string),
        })
    }

    /// Embed script URL: `{base}/form/{id}`.
    pub fn form_script_url(&self, form_id: &str) -> String {
        format!("{}/form/{}", self.rest.base_url(), form_id)
    }

    /// Drop one form's details, or the option list when `None`.
    pub fn clear_cache(&self, form_id: Option<&str>) {
        let cache = self.rest.inner().cache();
        match form_id {
            Some(id) => cache.delete(&form_details_key(id)),
            None => cache.delete(FORM_OPTIONS_KEY),
        }
        debug!(form_id, "Cleared form cache");
    }
}

/// `{id: "Name (ID: id)"}` from a collection of `{id, name}` objects.
pub(crate) fn labelled_options(collection: &Value) -> BTreeMap<String, String> {
    items_of(collection)
        .into_iter()
        .filter_map(|item| {
            let id = item.get("id").and_then(value_to_id)?;
            let name = item.get("name").and_then(Value::as_str).unwrap_or_default();
            Some((id.clone(), format!("{} (ID: {})", name, id)))
        })
        .collect()
}

pub(crate) fn store<T: Serialize>(rest: &MauticRestClient, key: &str, value: &T) {
    let client = rest.inner();
    match serde_json::to_value(value) {
        Ok(value) => client
            .cache()
            .set(key, value, client.clock().now(), CATALOG_LIFETIME),
        Err(err) => error!(key, error = %err, "Could not cache catalog entry"),
    }
}

fn is_non_empty_object(value: &Value) -> bool {
    value.as_object().is_some_and(|map| !map.is_empty())
}
