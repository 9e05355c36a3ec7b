//! Typed wrappers over the gateway for the endpoints this crate uses.

use serde_json::Value;
use tracing::instrument;

use mtcbridge_client::{MauticClient, RequestMethod, RequestOptions, Result};

/// Mautic REST helpers.
///
/// Form endpoints honour the form cache toggle and segment endpoints the
/// segment toggle; contact endpoints are always cached.
#[derive(Debug, Clone)]
pub struct MauticRestClient {
    client: MauticClient,
}

impl MauticRestClient {
    /// Wrap a configured gateway.
    pub fn new(client: MauticClient) -> Self {
        Self { client }
    }

    /// The underlying gateway.
    pub fn inner(&self) -> &MauticClient {
        &self.client
    }

    /// Base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }

    /// `GET contacts` with query parameters (`search`, `limit`, ...).
    #[instrument(skip(self, params))]
    pub async fn get_contacts(&self, params: &RequestOptions) -> Result<Value> {
        self.client.get("contacts", params).await
    }

    /// `GET contacts/{id}`.
    #[instrument(skip(self))]
    pub async fn get_contact(&self, contact_id: &str) -> Result<Value> {
        self.client
            .get(&format!("contacts/{}", contact_id), &RequestOptions::new())
            .await
    }

    /// `GET forms`.
    #[instrument(skip(self, params))]
    pub async fn get_forms(&self, params: &RequestOptions) -> Result<Value> {
        let use_cache = self.client.config().cache.form_enabled;
        self.client
            .send(RequestMethod::Get, "forms", params, use_cache)
            .await
    }

    /// `GET forms/{id}`.
    #[instrument(skip(self))]
    pub async fn get_form(&self, form_id: &str) -> Result<Value> {
        let use_cache = self.client.config().cache.form_enabled;
        self.client
            .send(
                RequestMethod::Get,
                &format!("forms/{}", form_id),
                &RequestOptions::new(),
                use_cache,
            )
            .await
    }

    /// `GET segments`.
    #[instrument(skip(self, params))]
    pub async fn get_segments(&self, params: &RequestOptions) -> Result<Value> {
        let use_cache = self.client.config().cache.segment_enabled;
        self.client
            .send(RequestMethod::Get, "segments", params, use_cache)
            .await
    }

    /// `GET contacts/{id}/segments`.
    #[instrument(skip(self))]
    pub async fn get_contact_segments(&self, contact_id: &str) -> Result<Value> {
        let use_cache = self.client.config().cache.segment_enabled;
        self.client
            .send(
                RequestMethod::Get,
                &format!("contacts/{}/segments", contact_id),
                &RequestOptions::new(),
                use_cache,
            )
            .await
    }
}
