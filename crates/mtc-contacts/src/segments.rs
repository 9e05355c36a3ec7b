//! Segment catalog and visitor segment cache maintenance.

use std::collections::BTreeMap;

use tracing::{debug, error, instrument};

use mtcbridge_client::RequestOptions;

use crate::forms::{labelled_options, store};
use crate::keys::{user_segments_key, SEGMENT_OPTIONS_KEY, USER_SEGMENTS_PREFIX};
use crate::rest::MauticRestClient;

/// Cached views of Mautic segments.
#[derive(Debug, Clone)]
pub struct SegmentCatalog {
    rest: MauticRestClient,
}

impl SegmentCatalog {
    pub fn new(rest: MauticRestClient) -> Self {
        Self { rest }
    }

    /// Segment id -> `"Name (ID: n)"` for the first 100 segments.
    ///
    /// Cached for an hour. Failures are logged and give an empty map.
    #[instrument(skip(self))]
    pub async fn segment_options(&self) -> BTreeMap<String, String> {
        let client = self.rest.inner();
        if let Some(cached) = client.cache().get(SEGMENT_OPTIONS_KEY, client.clock().now()) {
            if let Ok(options) = serde_json::from_value(cached) {
                return options;
            }
        }

        let body = match self
            .rest
            .get_segments(&RequestOptions::new().query("limit", 100))
            .await
        {
            Ok(body) => body,
            Err(err) => {
                error!(error = %err, "Failed to fetch segment options");
                return BTreeMap::new();
            }
        };

        let options = body.get("lists").map(labelled_options).unwrap_or_default();
        store(&self.rest, SEGMENT_OPTIONS_KEY, &options);
        options
    }

    /// Drop one visitor's segment set, or every visitor set plus the option list.
    pub fn clear_cache(&self, tracking_id: Option<&str>) {
        let cache = self.rest.inner().cache();
        match tracking_id {
            Some(id) => cache.delete(&user_segments_key(id)),
            None => {
                cache.delete(SEGMENT_OPTIONS_KEY);
                let removed = cache.delete_prefix(USER_SEGMENTS_PREFIX);
                debug!(removed, "Cleared visitor segment cache");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mtcbridge_client::{CacheStore, ClientConfig, ManualClock, MauticClient, StaticAuth};
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn catalog(server: &MockServer) -> SegmentCatalog {
        let client = MauticClient::new(server.uri(), ClientConfig::default())
            .unwrap()
            .with_auth(Arc::new(StaticAuth::bearer("token")))
            .with_clock(Arc::new(ManualClock::new(0)));
        SegmentCatalog::new(MauticRestClient::new(client))
    }

    #[tokio::test]
    async fn test_segment_options_from_keyed_lists() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/segments"))
            .and(query_param("limit", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total": 2,
                "lists": {"1": {"id": 1, "name": "Leads"}, "2": {"id": "2", "name": "Customers"}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let catalog = catalog(&server);
        let options = catalog.segment_options().await;
        assert_eq!(options.len(), 2);
        assert_eq!(options["2"], "Customers (ID: 2)");

        assert_eq!(catalog.segment_options().await, options);
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let server = MockServer::start().await;
        let catalog = catalog(&server);
        let cache: Arc<dyn CacheStore> = catalog.rest.inner().cache().clone();

        cache.set(&user_segments_key("a"), json!(["x"]), 0, 100);
        cache.set(&user_segments_key("b"), json!(["y"]), 0, 100);
        cache.set(SEGMENT_OPTIONS_KEY, json!({}), 0, 100);
        cache.set("mautic_api:contacts:abc", json!({}), 0, 100);

        catalog.clear_cache(Some("a"));
        assert!(cache.get(&user_segments_key("a"), 0).is_none());
        assert!(cache.get(&user_segments_key("b"), 0).is_some());

        catalog.clear_cache(None);
        assert!(cache.get(&user_segments_key("b"), 0).is_none());
        assert!(cache.get(SEGMENT_OPTIONS_KEY, 0).is_none());
        assert!(cache.get("mautic_api:contacts:abc", 0).is_some());
    }
}
