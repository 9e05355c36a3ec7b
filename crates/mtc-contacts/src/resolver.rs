//! Tracking identifier -> contact resolution.
//!
//! A tracking identifier is whatever the visitor's browser carried: a contact
//! id from a Mautic redirect, or an opaque device/cookie id. Resolution walks
//! an ordered list of [`LookupStrategy`] values and stops at the first match:
//!
//! 1. [`DirectIdLookup`] - `contacts/{id}`, numeric ids only
//! 2. [`FieldSearchLookup`] on `device_id`
//! 3. [`FieldSearchLookup`] on `mtc_id`
//!
//! Remote calls are made one after another; a strategy's error is logged and
//! counts as "no match". Field searches only run for ids made of letters,
//! digits, `-`, `_` and `.`, so a cookie value cannot add search operators.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use mtcbridge_client::{Error, ErrorKind, RequestOptions, Result};

use crate::contact::{extract_segment_names, first_of, is_numeric_id, ContactRecord, SegmentListing, SegmentSet};
use crate::keys::user_segments_key;
use crate::rest::MauticRestClient;

/// One way of finding a contact for a tracking identifier.
#[async_trait]
pub trait LookupStrategy: Send + Sync + std::fmt::Debug {
    /// Label used in logs.
    fn name(&self) -> &str;

    /// `Ok(None)` when this strategy does not apply or finds nothing.
    async fn lookup(&self, rest: &MauticRestClient, tracking_id: &str) -> Result<Option<ContactRecord>>;
}

/// Treat the identifier as a contact id.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectIdLookup;

#[async_trait]
impl LookupStrategy for DirectIdLookup {
    fn name(&self) -> &str {
        "direct_id"
    }

    async fn lookup(&self, rest: &MauticRestClient, tracking_id: &str) -> Result<Option<ContactRecord>> {
        if !is_numeric_id(tracking_id) {
            return Ok(None);
        }

        match rest.get_contact(tracking_id).await {
            Ok(body) => Ok(body.get("contact").and_then(ContactRecord::from_value)),
            Err(err) if matches!(err.kind, ErrorKind::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// Search contacts where `field` equals the identifier.
#[derive(Debug, Clone)]
pub struct FieldSearchLookup {
    field: String,
}

impl FieldSearchLookup {
    /// Search on a contact field, e.g. `device_id`.
    pub fn new(field: impl Into<String>) -> Self {
        Self { field: field.into() }
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

#[async_trait]
impl LookupStrategy for FieldSearchLookup {
    fn name(&self) -> &str {
        &self.field
    }

    async fn lookup(&self, rest: &MauticRestClient, tracking_id: &str) -> Result<Option<ContactRecord>> {
        if !is_searchable_id(tracking_id) {
            debug!(field = %self.field, "Tracking id contains search syntax, skipping search");
            return Ok(None);
        }

        let params = RequestOptions::new()
            .query("search", format!("{}:{}", self.field, tracking_id))
            .query("limit", 1);

        match rest.get_contacts(&params).await {
            Ok(body) => Ok(body
                .get("contacts")
                .and_then(first_of)
                .and_then(ContactRecord::from_value)),
            Err(err) if matches!(err.kind, ErrorKind::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// True when `id` can be embedded in a `field:value` search as a single literal term.
pub fn is_searchable_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

/// What the page layer needs to know about the current visitor.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VisitorInfo {
    pub tracking_id: Option<String>,
    pub contact: Option<ContactRecord>,
    pub segments: SegmentSet,
    pub tracking_active: bool,
}

/// Resolves tracking identifiers to contacts and segment sets.
#[derive(Debug)]
pub struct ContactResolver {
    rest: MauticRestClient,
    strategies: Vec<Box<dyn LookupStrategy>>,
}

impl ContactResolver {
    /// Resolver with the standard strategy order.
    pub fn new(rest: MauticRestClient) -> Self {
        Self::with_strategies(rest, default_strategies())
    }

    /// Resolver with a custom strategy order.
    pub fn with_strategies(rest: MauticRestClient, strategies: Vec<Box<dyn LookupStrategy>>) -> Self {
        Self { rest, strategies }
    }

    pub fn rest(&self) -> &MauticRestClient {
        &self.rest
    }

    /// First contact any strategy finds, or `None`.
    #[instrument(skip(self))]
    pub async fn find_contact_by_tracking_id(&self, tracking_id: &str) -> Option<ContactRecord> {
        if tracking_id.is_empty() {
            return None;
        }

        for strategy in &self.strategies {
            match strategy.lookup(&self.rest, tracking_id).await {
                Ok(Some(contact)) => {
                    debug!(strategy = strategy.name(), contact_id = %contact.id, "Resolved contact");
                    return Some(contact);
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(strategy = strategy.name(), error = %err, "Contact lookup failed");
                }
            }
        }

        debug!("No contact found for tracking ID");
        None
    }

    /// Segment and tag names for a visitor. Never fails; problems yield an empty set.
    ///
    /// Results are cached per identifier for the segment lifetime, and only
    /// once the contact's segment memberships were fetched successfully.
    #[instrument(skip(self))]
    pub async fn get_user_segments_by_tracking_id(&self, tracking_id: &str) -> SegmentSet {
        if tracking_id.is_empty() {
            return SegmentSet::new();
        }

        let client = self.rest.inner();
        let key = user_segments_key(tracking_id);
        if let Some(cached) = client.cache().get(&key, client.clock().now()) {
            if let Ok(segments) = serde_json::from_value::<SegmentSet>(cached) {
                debug!("Serving visitor segments from cache");
                return segments;
            }
        }

        let Some(contact) = self.find_contact_by_tracking_id(tracking_id).await else {
            return SegmentSet::new();
        };

        let listing = match self.contact_segments(&contact).await {
            Ok(listing) => listing,
            Err(err) => {
                error!(contact_id = %contact.id, error = %err, "Failed to fetch contact segments");
                return SegmentSet::new();
            }
        };

        let mut segments = extract_segment_names(&contact);
        segments.extend_lists(&listing.lists);

        let cache = &client.config().cache;
        if cache.segment_enabled {
            match serde_json::to_value(&segments) {
                Ok(value) => {
                    client
                        .cache()
                        .set(&key, value, client.clock().now(), cache.segment_lifetime)
                }
                Err(err) => warn!(error = %err, "Could not cache visitor segments"),
            }
        }

        segments
    }

    /// Contact, segments and tracking state for an optional identifier.
    pub async fn current_user_info(&self, tracking_id: Option<&str>) -> VisitorInfo {
        let tracking_id = tracking_id.filter(|id| !id.is_empty());
        let Some(id) = tracking_id else {
            return VisitorInfo::default();
        };

        VisitorInfo {
            tracking_id: Some(id.to_string()),
            contact: self.find_contact_by_tracking_id(id).await,
            segments: self.get_user_segments_by_tracking_id(id).await,
            tracking_active: true,
        }
    }

    async fn contact_segments(&self, contact: &ContactRecord) -> Result<SegmentListing> {
        if !contact.has_numeric_id() {
            return Err(Error::new(ErrorKind::Other(format!(
                "contact id '{}' is not numeric",
                contact.id
            ))));
        }
        let body: Value = self.rest.get_contact_segments(&contact.id).await?;
        Ok(SegmentListing::from_value(&body))
    }
}

/// `[DirectIdLookup, device_id search, mtc_id search]`.
pub fn default_strategies() -> Vec<Box<dyn LookupStrategy>> {
    vec![
        Box::new(DirectIdLookup),
        Box::new(FieldSearchLookup::new("device_id")),
        Box::new(FieldSearchLookup::new("mtc_id")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use mtcbridge_client::{CacheConfig, ClientConfig, ManualClock, MauticClient, StaticAuth};
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver(server: &MockServer, clock: Arc<ManualClock>) -> ContactResolver {
        resolver_with_cache(server, clock, CacheConfig::default())
    }

    fn resolver_with_cache(server: &MockServer, clock: Arc<ManualClock>, cache: CacheConfig) -> ContactResolver {
        let config = ClientConfig::builder().with_cache(cache).build();
        let client = MauticClient::new(server.uri(), config)
            .unwrap()
            .with_auth(Arc::new(StaticAuth::bearer("token")))
            .with_clock(clock);
        ContactResolver::new(MauticRestClient::new(client))
    }

    async fn mount_search(server: &MockServer, field: &str, id: &str, body: Value, expected: u64) {
        Mock::given(method("GET"))
            .and(path("/api/contacts"))
            .and(query_param("search", format!("{}:{}", field, id)))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(expected)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_direct_id_wins() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/contacts/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"contact": {"id": 42}})))
            .expect(1)
            .mount(&server)
            .await;
        mount_search(&server, "device_id", "42", json!({"contacts": []}), 0).await;

        let contact = resolver(&server, Arc::new(ManualClock::new(0)))
            .find_contact_by_tracking_id("42")
            .await
            .unwrap();
        assert_eq!(contact.id, "42");
    }

    #[tokio::test]
    async fn test_non_numeric_skips_direct_lookup() {
        let server = MockServer::start().await;
        mount_search(
            &server,
            "device_id",
            "abc123x",
            json!({"total": 1, "contacts": {"7": {"id": 7}}}),
            1,
        )
        .await;
        mount_search(&server, "mtc_id", "abc123x", json!({"contacts": []}), 0).await;

        let contact = resolver(&server, Arc::new(ManualClock::new(0)))
            .find_contact_by_tracking_id("abc123x")
            .await
            .unwrap();
        assert_eq!(contact.id, "7");
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_falls_through_to_mtc_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/contacts/99"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"contact": []})))
            .expect(1)
            .mount(&server)
            .await;
        mount_search(&server, "device_id", "99", json!({"contacts": []}), 1).await;
        mount_search(&server, "mtc_id", "99", json!({"contacts": [{"id": 3}]}), 1).await;

        let contact = resolver(&server, Arc::new(ManualClock::new(0)))
            .find_contact_by_tracking_id("99")
            .await
            .unwrap();
        assert_eq!(contact.id, "3");
    }

    #[tokio::test]
    async fn test_strategy_errors_are_no_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/contacts/8"))
            .respond_with(ResponseTemplate::new(404).set_body_json(
                json!({"errors": [{"code": 404, "message": "Item was not found."}]}),
            ))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/contacts"))
            .and(query_param("search", "device_id:8"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad"))
            .expect(1)
            .mount(&server)
            .await;
        mount_search(&server, "mtc_id", "8", json!({"contacts": {}}), 1).await;

        let found = resolver(&server, Arc::new(ManualClock::new(0)))
            .find_contact_by_tracking_id("8")
            .await;
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_empty_identifier_makes_no_requests() {
        let server = MockServer::start().await;
        let resolver = resolver(&server, Arc::new(ManualClock::new(0)));

        assert!(resolver.find_contact_by_tracking_id("").await.is_none());
        assert!(resolver.get_user_segments_by_tracking_id("").await.is_empty());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[test]
    fn test_is_searchable_id() {
        assert!(is_searchable_id("abc123x"));
        assert!(is_searchable_id("5f2b.9c_d-1"));
        assert!(!is_searchable_id(""));
        assert!(!is_searchable_id("x or email:%"));
        assert!(!is_searchable_id("a b"));
        assert!(!is_searchable_id("%"));
        assert!(!is_searchable_id("abc*"));
        assert!(!is_searchable_id("\"quoted\""));
        assert!(!is_searchable_id("!device"));
    }

    #[tokio::test]
    async fn test_search_syntax_in_id_makes_no_requests() {
        let server = MockServer::start().await;
        let resolver = resolver(&server, Arc::new(ManualClock::new(0)));

        for id in ["x or email:%", "dev 1", "%", "a*", "mtc_id:1"] {
            assert!(resolver.find_contact_by_tracking_id(id).await.is_none());
        }
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    async fn mount_visitor(server: &MockServer, expected: u64) {
        mount_search(
            server,
            "device_id",
            "dev-1",
            json!({"contacts": [{"id": 5, "lists": [{"name": "A"}], "tags": [{"tag": "C"}]}]}),
            expected,
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/api/contacts/5/segments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total": 2,
                "lists": {"1": {"id": 1, "name": "A"}, "2": {"id": 2, "name": "B"}}
            })))
            .expect(expected)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_user_segments_union_and_cache() {
        let server = MockServer::start().await;
        mount_visitor(&server, 1).await;

        let clock = Arc::new(ManualClock::new(1_000));
        let resolver = resolver(&server, clock.clone());

        let segments = resolver.get_user_segments_by_tracking_id("dev-1").await;
        assert_eq!(segments.iter().collect::<Vec<_>>(), vec!["A", "B", "C"]);

        clock.advance(299);
        let cached = resolver.get_user_segments_by_tracking_id("dev-1").await;
        assert_eq!(cached, segments);
    }

    #[tokio::test]
    async fn test_user_segments_expire_with_segment_lifetime() {
        let server = MockServer::start().await;
        mount_visitor(&server, 2).await;

        let clock = Arc::new(ManualClock::new(1_000));
        let cache = CacheConfig {
            default_lifetime: 60,
            ..CacheConfig::default().with_segments(true, 60)
        };
        let resolver = resolver_with_cache(&server, clock.clone(), cache);

        resolver.get_user_segments_by_tracking_id("dev-1").await;
        clock.advance(60);
        let again = resolver.get_user_segments_by_tracking_id("dev-1").await;
        assert_eq!(again.len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_visitor_gets_empty_set_uncached() {
        let server = MockServer::start().await;
        mount_search(&server, "device_id", "ghost", json!({"contacts": []}), 2).await;
        mount_search(&server, "mtc_id", "ghost", json!({"contacts": []}), 2).await;

        let clock = Arc::new(ManualClock::new(0));
        // Disable gateway caching of the searches so the second pass is visible.
        let cache = CacheConfig {
            default_lifetime: 0,
            ..CacheConfig::default()
        };
        let resolver = resolver_with_cache(&server, clock, cache);

        assert!(resolver.get_user_segments_by_tracking_id("ghost").await.is_empty());
        assert!(resolver.get_user_segments_by_tracking_id("ghost").await.is_empty());
    }

    #[tokio::test]
    async fn test_segment_fetch_failure_is_empty() {
        let server = MockServer::start().await;
        mount_search(&server, "device_id", "dev-2", json!({"contacts": [{"id": 6, "tags": [{"tag": "x"}]}]}), 1)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/contacts/6/segments"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let segments = resolver(&server, Arc::new(ManualClock::new(0)))
            .get_user_segments_by_tracking_id("dev-2")
            .await;
        assert!(segments.is_empty());
    }

    #[tokio::test]
    async fn test_current_user_info() {
        let server = MockServer::start().await;
        mount_visitor(&server, 1).await;
        let resolver = resolver(&server, Arc::new(ManualClock::new(0)));

        let info = resolver.current_user_info(Some("dev-1")).await;
        assert!(info.tracking_active);
        assert_eq!(info.contact.unwrap().id, "5");
        assert_eq!(info.segments.len(), 3);

        let none = resolver.current_user_info(None).await;
        assert!(!none.tracking_active);
        assert!(none.contact.is_none());
        assert!(none.segments.is_empty());
    }
}
