//! End-to-end tests for the `MauticIntegration` facade against a mock Mautic.
//!
//! Run with:
//!   cargo test --test integration

use std::sync::Arc;

use mtcbridge::auth::{FileTokenStore, TokenStore};
use mtcbridge::{MauticIntegration, RequestMethod, RequestOptions, Settings, TrackingSources};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn oauth_settings(server: &MockServer) -> Settings {
    Settings::new(server.uri()).with_oauth2("client-id", "client-secret")
}

async fn mount_token(server: &MockServer, token: &str, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/oauth/v2/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "expires_in": 3600,
            "token_type": "bearer"
        })))
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_visitor(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path("/api/contacts"))
        .and(query_param("search", "device_id:dev-abc"))
        .and(header("Authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 1,
            "contacts": {"31": {"id": 31, "tags": [{"tag": "webinar"}]}}
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/contacts/31/segments"))
        .and(header("Authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 1,
            "lists": {"4": {"id": 4, "name": "Customers", "alias": "customers"}}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn oauth2_visitor_segments() {
    let server = MockServer::start().await;
    mount_token(&server, "tok-1", 1).await;
    mount_visitor(&server, "tok-1").await;

    let mautic = MauticIntegration::new(oauth_settings(&server)).unwrap();

    let segments = mautic.get_user_segments_by_tracking_id("dev-abc").await;
    assert!(segments.contains("Customers"));
    assert!(segments.contains("webinar"));

    let contact = mautic.find_contact_by_tracking_id("dev-abc").await.unwrap();
    assert_eq!(contact.id, "31");

    assert_eq!(mautic.get_access_token().await.as_deref(), Some("tok-1"));
    assert!(mautic.token_info().unwrap().is_valid());
}

#[tokio::test]
async fn current_user_info_from_request_sources() {
    let server = MockServer::start().await;
    mount_token(&server, "tok-1", 1).await;
    mount_visitor(&server, "tok-1").await;

    let mautic = MauticIntegration::new(oauth_settings(&server)).unwrap();
    let sources = TrackingSources::new()
        .with_mtc_id_cookie("not-a-number")
        .with_bridged_cookie("mautic_device_id", "dev-abc");

    let info = mautic.current_user_info(&sources).await;
    assert!(info.tracking_active);
    assert_eq!(info.tracking_id.as_deref(), Some("dev-abc"));
    assert_eq!(info.segments.len(), 2);

    let anonymous = mautic.current_user_info(&TrackingSources::new()).await;
    assert!(!anonymous.tracking_active);
    assert!(anonymous.segments.is_empty());
}

#[tokio::test]
async fn basic_auth_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/contacts/new"))
        .and(header("Authorization", "Basic dXNlcjpwYXNz"))
        .and(header("Content-Type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"contact": {"id": 77}})))
        .expect(1)
        .mount(&server)
        .await;

    let mautic =
        MauticIntegration::new(Settings::new(server.uri()).with_basic_auth("user", "pass")).unwrap();
    let options = RequestOptions::new()
        .json(&json!({"email": "new@example.com"}))
        .unwrap();

    let body = mautic
        .request(RequestMethod::Post, "contacts/new", &options, true)
        .await
        .unwrap();
    assert_eq!(body["contact"]["id"], 77);
    assert!(mautic.get_access_token().await.is_none());
    assert!(mautic.token_info().is_none());
}

#[tokio::test]
async fn missing_oauth_config_makes_no_requests() {
    let server = MockServer::start().await;
    let mautic = MauticIntegration::new(Settings::new(server.uri()).with_oauth2("", "")).unwrap();

    assert!(mautic.get_access_token().await.is_none());
    assert!(mautic
        .request(RequestMethod::Get, "contacts", &RequestOptions::new(), true)
        .await
        .is_none());
    assert!(mautic.find_contact_by_tracking_id("12").await.is_none());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn clear_token_forces_new_grant() {
    let server = MockServer::start().await;
    mount_token(&server, "tok-1", 2).await;

    let mautic = MauticIntegration::new(oauth_settings(&server)).unwrap();
    assert!(mautic.get_access_token().await.is_some());
    assert!(mautic.get_access_token().await.is_some());

    mautic.clear_token();
    assert_eq!(
        mautic.token_info().unwrap().to_string(),
        "No token stored"
    );
    assert!(mautic.get_access_token().await.is_some());
}

#[tokio::test]
async fn file_token_store_survives_restart() {
    let server = MockServer::start().await;
    mount_token(&server, "persisted", 1).await;
    let dir = tempfile::TempDir::new().unwrap();

    for _ in 0..2 {
        let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::with_path(dir.path()));
        let mautic = MauticIntegration::builder(oauth_settings(&server))
            .with_token_store(store)
            .build()
            .unwrap();
        assert_eq!(mautic.get_access_token().await.as_deref(), Some("persisted"));
    }
}

#[tokio::test]
async fn retries_transient_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/forms"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/forms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 0, "forms": []})))
        .expect(1)
        .mount(&server)
        .await;

    let mut settings = Settings::new(server.uri()).with_basic_auth("user", "pass");
    settings.api_retry_attempts = 1;
    let mautic = MauticIntegration::new(settings).unwrap();

    let body = mautic
        .request(RequestMethod::Get, "forms", &RequestOptions::new(), false)
        .await
        .unwrap();
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn validate_configuration_reports_token_status() {
    let server = MockServer::start().await;
    mount_token(&server, "tok-1", 1).await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    for (endpoint, total) in [("contacts", 8), ("forms", 2), ("segments", 4)] {
        Mock::given(method("GET"))
            .and(path(format!("/api/{}", endpoint)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": total})))
            .mount(&server)
            .await;
    }

    let mautic = MauticIntegration::new(oauth_settings(&server)).unwrap();
    let result = mautic.validate_configuration().await;

    assert!(result.success, "{:?}", result);
    assert!(result.info.contains(&"Auth method: OAuth2".to_string()));
    assert!(result.info.contains(&"Api response: Found 8 contacts".to_string()));
    assert!(result
        .info
        .iter()
        .any(|line| line.starts_with("Token info: ") && line.contains("\"status\":\"Valid\"")));
    assert!(!result.info.iter().any(|line| line.contains("tok-1")));
}

#[tokio::test]
async fn clear_cache_refetches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/segments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 0, "lists": []})))
        .expect(2)
        .mount(&server)
        .await;

    let mautic =
        MauticIntegration::new(Settings::new(server.uri()).with_basic_auth("user", "pass")).unwrap();

    let options = RequestOptions::new();
    let get = || mautic.request(RequestMethod::Get, "segments", &options, true);
    assert!(get().await.is_some());
    assert!(get().await.is_some());
    assert_eq!(mautic.clear_cache(Some("segments")), 1);
    assert!(get().await.is_some());
}
