//! Integration tests for the webhook endpoint: real router, real upstream
//! client, fake fact sheet API.

use super::test_utils::{capability_data, spawn_server, spawn_upstream, FakeUpstream, WORKSPACE_ID};
use bcmaps_listener::guard::TransactionGuard;
use bcmaps_listener::pipeline::{RebuildPipeline, SnapshotSource};
use bcmaps_listener::server::{router, AppState, AuthConfig, GENERIC_ERROR_MESSAGE};
use bcmaps_listener::snapshot::SnapshotBuilder;
use bcmaps_listener::upstream::LeanixClient;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;

const USERNAME: &str = "hook";
const PASSWORD: &str = "s3cret";

struct Harness {
    fake: Arc<FakeUpstream>,
    guard: Arc<TransactionGuard>,
    base_url: String,
    http: reqwest::Client,
}

impl Harness {
    async fn start(auth: AuthConfig) -> Self {
        let fake = FakeUpstream::new(capability_data());
        let upstream = spawn_upstream(fake.clone()).await;

        let client = Arc::new(LeanixClient::new(&upstream).unwrap());
        let source: Arc<dyn SnapshotSource> =
            Arc::new(RebuildPipeline::new(SnapshotBuilder::new(client), None));
        let guard = Arc::new(TransactionGuard::new(source));
        let state = Arc::new(AppState::new(guard.clone(), &auth));
        let base_url = spawn_server(router(state)).await;

        Self {
            fake,
            guard,
            base_url,
            http: reqwest::Client::new(),
        }
    }

    async fn with_credentials() -> Self {
        Self::start(AuthConfig {
            username: Some(USERNAME.to_string()),
            password: Some(PASSWORD.to_string()),
        })
        .await
    }

    async fn post_event(&self, body: Value) -> reqwest::Response {
        self.http
            .post(format!("{}/", self.base_url))
            .basic_auth(USERNAME, Some(PASSWORD))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn get_snapshot(&self) -> reqwest::Response {
        self.http
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .unwrap()
    }
}

fn capability_event(transaction: i64) -> Value {
    json!({
        "type": "FactSheetUpdatedEvent",
        "transactionSequenceNumber": transaction,
        "factSheet": {"id": "b", "type": "BusinessCapability"}
    })
}

#[tokio::test]
async fn test_get_fills_cache_once_and_allows_any_origin() {
    let harness = Harness::with_credentials().await;

    let response = harness.get_snapshot().await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["workspaceId"], json!(WORKSPACE_ID));
    assert_eq!(body["instance"], json!("test.leanix.net"));
    assert_eq!(body["bcMaps"][0]["id"], json!("root"));
    assert!(body.get("transactionSequenceNumber").is_none());

    let again: Value = harness.get_snapshot().await.json().await.unwrap();
    assert_eq!(again, body);
    assert_eq!(harness.fake.query_count(), 1);
}

#[tokio::test]
async fn test_event_rebuilds_and_duplicate_is_ignored() {
    let harness = Harness::with_credentials().await;

    let response = harness.post_event(capability_event(5)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(harness.fake.query_count(), 1);
    assert_eq!(harness.guard.last_transaction(), 5);

    let body: Value = harness.get_snapshot().await.json().await.unwrap();
    assert_eq!(body["transactionSequenceNumber"], json!(5));

    assert_eq!(harness.post_event(capability_event(5)).await.status(), StatusCode::OK);
    assert_eq!(harness.post_event(capability_event(4)).await.status(), StatusCode::OK);
    assert_eq!(harness.fake.query_count(), 1);

    assert_eq!(harness.post_event(capability_event(6)).await.status(), StatusCode::OK);
    assert_eq!(harness.fake.query_count(), 2);
    assert_eq!(harness.guard.last_transaction(), 6);
}

#[tokio::test]
async fn test_wrong_credentials_are_forbidden() {
    let harness = Harness::with_credentials().await;

    let response = harness
        .http
        .post(format!("{}/", harness.base_url))
        .basic_auth(USERNAME, Some("guess"))
        .json(&capability_event(1))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(response.text().await.unwrap(), "invalid credentials");

    let response = harness
        .http
        .post(format!("{}/", harness.base_url))
        .json(&capability_event(1))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    assert_eq!(harness.fake.query_count(), 0);
    assert_eq!(harness.guard.last_transaction(), -1);
}

#[tokio::test]
async fn test_stale_event_with_wrong_credentials_is_ignored_silently() {
    let harness = Harness::with_credentials().await;
    assert_eq!(harness.post_event(capability_event(5)).await.status(), StatusCode::OK);

    for transaction in [5, 3] {
        let response = harness
            .http
            .post(format!("{}/", harness.base_url))
            .basic_auth(USERNAME, Some("guess"))
            .json(&capability_event(transaction))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.text().await.unwrap().is_empty());
    }

    let response = harness
        .http
        .post(format!("{}/", harness.base_url))
        .basic_auth(USERNAME, Some("guess"))
        .json(&capability_event(6))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    assert_eq!(harness.fake.query_count(), 1);
    assert_eq!(harness.guard.last_transaction(), 5);
}

#[tokio::test]
async fn test_events_accepted_without_configured_credentials() {
    let harness = Harness::start(AuthConfig::default()).await;

    let response = harness
        .http
        .post(format!("{}/", harness.base_url))
        .json(&capability_event(3))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(harness.guard.last_transaction(), 3);
}

#[tokio::test]
async fn test_irrelevant_and_unreadable_events_are_acknowledged() {
    let harness = Harness::with_credentials().await;

    let other = json!({
        "type": "FactSheetUpdatedEvent",
        "transactionSequenceNumber": 9,
        "factSheet": {"type": "Application"}
    });
    assert_eq!(harness.post_event(other).await.status(), StatusCode::OK);

    let response = harness
        .http
        .post(format!("{}/", harness.base_url))
        .basic_auth(USERNAME, Some(PASSWORD))
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(harness.fake.query_count(), 0);
    assert_eq!(harness.guard.last_transaction(), -1);
}

#[tokio::test]
async fn test_upstream_failure_is_generic_500_and_retryable() {
    let harness = Harness::with_credentials().await;
    *harness.fake.errors.lock() = Some(json!([{"message": "backend exploded"}]));

    let response = harness.post_event(capability_event(7)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], json!(500));
    assert_eq!(body["message"], json!(GENERIC_ERROR_MESSAGE));
    assert!(body["errorId"].as_str().is_some_and(|id| !id.is_empty()));
    assert!(body["timestamp"].as_str().is_some_and(|ts| ts.ends_with('Z')));
    assert!(!body.to_string().contains("backend exploded"));
    assert_eq!(harness.guard.last_transaction(), -1);

    *harness.fake.errors.lock() = None;
    assert_eq!(harness.post_event(capability_event(7)).await.status(), StatusCode::OK);
    assert_eq!(harness.guard.last_transaction(), 7);
}

#[tokio::test]
async fn test_concurrent_duplicate_deliveries_rebuild_once() {
    let harness = Harness::with_credentials().await;

    let deliveries = (0..6).map(|_| harness.post_event(capability_event(11)));
    let responses = futures::future::join_all(deliveries).await;

    assert!(responses.iter().all(|r| r.status() == StatusCode::OK));
    assert_eq!(harness.fake.query_count(), 1);
    assert_eq!(harness.guard.last_transaction(), 11);
}

#[tokio::test]
async fn test_health_endpoint() {
    let harness = Harness::with_credentials().await;
    let response = harness
        .http
        .get(format!("{}/health", harness.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
}
