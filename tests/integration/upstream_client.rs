//! Integration tests for the upstream client and snapshot builder over HTTP

use super::test_utils::{capability_data, spawn_upstream, FakeUpstream, WORKSPACE_ID};
use bcmaps_listener::error::UpstreamError;
use bcmaps_listener::snapshot::SnapshotBuilder;
use bcmaps_listener::upstream::{with_session, LeanixClient, UpstreamClient};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[tokio::test]
async fn test_session_exchanges_token_and_reads_workspace() {
    let fake = FakeUpstream::new(capability_data());
    let config = spawn_upstream(fake.clone()).await;
    let client = LeanixClient::new(&config).unwrap();

    let session = client.start_session().await.unwrap();
    assert_eq!(session.workspace_id, WORKSPACE_ID);
    assert_eq!(session.instance, "test.leanix.net");
    assert_eq!(fake.token_requests.load(Ordering::SeqCst), 1);

    let data = client.execute(&session, "{ allFactSheets { edges { node { id } } } }").await;
    assert_eq!(data.unwrap(), capability_data());
    client.stop_session(session).await;
}

#[tokio::test]
async fn test_wrong_api_token_is_authentication_error() {
    let fake = FakeUpstream::new(capability_data());
    let mut config = spawn_upstream(fake).await;
    config.api_token = "wrong".to_string();
    let client = LeanixClient::new(&config).unwrap();

    let result = client.start_session().await;
    assert!(matches!(result, Err(UpstreamError::Authentication(_))));
}

#[tokio::test]
async fn test_graphql_errors_fail_the_query() {
    let fake = FakeUpstream::new(capability_data());
    *fake.errors.lock() = Some(json!([{"message": "field 'bogus' unknown"}]));
    let config = spawn_upstream(fake).await;
    let client = LeanixClient::new(&config).unwrap();

    let result = with_session(&client, |session| {
        let client = &client;
        async move { client.execute(&session, "{ bogus }").await }
    })
    .await;

    match result {
        Err(UpstreamError::Query(message)) => assert!(message.contains("bogus")),
        other => panic!("expected query error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_snapshot_over_http() {
    let fake = FakeUpstream::new(capability_data());
    let config = spawn_upstream(fake.clone()).await;
    let builder = SnapshotBuilder::new(Arc::new(LeanixClient::new(&config).unwrap()));

    let snapshot = builder.build(Some(12)).await.unwrap();
    assert_eq!(snapshot.workspace_id, WORKSPACE_ID);
    assert_eq!(snapshot.transaction_sequence_number, Some(12));
    assert_eq!(snapshot.bc_maps.len(), 1);

    let map = serde_json::to_value(&snapshot.bc_maps[0]).unwrap();
    assert_eq!(map["id"], json!("root"));
    assert_eq!(map["owner"], json!("sales"));
    assert_eq!(map["children"][0]["id"], json!("b"));
    assert_eq!(map["children"][0]["relToParentId"], json!("rel-b"));
    assert_eq!(map["children"][0]["tier"], json!(1));
    assert_eq!(map["children"][1]["id"], json!("a"));
    assert!(map.get("description").is_none());

    let queries = fake.queries.lock();
    assert_eq!(queries.len(), 1);
    assert!(queries[0].contains("BusinessCapability"));
}

#[tokio::test]
async fn test_unreachable_upstream_is_request_error() {
    let mut config = spawn_upstream(FakeUpstream::new(capability_data())).await;
    config.base_url = Some("http://127.0.0.1:1".to_string());
    let client = LeanixClient::new(&config).unwrap();

    assert!(matches!(
        client.start_session().await,
        Err(UpstreamError::Request(_))
    ));
}
