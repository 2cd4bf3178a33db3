//! Integration tests for the file-host publisher

use super::test_utils::spawn_server;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use bcmaps_listener::error::{ApiError, PublishError};
use bcmaps_listener::publish::{HubSpotPublisher, PublishConfig, Publisher};
use bcmaps_listener::snapshot::Snapshot;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

const API_KEY: &str = "hs-integration";

#[derive(Default)]
struct Uploads {
    bodies: Mutex<Vec<String>>,
    content_types: Mutex<Vec<String>>,
}

async fn upload_handler(
    State(uploads): State<Arc<Uploads>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if params.get("hapikey").map(String::as_str) != Some(API_KEY) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"status": "error", "message": "The API key provided is invalid."})),
        )
            .into_response();
    }

    uploads.content_types.lock().push(
        headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string(),
    );
    uploads.bodies.lock().push(body);

    (
        StatusCode::CREATED,
        Json(json!({
            "id": "file-1",
            "name": "bcmaps",
            "url": "https://cdn.example.com/maps/bcmaps.json"
        })),
    )
        .into_response()
}

async fn spawn_file_host() -> (Arc<Uploads>, String) {
    let uploads = Arc::new(Uploads::default());
    let router = Router::new()
        .route("/files/v3/files", post(upload_handler))
        .with_state(uploads.clone());
    (uploads, spawn_server(router).await)
}

fn config(base_url: String, api_key: &str) -> PublishConfig {
    PublishConfig {
        api_key: Some(api_key.to_string()),
        folder: "maps".to_string(),
        base_url,
        ..PublishConfig::default()
    }
}

fn snapshot() -> Snapshot {
    Snapshot {
        workspace_id: "ws-1".to_string(),
        instance: "test.leanix.net".to_string(),
        timestamp: "2024-03-01T10:00:00.000Z".to_string(),
        bc_maps: vec![],
        transaction_sequence_number: Some(8),
    }
}

#[tokio::test]
async fn test_publish_uploads_multipart_file() {
    let (uploads, base_url) = spawn_file_host().await;
    let publisher = HubSpotPublisher::new(&config(base_url, API_KEY)).unwrap();

    let url = publisher.publish(&snapshot()).await.unwrap();
    assert_eq!(url, "https://cdn.example.com/maps/bcmaps.json");

    let content_types = uploads.content_types.lock();
    assert!(content_types[0].starts_with("multipart/form-data"));

    let bodies = uploads.bodies.lock();
    let body = &bodies[0];
    assert!(body.contains(r#"name="file"; filename="bcmaps.json""#));
    assert!(body.contains("application/json"));
    assert!(body.contains(r#""workspaceId":"ws-1""#));
    assert!(body.contains(r#""transactionSequenceNumber":8"#));
    assert!(body.contains(r#"name="folderPath""#));
    assert!(body.contains("maps"));
    assert!(body.contains(r#""access":"PUBLIC_INDEXABLE""#));
    assert!(body.contains(r#""overwrite":true"#));
}

#[tokio::test]
async fn test_rejected_upload_carries_status_and_body() {
    let (uploads, base_url) = spawn_file_host().await;
    let publisher = HubSpotPublisher::new(&config(base_url, "wrong-key")).unwrap();

    match publisher.publish(&snapshot()).await {
        Err(PublishError::Rejected { status, payload }) => {
            assert_eq!(status, 401);
            assert_eq!(payload["statusCode"], json!(401));
            assert_eq!(payload["message"], json!("The API key provided is invalid."));
        }
        other => panic!("expected rejection, got {:?}", other),
    }
    assert!(uploads.bodies.lock().is_empty());
}

#[test]
fn test_publisher_requires_api_key() {
    let result = HubSpotPublisher::new(&PublishConfig::default());
    assert!(matches!(
        result,
        Err(ApiError::Publish(PublishError::NotConfigured))
    ));
}
