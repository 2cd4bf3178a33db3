//! Publish Gateway
//!
//! Pushes a finished snapshot to the file host as `bcmaps.json`.

use crate::error::{ApiError, PublishError};
use crate::snapshot::Snapshot;
use crate::upstream::build_http_client;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::info;

/// File host settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// File host API key; publishing is disabled without it
    #[serde(default)]
    pub api_key: Option<String>,

    /// Destination folder path (root when empty)
    #[serde(default)]
    pub folder: String,

    #[serde(default = "default_publish_base_url")]
    pub base_url: String,

    #[serde(default = "default_file_name")]
    pub file_name: String,
}

fn default_publish_base_url() -> String {
    "https://api.hubapi.com".to_string()
}

fn default_file_name() -> String {
    "bcmaps.json".to_string()
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            folder: String::new(),
            base_url: default_publish_base_url(),
            file_name: default_file_name(),
        }
    }
}

impl PublishConfig {
    pub fn is_enabled(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|key| !key.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(format!("base_url must be an http(s) URL: {}", self.base_url));
        }
        if self.file_name.trim().is_empty() {
            return Err("file_name cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Publish collaborator
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Upload the snapshot, returning its public URL
    async fn publish(&self, snapshot: &Snapshot) -> Result<String, PublishError>;
}

/// Visibility and overwrite options sent with every upload.
pub fn upload_options() -> Value {
    json!({ "access": "PUBLIC_INDEXABLE", "overwrite": true })
}

/// Error payload for a rejected upload: the response body with `statusCode`
/// merged in.
pub fn rejection_payload(status: u16, body: &str) -> Value {
    let mut payload = Map::new();
    payload.insert("statusCode".to_string(), json!(status));
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(fields)) => payload.extend(fields),
        _ if body.is_empty() => {}
        _ => {
            payload.insert("body".to_string(), Value::String(body.to_string()));
        }
    }
    Value::Object(payload)
}

/// HubSpot file manager publisher
pub struct HubSpotPublisher {
    client: Client,
    api_key: String,
    folder: String,
    base_url: String,
    file_name: String,
}

impl HubSpotPublisher {
    pub fn new(config: &PublishConfig) -> Result<Self, ApiError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(PublishError::NotConfigured)?;
        config
            .validate()
            .map_err(|e| ApiError::ConfigError(format!("publish: {}", e)))?;

        Ok(Self {
            client: build_http_client()?,
            api_key,
            folder: config.folder.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            file_name: config.file_name.clone(),
        })
    }
}

#[async_trait]
impl Publisher for HubSpotPublisher {
    async fn publish(&self, snapshot: &Snapshot) -> Result<String, PublishError> {
        let body = serde_json::to_vec(snapshot)
            .map_err(|e| PublishError::Request(format!("Failed to serialize snapshot: {}", e)))?;
        let file = Part::bytes(body)
            .file_name(self.file_name.clone())
            .mime_str("application/json")
            .map_err(|e| PublishError::Request(format!("Invalid file part: {}", e)))?;
        let form = Form::new()
            .part("file", file)
            .text("folderPath", self.folder.clone())
            .text("options", upload_options().to_string());

        let url = format!("{}/files/v3/files", self.base_url);
        let response = self
            .client
            .post(&url)
            .query(&[("hapikey", self.api_key.as_str())])
            .multipart(form)
            .send()
            .await
            .map_err(|e| PublishError::Request(format!("HTTP error: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PublishError::InvalidResponse(format!("Unreadable body: {}", e)))?;

        if status != StatusCode::CREATED {
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                payload: rejection_payload(status.as_u16(), &text),
            });
        }

        let data: Value = serde_json::from_str(&text)
            .map_err(|e| PublishError::InvalidResponse(format!("Unparseable body: {}", e)))?;
        let file_url = data["url"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| PublishError::InvalidResponse("Response has no url".to_string()))?;

        info!(
            transaction = snapshot.transaction_sequence_number.unwrap_or(0),
            url = %file_url,
            "Published {}", self.file_name
        );
        Ok(file_url)
    }
}
