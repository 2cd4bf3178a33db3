//! Upstream Graph Client
//!
//! Session-scoped access to the fact sheet GraphQL API. A session is an access
//! token obtained from the API token exchange; it lives for exactly one rebuild.

use crate::error::{ApiError, UpstreamError};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Upstream connection settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Instance host, e.g. `eu.leanix.net`
    #[serde(default)]
    pub instance: String,

    /// API token exchanged for an access token on every session start
    #[serde(default)]
    pub api_token: String,

    /// Override for the API base URL (default: `https://{instance}`)
    #[serde(default)]
    pub base_url: Option<String>,
}

impl UpstreamConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.instance.trim().is_empty() {
            return Err("instance is required (LEANIX_INSTANCE)".to_string());
        }
        if self.api_token.trim().is_empty() {
            return Err("api_token is required (LEANIX_APITOKEN)".to_string());
        }
        if let Some(base_url) = &self.base_url {
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err(format!("base_url must be an http(s) URL: {}", base_url));
            }
        }
        Ok(())
    }

    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}", self.instance))
            .trim_end_matches('/')
            .to_string()
    }
}

/// An authenticated upstream session
#[derive(Debug, Clone)]
pub struct UpstreamSession {
    pub access_token: String,
    pub workspace_id: String,
    pub instance: String,
}

/// Graph query collaborator
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Authenticate and open a session
    async fn start_session(&self) -> Result<UpstreamSession, UpstreamError>;

    /// Execute a query, returning its `data` object
    async fn execute(&self, session: &UpstreamSession, query: &str)
        -> Result<Value, UpstreamError>;

    /// Release a session. Never fails; problems are logged.
    async fn stop_session(&self, session: UpstreamSession);
}

/// Run `f` inside a session. The session is stopped after `f` finishes,
/// whether it succeeded or not.
pub async fn with_session<T, F, Fut>(client: &dyn UpstreamClient, f: F) -> Result<T, UpstreamError>
where
    F: FnOnce(UpstreamSession) -> Fut + Send,
    Fut: Future<Output = Result<T, UpstreamError>> + Send,
{
    let session = client.start_session().await?;
    debug!(workspace_id = %session.workspace_id, "Upstream session started");
    let result = f(session.clone()).await;
    client.stop_session(session).await;
    result
}

const UPSTREAM_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const UPSTREAM_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const TOKEN_PATH: &str = "/services/mtm/v1/oauth2/token";
const GRAPHQL_PATH: &str = "/services/pathfinder/v1/graphql";

pub(crate) fn build_http_client() -> Result<Client, ApiError> {
    Client::builder()
        .connect_timeout(UPSTREAM_HTTP_CONNECT_TIMEOUT)
        .timeout(UPSTREAM_HTTP_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ApiError::ConfigError(format!("Failed to create HTTP client: {}", e)))
}

fn map_http_error(error: reqwest::Error) -> UpstreamError {
    if error.is_timeout() {
        UpstreamError::Request(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        UpstreamError::Request(format!("Connection error: {}", error))
    } else {
        UpstreamError::Request(format!("HTTP error: {}", error))
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphQlErrorEntry>>,
}

#[derive(Deserialize)]
struct GraphQlErrorEntry {
    message: String,
}

/// Extract the workspace id from an access token's claims.
pub fn workspace_id_from_token(access_token: &str) -> Result<String, UpstreamError> {
    let payload = access_token.split('.').nth(1).ok_or_else(|| {
        UpstreamError::InvalidResponse("Access token is not a JWT".to_string())
    })?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| UpstreamError::InvalidResponse(format!("Undecodable token claims: {}", e)))?;
    let claims: Value = serde_json::from_slice(&bytes)
        .map_err(|e| UpstreamError::InvalidResponse(format!("Unparseable token claims: {}", e)))?;

    claims["principal"]["permission"]["workspaceId"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| {
            UpstreamError::InvalidResponse("Token claims carry no workspace id".to_string())
        })
}

/// LeanIX-style upstream client (token exchange + pathfinder GraphQL)
pub struct LeanixClient {
    client: Client,
    instance: String,
    api_token: String,
    base_url: String,
}

impl LeanixClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, ApiError> {
        config
            .validate()
            .map_err(|e| ApiError::ConfigError(format!("upstream: {}", e)))?;
        Ok(Self {
            client: build_http_client()?,
            instance: config.instance.clone(),
            api_token: config.api_token.clone(),
            base_url: config.resolved_base_url(),
        })
    }
}

#[async_trait]
impl UpstreamClient for LeanixClient {
    async fn start_session(&self) -> Result<UpstreamSession, UpstreamError> {
        let url = format!("{}{}", self.base_url, TOKEN_PATH);
        let response = self
            .client
            .post(&url)
            .basic_auth("apitoken", Some(&self.api_token))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(map_http_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(UpstreamError::Authentication(format!(
                "Token exchange failed with status {}: {}",
                status, error_text
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            UpstreamError::Authentication(format!("Failed to parse token response: {}", e))
        })?;
        let workspace_id = workspace_id_from_token(&token.access_token)?;

        Ok(UpstreamSession {
            access_token: token.access_token,
            workspace_id,
            instance: self.instance.clone(),
        })
    }

    async fn execute(
        &self,
        session: &UpstreamSession,
        query: &str,
    ) -> Result<Value, UpstreamError> {
        let url = format!("{}{}", self.base_url, GRAPHQL_PATH);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&session.access_token)
            .json(&json!({ "query": query }))
            .send()
            .await
            .map_err(map_http_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(UpstreamError::Query(format!(
                "Request failed with status {}: {}",
                status, error_text
            )));
        }

        let body: GraphQlResponse = response.json().await.map_err(|e| {
            UpstreamError::InvalidResponse(format!("Failed to parse query response: {}", e))
        })?;

        if let Some(errors) = body.errors.filter(|errors| !errors.is_empty()) {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(UpstreamError::Query(messages.join("; ")));
        }

        body.data
            .ok_or_else(|| UpstreamError::InvalidResponse("Query response has no data".to_string()))
    }

    async fn stop_session(&self, session: UpstreamSession) {
        // Access tokens are short-lived and not revocable; dropping ours ends the session.
        if session.access_token.is_empty() {
            warn!("Stopping upstream session without an access token");
        }
        info!(workspace_id = %session.workspace_id, "Upstream session stopped");
    }
}
