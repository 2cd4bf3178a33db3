//! Webhook Server
//!
//! HTTP entry point: `GET /` answers with the current snapshot, `POST /`
//! receives change events. Failures reach the caller as a generic message with
//! a correlation id; details only go to the log.

use crate::error::ApiError;
use crate::event::ChangeEvent;
use crate::guard::{EventOutcome, TransactionGuard};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Message returned for every internal failure.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong... Please contact customer support.";

/// Listen address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    7071
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("host cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Basic auth credentials expected on change events
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl Credentials {
    /// Credentials to enforce, or `None` when either value is unset.
    pub fn from_config(config: &AuthConfig) -> Option<Self> {
        match (&config.username, &config.password) {
            (Some(username), Some(password)) => Some(Self {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }

    /// Decode an `Authorization: Basic ...` header value.
    pub fn from_basic_header(value: &str) -> Option<Self> {
        let (scheme, encoded) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        Some(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

/// State shared by every request
pub struct AppState {
    pub guard: Arc<TransactionGuard>,
    pub credentials: Option<Credentials>,
}

impl AppState {
    pub fn new(guard: Arc<TransactionGuard>, auth: &AuthConfig) -> Self {
        let credentials = Credentials::from_config(auth);
        if credentials.is_none() {
            warn!(
                "auth.username and auth.password (LEANIX_USERNAME / LEANIX_PASSWORD) should be set \
                 for basic auth of change events; accepting all events without credentials"
            );
        }
        Self { guard, credentials }
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = &self.credentials else {
            return true;
        };
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(Credentials::from_basic_header)
            .map(|provided| &provided == expected)
            .unwrap_or(false)
    }
}

/// Errors surfaced by the request handlers
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("invalid credentials")]
    Forbidden,

    #[error("internal error: {0}")]
    Internal(#[from] ApiError),
}

impl HandlerError {
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            Self::Forbidden => (status, "invalid credentials").into_response(),
            Self::Internal(e) => {
                let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
                let error_id = Uuid::new_v4().to_string();
                error!(error_id = %error_id, timestamp = %timestamp, error = %e, "Request failed");

                let body = json!({
                    "status": status.as_u16(),
                    "timestamp": timestamp,
                    "errorId": error_id,
                    "message": GENERIC_ERROR_MESSAGE,
                });
                let body = serde_json::to_string_pretty(&body).unwrap_or_default();
                (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
            }
        }
    }
}

/// Build the router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(query_handler).post(event_handler))
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
}

async fn query_handler(State(state): State<Arc<AppState>>) -> Result<Response, HandlerError> {
    let published = state.guard.current().await?;
    let body = serde_json::to_string_pretty(published.as_ref()).map_err(ApiError::from)?;

    Ok((
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::CONTENT_TYPE, "application/json"),
        ],
        body,
    )
        .into_response())
}

async fn event_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, HandlerError> {
    let event: ChangeEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            debug!(error = %e, "Ignoring request with unreadable event body");
            return Ok(StatusCode::OK);
        }
    };

    let authorized = state.authorized(&headers);
    match state.guard.apply_authorized(&event, authorized).await? {
        EventOutcome::Unauthorized { transaction } => {
            let forwarded_for = headers
                .get("x-forwarded-for")
                .and_then(|value| value.to_str().ok())
                .unwrap_or("-");
            error!(transaction, forwarded_for, "403 Forbidden");
            return Err(HandlerError::Forbidden);
        }
        EventOutcome::Applied {
            transaction,
            previous,
        } => info!(
            transaction,
            previous,
            event_type = event.event_type.as_deref().unwrap_or("-"),
            "Applied change event"
        ),
        outcome => debug!(?outcome, "Change event not applied"),
    }
    Ok(StatusCode::OK)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: &ServerConfig, state: Arc<AppState>) -> Result<(), ApiError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ApiError::Server(format!("Failed to bind {}: {}", addr, e)))?;

    info!(addr = %addr, "Webhook listener ready");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Server(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "Cannot listen for Ctrl-C, running until killed");
            std::future::pending::<()>().await;
        }
    }
}
