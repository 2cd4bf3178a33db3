//! Error types for the capability map listener.

use serde_json::Value;
use thiserror::Error;

/// Upstream (graph query service) errors
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Upstream request failed: {0}")]
    Request(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),
}

/// Publish (file host) errors
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Publishing is not configured (missing publish.api_key)")]
    NotConfigured,

    #[error("Publish request failed: {0}")]
    Request(String),

    /// The file host answered with anything other than 201. `payload` is the
    /// response body with `statusCode` merged in.
    #[error("Publish rejected with status {status}: {payload}")]
    Rejected { status: u16, payload: Value },

    #[error("Invalid publish response: {0}")]
    InvalidResponse(String),
}

/// Top-level error for rebuilds, configuration and serving
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Server error: {0}")]
    Server(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Serialization(err.to_string())
    }
}
