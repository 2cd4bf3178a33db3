//! Configuration System
//!
//! Layered configuration for the listener: built-in defaults, a global file, a
//! local `config/` directory, then environment variables. The legacy deployment
//! variables (`LEANIX_*`, `HUBSPOT_*`) sit on top so existing deployments keep
//! working unchanged.

use serde::{Deserialize, Serialize};

pub use crate::logging::LoggingConfig;
pub use crate::publish::PublishConfig;
pub use crate::server::{AuthConfig, ServerConfig};
pub use crate::upstream::UpstreamConfig;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// Fact sheet API connection
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// File host the snapshot is published to
    #[serde(default)]
    pub publish: PublishConfig,

    /// Credentials expected on change events
    #[serde(default)]
    pub auth: AuthConfig,

    /// Listen address
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Upstream(String),
    Publish(String),
    Server(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Upstream(msg) => write!(f, "Upstream: {}", msg),
            ValidationError::Publish(msg) => write!(f, "Publish: {}", msg),
            ValidationError::Server(msg) => write!(f, "Server: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl ListenerConfig {
    /// Validate the entire configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.upstream.validate() {
            errors.push(ValidationError::Upstream(e));
        }
        if let Err(e) = self.publish.validate() {
            errors.push(ValidationError::Publish(e));
        }
        if let Err(e) = self.server.validate() {
            errors.push(ValidationError::Server(e));
        }
        if let Err(e) = crate::logging::validate(&self.logging) {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Serializes tests that touch process-wide environment variables.
#[cfg(test)]
pub(crate) static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
