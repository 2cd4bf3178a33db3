//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::{ApiError, PublishError};

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::Publish(PublishError::NotConfigured) => format!(
            "{}\nSet publish.api_key (or HUBSPOT_API_KEY) to enable publishing.",
            e
        ),
        ApiError::ConfigError(_) => format!(
            "{}\nSee config/config.toml or the BCMAPS__* / LEANIX_* environment variables.",
            e
        ),
        _ => e.to_string(),
    }
}
