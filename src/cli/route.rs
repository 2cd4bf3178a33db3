//! CLI route: run context and the single route table.

use crate::cli::parse::Commands;
use crate::config::{ConfigLoader, ListenerConfig};
use crate::error::{ApiError, PublishError};
use crate::guard::TransactionGuard;
use crate::pipeline::{RebuildPipeline, SnapshotSource};
use crate::publish::{HubSpotPublisher, Publisher};
use crate::server::{self, AppState};
use crate::snapshot::SnapshotBuilder;
use crate::upstream::LeanixClient;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Runtime context for CLI execution: the loaded and validated configuration.
pub struct RunContext {
    config: ListenerConfig,
}

impl RunContext {
    /// Load config from an explicit file, or from the layered sources under `root`.
    pub fn new(root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&root)?
        };
        Self::from_config(config)
    }

    /// Wrap an already loaded config after validating it.
    pub fn from_config(config: ListenerConfig) -> Result<Self, ApiError> {
        config.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    /// Upstream build plus the publisher, when `publish` is set.
    fn pipeline(&self, publish: bool) -> Result<RebuildPipeline, ApiError> {
        let client = Arc::new(LeanixClient::new(&self.config.upstream)?);
        let publisher: Option<Arc<dyn Publisher>> = if publish {
            Some(Arc::new(HubSpotPublisher::new(&self.config.publish)?))
        } else {
            None
        };
        Ok(RebuildPipeline::new(SnapshotBuilder::new(client), publisher))
    }

    /// Execute a command; returns text to print, if any.
    pub async fn execute(&self, command: &Commands) -> Result<Option<String>, ApiError> {
        match command {
            Commands::Serve { host, port } => {
                self.handle_serve(host.clone(), *port).await?;
                Ok(None)
            }
            Commands::Snapshot { publish, compact } => {
                self.handle_snapshot(*publish, *compact).await.map(Some)
            }
        }
    }

    async fn handle_serve(&self, host: Option<String>, port: Option<u16>) -> Result<(), ApiError> {
        let mut server_config = self.config.server.clone();
        if let Some(host) = host {
            server_config.host = host;
        }
        if let Some(port) = port {
            server_config.port = port;
        }

        let publish = self.config.publish.is_enabled();
        if !publish {
            warn!("publish.api_key (HUBSPOT_API_KEY) is not set; snapshots will only be served");
        }

        let source: Arc<dyn SnapshotSource> = Arc::new(self.pipeline(publish)?);
        let guard = Arc::new(TransactionGuard::new(source));
        let state = Arc::new(AppState::new(guard, &self.config.auth));

        info!(
            instance = %self.config.upstream.instance,
            publish,
            "Starting webhook listener"
        );
        server::serve(&server_config, state).await
    }

    async fn handle_snapshot(&self, publish: bool, compact: bool) -> Result<String, ApiError> {
        if publish && !self.config.publish.is_enabled() {
            return Err(PublishError::NotConfigured.into());
        }

        let published = self.pipeline(publish)?.rebuild(None).await?;
        if let Some(url) = &published.published_url {
            info!(url = %url, "Snapshot published");
        }

        let output = if compact {
            serde_json::to_string(&published)?
        } else {
            serde_json::to_string_pretty(&published)?
        };
        Ok(output)
    }
}
