//! Rebuild Pipeline
//!
//! Build a snapshot, then publish it when a publisher is configured. This is
//! the unit of work the transaction guard triggers.

use crate::error::ApiError;
use crate::publish::Publisher;
use crate::snapshot::{Snapshot, SnapshotBuilder};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// A rebuilt snapshot and, when it was published, its public URL.
///
/// Serializes as the snapshot itself with `publishedUrl` appended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Published {
    #[serde(flatten)]
    pub snapshot: Snapshot,

    #[serde(rename = "publishedUrl", skip_serializing_if = "Option::is_none")]
    pub published_url: Option<String>,
}

/// Something that can produce a fresh snapshot
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn rebuild(&self, transaction: Option<i64>) -> Result<Published, ApiError>;
}

/// Upstream build followed by an optional publish
pub struct RebuildPipeline {
    builder: SnapshotBuilder,
    publisher: Option<Arc<dyn Publisher>>,
}

impl RebuildPipeline {
    pub fn new(builder: SnapshotBuilder, publisher: Option<Arc<dyn Publisher>>) -> Self {
        Self { builder, publisher }
    }
}

#[async_trait]
impl SnapshotSource for RebuildPipeline {
    async fn rebuild(&self, transaction: Option<i64>) -> Result<Published, ApiError> {
        let snapshot = self.builder.build(transaction).await?;
        info!("#{} - updated bcMaps.json", transaction.unwrap_or(0));

        let published_url = match &self.publisher {
            Some(publisher) => Some(publisher.publish(&snapshot).await?),
            None => None,
        };

        Ok(Published {
            snapshot,
            published_url,
        })
    }
}
