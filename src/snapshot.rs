//! Snapshot Builder
//!
//! Runs the capability query inside one upstream session, unrolls the result,
//! keeps the published top-level maps and stamps them with provenance.

use crate::error::UpstreamError;
use crate::query;
use crate::tree::{unroll, CapabilityNode, GraphNode};
use crate::upstream::{with_session, UpstreamClient};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// One materialization of the capability hierarchy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    #[serde(rename = "workspaceId")]
    pub workspace_id: String,

    pub instance: String,

    /// ISO-8601 UTC time the build completed
    pub timestamp: String,

    #[serde(rename = "bcMaps")]
    pub bc_maps: Vec<CapabilityNode>,

    #[serde(
        rename = "transactionSequenceNumber",
        skip_serializing_if = "Option::is_none"
    )]
    pub transaction_sequence_number: Option<i64>,
}

#[derive(Deserialize)]
struct AllFactSheets {
    #[serde(rename = "allFactSheets")]
    all_fact_sheets: Connection,
}

#[derive(Deserialize)]
struct Connection {
    #[serde(default)]
    edges: Vec<TopLevelEdge>,
}

#[derive(Deserialize)]
struct TopLevelEdge {
    node: GraphNode,
}

/// Unroll the `data` object of a capability query into published maps.
pub fn published_maps(data: Value) -> Result<Vec<CapabilityNode>, UpstreamError> {
    let response: AllFactSheets = serde_json::from_value(data).map_err(|e| {
        UpstreamError::InvalidResponse(format!("Unexpected query response shape: {}", e))
    })?;

    let total = response.all_fact_sheets.edges.len();
    let maps: Vec<CapabilityNode> = response
        .all_fact_sheets
        .edges
        .iter()
        .map(|edge| unroll(&edge.node))
        .filter(CapabilityNode::is_published)
        .collect();

    debug!(total, published = maps.len(), "Unrolled capability maps");
    Ok(maps)
}

/// Builds snapshots from the upstream system
#[derive(Clone)]
pub struct SnapshotBuilder {
    client: Arc<dyn UpstreamClient>,
}

impl SnapshotBuilder {
    pub fn new(client: Arc<dyn UpstreamClient>) -> Self {
        Self { client }
    }

    /// Build a fresh snapshot. `transaction` is attached when given.
    #[instrument(skip(self))]
    pub async fn build(&self, transaction: Option<i64>) -> Result<Snapshot, UpstreamError> {
        let start = Instant::now();
        let query = query::capability_query();

        let mut snapshot = with_session(self.client.as_ref(), |session| async move {
            let data = self.client.execute(&session, &query).await?;
            let bc_maps = published_maps(data)?;
            Ok(Snapshot {
                workspace_id: session.workspace_id,
                instance: session.instance,
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                bc_maps,
                transaction_sequence_number: None,
            })
        })
        .await?;

        snapshot.transaction_sequence_number = transaction;

        info!(
            transaction = transaction.unwrap_or(0),
            maps = snapshot.bc_maps.len(),
            duration_ms = start.elapsed().as_millis(),
            "Snapshot built"
        );
        Ok(snapshot)
    }
}
