//! Tree unrolling
//!
//! Turns the nested query response into an ordered tree of [`CapabilityNode`]s.
//! Per-node metadata lives in the fact sheet `description` as serialized JSON;
//! it is parsed, used for explicit sibling ordering (`childrenOrder`), and
//! merged onto the resulting node.

use crate::tree::graph::{Edge, GraphNode, NodeShape};
use crate::tree::node::{CapabilityNode, DescriptionPayload, DESCRIPTION_KEY};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Unroll one query node (and its subtree) into a [`CapabilityNode`].
pub fn unroll(node: &GraphNode) -> CapabilityNode {
    let shape = NodeShape::of(node);
    let vertex = shape.vertex();
    let content = shape.content();

    let payload = parse_description(&vertex.id, content.description.as_deref());
    let children = order_edges(content.edges(), &payload.children_order())
        .into_iter()
        .map(|edge| unroll(&edge.node))
        .collect();

    CapabilityNode {
        id: vertex.id.clone(),
        node_type: vertex.node_type.clone(),
        name: vertex.name.clone(),
        level: vertex.level,
        rel_to_parent_id: shape.rel_to_parent_id().map(str::to_string),
        children,
        extra: merge_extra(&vertex.id, payload),
    }
}

/// Parse a fact sheet description into its metadata payload.
///
/// Missing, `null` or malformed descriptions yield an empty payload; malformed
/// ones are logged and otherwise ignored.
pub fn parse_description(node_id: &str, raw: Option<&str>) -> DescriptionPayload {
    let Some(raw) = raw else {
        return DescriptionPayload::default();
    };

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => DescriptionPayload(map),
        Ok(Value::Null) => DescriptionPayload::default(),
        Ok(other) => {
            warn!(
                node_id,
                kind = json_kind(&other),
                "Fact sheet description is not a JSON object, using empty metadata"
            );
            DescriptionPayload::default()
        }
        Err(e) => {
            warn!(
                node_id,
                error = %e,
                "Malformed fact sheet description, using empty metadata"
            );
            DescriptionPayload::default()
        }
    }
}

/// Order child edges by their position in `children_order`.
///
/// An empty order keeps the query order. Ranks compare numerically; an id
/// missing from the order ties with every other id, so unranked children hold
/// their place and ranked ones never move past them. Later duplicates in
/// `children_order` win.
pub fn order_edges<'a>(edges: &'a [Edge], children_order: &[&str]) -> Vec<&'a Edge> {
    if children_order.is_empty() {
        return edges.iter().collect();
    }

    let rank: HashMap<&str, usize> = children_order
        .iter()
        .enumerate()
        .map(|(position, id)| (*id, position))
        .collect();

    let mut ranked: Vec<(Option<usize>, &Edge)> = edges
        .iter()
        .map(|edge| (rank.get(edge.node.vertex_id()).copied(), edge))
        .collect();

    // compare_ranks is not a total order; a stable insertion sort keeps the
    // outcome deterministic where std's sorts would not.
    for i in 1..ranked.len() {
        let mut j = i;
        while j > 0 && compare_ranks(ranked[j].0, ranked[j - 1].0) == Ordering::Less {
            ranked.swap(j, j - 1);
            j -= 1;
        }
    }

    ranked.into_iter().map(|(_, edge)| edge).collect()
}

fn compare_ranks(a: Option<usize>, b: Option<usize>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => Ordering::Equal,
    }
}

fn merge_extra(node_id: &str, payload: DescriptionPayload) -> Map<String, Value> {
    let mut extra = Map::new();
    for (key, value) in payload.into_map() {
        if key == DESCRIPTION_KEY {
            debug!(node_id, "Dropping nested description key from metadata");
            continue;
        }
        extra.insert(key, value);
    }
    extra
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
