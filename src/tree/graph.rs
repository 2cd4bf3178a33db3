//! Graph query result shapes
//!
//! A node in the recursive capability query is either the fact sheet itself
//! (top level) or a relation edge wrapping the fact sheet under `factSheet`.

use serde::Deserialize;

/// One vertex as returned by the capability query.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GraphNode {
    pub id: String,

    #[serde(rename = "type", default)]
    pub node_type: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub level: Option<i64>,

    /// Serialized JSON metadata; `null` and absent are equivalent.
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub children: Option<EdgeList>,

    /// Present when this node is a relation and the vertex sits one level deeper.
    #[serde(rename = "factSheet", default)]
    pub fact_sheet: Option<Box<GraphNode>>,
}

/// `{ edges: [...] }` wrapper used by the query's connection types.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EdgeList {
    #[serde(default)]
    pub edges: Option<Vec<Edge>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Edge {
    pub node: GraphNode,
}

/// Shape of a node, resolved once before unrolling.
#[derive(Debug, Clone, Copy)]
pub enum NodeShape<'a> {
    /// The node is the vertex.
    Direct(&'a GraphNode),
    /// The node is a relation; `rel_id` is the relation id.
    Relation {
        rel_id: &'a str,
        relation: &'a GraphNode,
        vertex: &'a GraphNode,
    },
}

impl<'a> NodeShape<'a> {
    pub fn of(node: &'a GraphNode) -> Self {
        match node.fact_sheet.as_deref() {
            Some(vertex) => NodeShape::Relation {
                rel_id: &node.id,
                relation: node,
                vertex,
            },
            None => NodeShape::Direct(node),
        }
    }

    /// The vertex whose fields end up on the unrolled node.
    pub fn vertex(&self) -> &'a GraphNode {
        match *self {
            NodeShape::Direct(node) => node,
            NodeShape::Relation { vertex, .. } => vertex,
        }
    }

    pub fn rel_to_parent_id(&self) -> Option<&'a str> {
        match *self {
            NodeShape::Direct(_) => None,
            NodeShape::Relation { rel_id, .. } => Some(rel_id),
        }
    }

    /// Node that carries the description and child edges.
    ///
    /// A relation only supplies them when it has its own child edge list;
    /// otherwise (no connection, or `edges: null`) both are read from the
    /// wrapped vertex.
    pub fn content(&self) -> &'a GraphNode {
        match *self {
            NodeShape::Direct(node) => node,
            NodeShape::Relation {
                relation, vertex, ..
            } => {
                if relation.has_edge_list() {
                    relation
                } else {
                    vertex
                }
            }
        }
    }
}

impl GraphNode {
    /// Child edges, empty when the connection is missing.
    pub fn edges(&self) -> &[Edge] {
        self.children
            .as_ref()
            .and_then(|list| list.edges.as_deref())
            .unwrap_or(&[])
    }

    /// Whether an edge list is present, even an empty one.
    pub fn has_edge_list(&self) -> bool {
        self.children
            .as_ref()
            .and_then(|list| list.edges.as_ref())
            .is_some()
    }

    /// Identifier used to rank this node among its siblings: the wrapped
    /// vertex id for relations, otherwise the node id.
    pub fn vertex_id(&self) -> &str {
        match self.fact_sheet.as_deref() {
            Some(vertex) => &vertex.id,
            None => &self.id,
        }
    }
}
