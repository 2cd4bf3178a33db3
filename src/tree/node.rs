//! Unrolled capability nodes and their free-form metadata

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Key in the description payload carrying explicit sibling order.
pub const CHILDREN_ORDER_KEY: &str = "childrenOrder";

/// Raw metadata field; consumed by unrolling and never part of a node.
pub const DESCRIPTION_KEY: &str = "description";

/// Keys of [`CapabilityNode`]'s structural fields, in output order. A payload
/// entry with one of these names replaces the field's value on output.
pub const STRUCTURAL_KEYS: [&str; 6] = ["id", "type", "name", "level", "relToParentId", "children"];

/// Parsed `description` field of a fact sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescriptionPayload(pub Map<String, Value>);

impl DescriptionPayload {
    /// Explicit child order, empty when missing or not a list of strings.
    pub fn children_order(&self) -> Vec<&str> {
        match self.0.get(CHILDREN_ORDER_KEY) {
            Some(Value::Array(ids)) => ids.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

/// One node of the published capability tree.
///
/// The structural fields hold what the graph query returned. Everything from
/// the description payload (including `childrenOrder`) is kept in `extra` and
/// serialized flat on top of them: a payload key named like a structural field
/// (a hand-edited `name`, say) replaces that field's value in the output. This
/// is the shape existing consumers of `bcmaps.json` read.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityNode {
    pub id: String,
    pub node_type: Option<String>,
    pub name: Option<String>,
    pub level: Option<i64>,
    pub rel_to_parent_id: Option<String>,
    pub children: Vec<CapabilityNode>,
    pub extra: Map<String, Value>,
}

impl Serialize for CapabilityNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        self.structural_entry(&mut map, "id", &self.id)?;
        self.structural_entry(&mut map, "type", &self.node_type)?;
        self.structural_entry(&mut map, "name", &self.name)?;
        self.structural_entry(&mut map, "level", &self.level)?;
        self.structural_entry(&mut map, "relToParentId", &self.rel_to_parent_id)?;
        self.structural_entry(&mut map, "children", &self.children)?;
        for (key, value) in &self.extra {
            if !STRUCTURAL_KEYS.contains(&key.as_str()) {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}

impl CapabilityNode {
    /// Whether the node is flagged `published` in its metadata.
    ///
    /// Absent means not published; any other value is read with loose truthiness
    /// since the flag is hand-edited upstream.
    pub fn is_published(&self) -> bool {
        self.extra.get("published").map(is_truthy).unwrap_or(false)
    }

    fn structural_entry<M, T>(&self, map: &mut M, key: &str, own: &T) -> Result<(), M::Error>
    where
        M: SerializeMap,
        T: Serialize + ?Sized,
    {
        match self.extra.get(key) {
            Some(overlay) => map.serialize_entry(key, overlay),
            None => map.serialize_entry(key, own),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
