//! Capability Query
//!
//! The upstream GraphQL schema has no recursive selection, so the hierarchy is
//! fetched with a query unrolled to a fixed depth.

/// Fact sheet type of the capability hierarchy.
pub const CAPABILITY_TYPE: &str = "BusinessCapability";

/// Number of hierarchy levels fetched, top level included.
pub const MAX_HIERARCHY_LEVEL: usize = 4;

/// Child selection nesting `depth` more levels below a capability.
pub fn children_fragment(depth: usize) -> String {
    if depth == 0 {
        return String::new();
    }
    format!(
        "...on {} {{ children:relToChild {{ edges {{ node {{ id factSheet {{ id type name description level {} }} }} }} }} }}",
        CAPABILITY_TYPE,
        children_fragment(depth - 1)
    )
}

/// Query for all top-level capabilities with `levels` hierarchy levels.
pub fn build_query(levels: usize) -> String {
    let query = format!(
        r#"{{
          allFactSheets(
            filter: {{facetFilters: [{{facetKey: "FactSheetTypes", keys: ["{}"]}}, {{facetKey: "hierarchyLevel", keys: ["1"]}}]}},
            sort: [{{key: "level", order: desc}}]
          ) {{
            edges {{ node {{ id type name description level {} }} }}
          }}
        }}"#,
        CAPABILITY_TYPE,
        children_fragment(levels.saturating_sub(1))
    );
    query.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The capability hierarchy query at [`MAX_HIERARCHY_LEVEL`].
pub fn capability_query() -> String {
    build_query(MAX_HIERARCHY_LEVEL)
}
