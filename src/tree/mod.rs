//! Capability Tree
//!
//! Query response shapes, the unrolled node model, and the unrolling algorithm
//! that turns one into the other.

pub mod graph;
pub mod node;
pub mod unroll;

pub use graph::{Edge, EdgeList, GraphNode, NodeShape};
pub use node::{CapabilityNode, DescriptionPayload};
pub use unroll::unroll;
