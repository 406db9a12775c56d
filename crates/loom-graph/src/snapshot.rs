//! Serializable graph snapshot

use crate::model::{Edge, Node};
use serde::{Deserialize, Serialize};

/// Whole-graph export: every node, then every edge
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Nodes with properties
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Edges with properties
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl GraphSnapshot {
    /// Check if the snapshot holds nothing
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}
