//! Loom Graph Store
//!
//! The property-graph surface the versioning engine runs on.
//!
//! # Core Concepts
//!
//! - [`NodeLabel`] / [`EdgeKind`]: the closed vocabulary of the multiverse schema
//! - [`Node`] / [`Edge`]: typed records carrying JSON [`Props`]
//! - [`EdgePattern`]: pattern-matched edge reads
//! - [`GraphRead`] / [`GraphWrite`] / [`GraphStore`]: the adapter traits
//! - [`MemoryGraph`]: transactional in-memory implementation
//!
//! # Example
//!
//! ```rust,ignore
//! use loom_graph::{
//!     Edge, EdgeKind, EdgePattern, GraphRead, GraphStore, MemoryGraph, NodeKey, NodeLabel, Props,
//! };
//!
//! let graph = MemoryGraph::new();
//! graph.transaction(|tx| {
//!     tx.upsert_node(NodeLabel::Universe, "U1", Props::new())?;
//!     tx.upsert_node(NodeLabel::Story, "ST1", Props::new())?;
//!     tx.upsert_edge(Edge::new(
//!         NodeKey::new(NodeLabel::Universe, "U1"),
//!         EdgeKind::HasStory,
//!         NodeKey::new(NodeLabel::Story, "ST1"),
//!     ))
//! })?;
//!
//! let stories = graph.query(
//!     &EdgePattern::new(EdgeKind::HasStory).from_node(NodeLabel::Universe, "U1"),
//! )?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod error;
mod memory;
mod model;
mod pattern;
mod snapshot;
mod store;

pub use error::StoreError;
pub use memory::MemoryGraph;
pub use model::{Edge, EdgeKey, EdgeKind, Node, NodeKey, NodeLabel, Props};
pub use pattern::{EdgePattern, EndpointPattern};
pub use snapshot::GraphSnapshot;
pub use store::{GraphRead, GraphStats, GraphStore, GraphWrite, Upsert};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
