//! Graph store adapter traits
//!
//! [`GraphRead`] and [`GraphWrite`] are object safe so that transactional code
//! can work against `&mut dyn GraphWrite` regardless of backend. [`GraphStore`]
//! adds the transaction boundary and is used as a generic bound.

use crate::error::StoreError;
use crate::model::{Edge, Node, NodeKey, NodeLabel, Props};
use crate::pattern::EdgePattern;
use serde::Serialize;

/// Outcome of an upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// Record did not exist and was created
    Created,
    /// Record existed; properties were merged
    Merged,
}

impl Upsert {
    /// Check if the upsert created a record
    #[inline]
    #[must_use]
    pub fn created(self) -> bool {
        matches!(self, Self::Created)
    }
}

/// Total node and edge counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    /// Number of nodes
    pub nodes: usize,
    /// Number of edges
    pub edges: usize,
}

/// Read side of the store
pub trait GraphRead {
    /// Look up a node
    ///
    /// # Errors
    /// Backend failures only; absence is `Ok(None)`
    fn node(&self, key: &NodeKey) -> Result<Option<Node>, StoreError>;

    /// All nodes with a label, ordered by id
    ///
    /// # Errors
    /// Backend failures only
    fn nodes(&self, label: NodeLabel) -> Result<Vec<Node>, StoreError>;

    /// Edges matching a pattern, in a stable order
    ///
    /// # Errors
    /// Backend failures only
    fn query(&self, pattern: &EdgePattern) -> Result<Vec<Edge>, StoreError>;

    /// Node and edge totals
    ///
    /// # Errors
    /// Backend failures only
    fn stats(&self) -> Result<GraphStats, StoreError>;

    /// Check if `(label, id)` exists
    ///
    /// # Errors
    /// Backend failures only
    fn exists(&self, label: NodeLabel, id: &str) -> Result<bool, StoreError> {
        Ok(self.node(&NodeKey::new(label, id))?.is_some())
    }
}

/// Write side of the store
///
/// All writes are keyed by identity and safe to retry.
pub trait GraphWrite: GraphRead {
    /// View this writer as a reader
    fn as_read(&self) -> &dyn GraphRead;

    /// Create or merge a node (`MERGE` + `SET n += props`)
    ///
    /// # Errors
    /// Backend failures only
    fn upsert_node(&mut self, label: NodeLabel, id: &str, props: Props)
        -> Result<Upsert, StoreError>;

    /// Create a node that must not exist yet
    ///
    /// # Errors
    /// [`StoreError::AlreadyExists`] if the key is taken
    fn create_node(&mut self, label: NodeLabel, id: &str, props: Props) -> Result<(), StoreError>;

    /// Replace all properties of an existing node (`SET n = props`)
    ///
    /// # Errors
    /// [`StoreError::NodeNotFound`] if the node is absent
    fn replace_props(&mut self, key: &NodeKey, props: Props) -> Result<(), StoreError>;

    /// Create or merge an edge by [`Edge::key`]
    ///
    /// # Errors
    /// [`StoreError::MissingEndpoint`] if either endpoint is absent
    fn upsert_edge(&mut self, edge: Edge) -> Result<Upsert, StoreError>;
}

/// Store with an all-or-nothing transaction boundary
pub trait GraphStore: GraphRead + Send + Sync {
    /// Run `f` in a transaction
    ///
    /// Writes made by `f` become visible only if it returns `Ok`; on `Err` the
    /// store is left exactly as it was.
    ///
    /// # Errors
    /// Whatever `f` returns, or a backend failure converted into `E`
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn GraphWrite) -> Result<T, E>,
        E: From<StoreError>;
}
