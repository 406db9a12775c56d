//! In-memory graph store
//!
//! State lives in persistent maps, so a transaction starts from an O(1) copy of
//! the committed graph and publishes it with a single swap. Writers are
//! serialized; readers only take the state lock for the duration of one read
//! and never wait for an open transaction.

use crate::error::StoreError;
use crate::model::{Edge, EdgeKey, Node, NodeKey, NodeLabel, Props};
use crate::pattern::EdgePattern;
use crate::snapshot::GraphSnapshot;
use crate::store::{GraphRead, GraphStats, GraphStore, GraphWrite, Upsert};
use im::{OrdMap, OrdSet};
use parking_lot::{Mutex, RwLock};

#[derive(Debug, Clone, Default)]
struct GraphState {
    nodes: OrdMap<NodeKey, Props>,
    edges: OrdMap<EdgeKey, Props>,
    outgoing: OrdMap<NodeKey, OrdSet<EdgeKey>>,
    incoming: OrdMap<NodeKey, OrdSet<EdgeKey>>,
}

impl GraphState {
    fn node(&self, key: &NodeKey) -> Option<Node> {
        self.nodes.get(key).map(|props| Node {
            key: key.clone(),
            props: props.clone(),
        })
    }

    fn nodes(&self, label: NodeLabel) -> Vec<Node> {
        self.nodes
            .iter()
            .filter(|(key, _)| key.label == label)
            .map(|(key, props)| Node {
                key: NodeKey::clone(key),
                props: Props::clone(props),
            })
            .collect()
    }

    fn edge(&self, key: &EdgeKey) -> Option<Edge> {
        self.edges.get(key).map(|props| Edge {
            from: key.from.clone(),
            kind: key.kind,
            to: key.to.clone(),
            props: props.clone(),
        })
    }

    fn query(&self, pattern: &EdgePattern) -> Vec<Edge> {
        let indexed = pattern
            .from
            .exact_key()
            .map(|key| self.outgoing.get(&key))
            .or_else(|| pattern.to.exact_key().map(|key| self.incoming.get(&key)));

        match indexed {
            Some(Some(keys)) => keys
                .iter()
                .filter(|key| key.kind == pattern.kind)
                .filter_map(|key| self.edge(key))
                .filter(|edge| pattern.matches(edge))
                .collect(),
            Some(None) => Vec::new(),
            None => self
                .edges
                .keys()
                .filter(|key| key.kind == pattern.kind)
                .filter_map(|key| self.edge(key))
                .filter(|edge| pattern.matches(edge))
                .collect(),
        }
    }

    fn stats(&self) -> GraphStats {
        GraphStats {
            nodes: self.nodes.len(),
            edges: self.edges.len(),
        }
    }

    fn upsert_node(&mut self, key: NodeKey, props: Props) -> Upsert {
        match self.nodes.get(&key) {
            Some(existing) => {
                let mut merged = existing.clone();
                merged.extend(props);
                self.nodes.insert(key, merged);
                Upsert::Merged
            }
            None => {
                self.nodes.insert(key, props);
                Upsert::Created
            }
        }
    }

    fn upsert_edge(&mut self, edge: Edge) -> Result<Upsert, StoreError> {
        for endpoint in [&edge.from, &edge.to] {
            if !self.nodes.contains_key(endpoint) {
                return Err(StoreError::MissingEndpoint {
                    kind: edge.kind,
                    missing: endpoint.clone(),
                });
            }
        }

        let key = edge.key();
        if let Some(existing) = self.edges.get(&key) {
            let mut merged = existing.clone();
            merged.extend(edge.props);
            self.edges.insert(key, merged);
            return Ok(Upsert::Merged);
        }

        let mut out = self.outgoing.get(&key.from).cloned().unwrap_or_default();
        out.insert(key.clone());
        self.outgoing.insert(key.from.clone(), out);

        let mut inc = self.incoming.get(&key.to).cloned().unwrap_or_default();
        inc.insert(key.clone());
        self.incoming.insert(key.to.clone(), inc);

        self.edges.insert(key, edge.props);
        Ok(Upsert::Created)
    }
}

/// Transactional in-memory graph
#[derive(Debug, Default)]
pub struct MemoryGraph {
    state: RwLock<GraphState>,
    writer: Mutex<()>,
}

impl MemoryGraph {
    /// Create empty graph
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a snapshot
    ///
    /// # Errors
    /// [`StoreError::InvalidSnapshot`] on duplicate nodes or dangling edges
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Result<Self, StoreError> {
        let mut state = GraphState::default();
        for node in snapshot.nodes {
            if state.upsert_node(node.key.clone(), node.props) == Upsert::Merged {
                return Err(StoreError::InvalidSnapshot(format!(
                    "duplicate node {}",
                    node.key
                )));
            }
        }
        for edge in snapshot.edges {
            state
                .upsert_edge(edge)
                .map_err(|e| StoreError::InvalidSnapshot(e.to_string()))?;
        }
        tracing::debug!(
            nodes = state.nodes.len(),
            edges = state.edges.len(),
            "graph loaded from snapshot"
        );
        Ok(Self {
            state: RwLock::new(state),
            writer: Mutex::new(()),
        })
    }

    /// Export committed state
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        let state = self.state.read().clone();
        GraphSnapshot {
            nodes: state
                .nodes
                .iter()
                .map(|(key, props)| Node {
                    key: NodeKey::clone(key),
                    props: Props::clone(props),
                })
                .collect(),
            edges: state.edges.keys().filter_map(|key| state.edge(key)).collect(),
        }
    }
}

impl GraphRead for MemoryGraph {
    fn node(&self, key: &NodeKey) -> Result<Option<Node>, StoreError> {
        Ok(self.state.read().node(key))
    }

    fn nodes(&self, label: NodeLabel) -> Result<Vec<Node>, StoreError> {
        Ok(self.state.read().nodes(label))
    }

    fn query(&self, pattern: &EdgePattern) -> Result<Vec<Edge>, StoreError> {
        Ok(self.state.read().query(pattern))
    }

    fn stats(&self) -> Result<GraphStats, StoreError> {
        Ok(self.state.read().stats())
    }
}

impl GraphStore for MemoryGraph {
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn GraphWrite) -> Result<T, E>,
        E: From<StoreError>,
    {
        let _writer = self.writer.lock();
        let mut tx = MemoryTxn {
            state: self.state.read().clone(),
        };
        let out = f(&mut tx)?;
        let stats = tx.state.stats();
        *self.state.write() = tx.state;
        tracing::trace!(nodes = stats.nodes, edges = stats.edges, "transaction committed");
        Ok(out)
    }
}

/// Private working copy handed to a transaction body
struct MemoryTxn {
    state: GraphState,
}

impl GraphRead for MemoryTxn {
    fn node(&self, key: &NodeKey) -> Result<Option<Node>, StoreError> {
        Ok(self.state.node(key))
    }

    fn nodes(&self, label: NodeLabel) -> Result<Vec<Node>, StoreError> {
        Ok(self.state.nodes(label))
    }

    fn query(&self, pattern: &EdgePattern) -> Result<Vec<Edge>, StoreError> {
        Ok(self.state.query(pattern))
    }

    fn stats(&self) -> Result<GraphStats, StoreError> {
        Ok(self.state.stats())
    }
}

impl GraphWrite for MemoryTxn {
    fn as_read(&self) -> &dyn GraphRead {
        self
    }

    fn upsert_node(
        &mut self,
        label: NodeLabel,
        id: &str,
        props: Props,
    ) -> Result<Upsert, StoreError> {
        Ok(self.state.upsert_node(NodeKey::new(label, id), props))
    }

    fn create_node(&mut self, label: NodeLabel, id: &str, props: Props) -> Result<(), StoreError> {
        let key = NodeKey::new(label, id);
        if self.state.nodes.contains_key(&key) {
            return Err(StoreError::AlreadyExists { key });
        }
        self.state.nodes.insert(key, props);
        Ok(())
    }

    fn replace_props(&mut self, key: &NodeKey, props: Props) -> Result<(), StoreError> {
        if !self.state.nodes.contains_key(key) {
            return Err(StoreError::NodeNotFound(key.clone()));
        }
        self.state.nodes.insert(key.clone(), props);
        Ok(())
    }

    fn upsert_edge(&mut self, edge: Edge) -> Result<Upsert, StoreError> {
        self.state.upsert_edge(edge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EdgeKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn key(label: NodeLabel, id: &str) -> NodeKey {
        NodeKey::new(label, id)
    }

    fn props(value: serde_json::Value) -> Props {
        serde_json::from_value(value).unwrap()
    }

    fn seeded() -> MemoryGraph {
        let graph = MemoryGraph::new();
        graph
            .transaction(|tx| {
                tx.upsert_node(NodeLabel::Story, "ST1", props(json!({"title": "Dawn"})))?;
                tx.upsert_node(NodeLabel::Scene, "SC1", Props::new())?;
                tx.upsert_node(NodeLabel::Scene, "SC2", Props::new())?;
                tx.upsert_edge(
                    Edge::new(key(NodeLabel::Story, "ST1"), EdgeKind::HasScene, key(NodeLabel::Scene, "SC1"))
                        .with_prop("sequence_index", 1),
                )?;
                tx.upsert_edge(
                    Edge::new(key(NodeLabel::Story, "ST1"), EdgeKind::HasScene, key(NodeLabel::Scene, "SC2"))
                        .with_prop("sequence_index", 2),
                )?;
                Ok::<_, StoreError>(())
            })
            .unwrap();
        graph
    }

    #[test]
    fn upsert_node_merges_props() {
        let graph = seeded();
        let outcome = graph
            .transaction(|tx| tx.upsert_node(NodeLabel::Story, "ST1", props(json!({"mood": "grim"}))))
            .unwrap();
        assert_eq!(outcome, Upsert::Merged);

        let story = graph.node(&key(NodeLabel::Story, "ST1")).unwrap().unwrap();
        assert_eq!(story.prop_str("title"), Some("Dawn"));
        assert_eq!(story.prop_str("mood"), Some("grim"));
    }

    #[test]
    fn create_node_is_unique() {
        let graph = seeded();
        let result = graph.transaction(|tx| tx.create_node(NodeLabel::Story, "ST1", Props::new()));
        assert!(matches!(result, Err(StoreError::AlreadyExists { .. })));
    }

    #[test]
    fn edge_to_missing_node_is_rejected() {
        let graph = seeded();
        let result = graph.transaction(|tx| {
            tx.upsert_edge(Edge::new(
                key(NodeLabel::Entity, "E1"),
                EdgeKind::AppearsIn,
                key(NodeLabel::Scene, "SC1"),
            ))
        });
        assert!(matches!(result, Err(StoreError::MissingEndpoint { .. })));
    }

    #[test]
    fn failed_transaction_rolls_back() {
        let graph = seeded();
        let before = graph.stats().unwrap();

        let result: Result<(), StoreError> = graph.transaction(|tx| {
            tx.upsert_node(NodeLabel::Scene, "SC3", Props::new())?;
            tx.upsert_edge(Edge::new(
                key(NodeLabel::Story, "ST1"),
                EdgeKind::HasScene,
                key(NodeLabel::Scene, "SC3"),
            ))?;
            Err(StoreError::Backend("boom".into()))
        });

        assert!(result.is_err());
        assert_eq!(graph.stats().unwrap(), before);
        assert!(!graph.exists(NodeLabel::Scene, "SC3").unwrap());
    }

    #[test]
    fn query_uses_both_indexes() {
        let graph = seeded();
        let from_story = graph
            .query(&EdgePattern::new(EdgeKind::HasScene).from_node(NodeLabel::Story, "ST1"))
            .unwrap();
        assert_eq!(from_story.len(), 2);

        let into_scene = graph
            .query(&EdgePattern::new(EdgeKind::HasScene).to_node(NodeLabel::Scene, "SC2"))
            .unwrap();
        assert_eq!(into_scene.len(), 1);
        assert_eq!(into_scene[0].prop_i64("sequence_index"), Some(2));

        let unindexed = graph
            .query(&EdgePattern::new(EdgeKind::HasScene).where_prop("sequence_index", 1))
            .unwrap();
        assert_eq!(unindexed.len(), 1);
        assert_eq!(unindexed[0].to.id, "SC1");
    }

    #[test]
    fn edge_upsert_is_idempotent() {
        let graph = seeded();
        let before = graph.stats().unwrap();
        let outcome = graph
            .transaction(|tx| {
                tx.upsert_edge(
                    Edge::new(key(NodeLabel::Story, "ST1"), EdgeKind::HasScene, key(NodeLabel::Scene, "SC1"))
                        .with_prop("sequence_index", 1),
                )
            })
            .unwrap();
        assert_eq!(outcome, Upsert::Merged);
        assert_eq!(graph.stats().unwrap(), before);
    }

    #[test]
    fn snapshot_rebuilds_same_graph() {
        let graph = seeded();
        let rebuilt = MemoryGraph::from_snapshot(graph.snapshot()).unwrap();
        assert_eq!(rebuilt.stats().unwrap(), graph.stats().unwrap());
        assert_eq!(rebuilt.nodes(NodeLabel::Scene).unwrap().len(), 2);
    }

    #[test]
    fn snapshot_with_dangling_edge_is_invalid() {
        let snapshot = GraphSnapshot {
            nodes: vec![Node::new(NodeLabel::Story, "ST1")],
            edges: vec![Edge::new(
                key(NodeLabel::Story, "ST1"),
                EdgeKind::HasScene,
                key(NodeLabel::Scene, "SC1"),
            )],
        };
        assert!(matches!(
            MemoryGraph::from_snapshot(snapshot),
            Err(StoreError::InvalidSnapshot(_))
        ));
    }
}
