//! Edge patterns for pattern-matched reads
//!
//! An [`EdgePattern`] is the typed equivalent of
//! `MATCH (a:Label {id})-[:KIND {props}]->(b:Label {id})`.

use crate::model::{Edge, EdgeKind, NodeKey, NodeLabel, Props};
use serde_json::Value;

/// Constraint on one end of an edge
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndpointPattern {
    /// Required label
    pub label: Option<NodeLabel>,
    /// Required id
    pub id: Option<String>,
}

impl EndpointPattern {
    /// Match anything
    #[inline]
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Exact node key, if both label and id are fixed
    #[inline]
    #[must_use]
    pub fn exact_key(&self) -> Option<NodeKey> {
        match (self.label, &self.id) {
            (Some(label), Some(id)) => Some(NodeKey::new(label, id.clone())),
            _ => None,
        }
    }

    /// Check a node key against this constraint
    #[inline]
    #[must_use]
    pub fn matches(&self, key: &NodeKey) -> bool {
        self.label.map_or(true, |l| l == key.label)
            && self.id.as_deref().map_or(true, |id| id == key.id)
    }
}

/// Pattern over edges of one kind
#[derive(Debug, Clone, PartialEq)]
pub struct EdgePattern {
    /// Required kind
    pub kind: EdgeKind,
    /// Constraint on the source endpoint
    pub from: EndpointPattern,
    /// Constraint on the target endpoint
    pub to: EndpointPattern,
    /// Required property values (equality)
    pub props: Props,
}

impl EdgePattern {
    /// Match every edge of `kind`
    #[inline]
    #[must_use]
    pub fn new(kind: EdgeKind) -> Self {
        Self {
            kind,
            from: EndpointPattern::any(),
            to: EndpointPattern::any(),
            props: Props::new(),
        }
    }

    /// Constrain the source label
    #[inline]
    #[must_use]
    pub fn from_label(mut self, label: NodeLabel) -> Self {
        self.from.label = Some(label);
        self
    }

    /// Constrain the source to one node
    #[inline]
    #[must_use]
    pub fn from_node(mut self, label: NodeLabel, id: impl Into<String>) -> Self {
        self.from.label = Some(label);
        self.from.id = Some(id.into());
        self
    }

    /// Constrain the target label
    #[inline]
    #[must_use]
    pub fn to_label(mut self, label: NodeLabel) -> Self {
        self.to.label = Some(label);
        self
    }

    /// Constrain the target to one node
    #[inline]
    #[must_use]
    pub fn to_node(mut self, label: NodeLabel, id: impl Into<String>) -> Self {
        self.to.label = Some(label);
        self.to.id = Some(id.into());
        self
    }

    /// Require a property value
    #[inline]
    #[must_use]
    pub fn where_prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    /// Check an edge against this pattern
    #[must_use]
    pub fn matches(&self, edge: &Edge) -> bool {
        edge.kind == self.kind
            && self.from.matches(&edge.from)
            && self.to.matches(&edge.to)
            && self
                .props
                .iter()
                .all(|(name, value)| edge.props.get(name) == Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel_edge(endpoint: &str) -> Edge {
        Edge::new(
            NodeKey::new(NodeLabel::RelationState, "RS1"),
            EdgeKind::RelStateFor,
            NodeKey::new(NodeLabel::Entity, "E1"),
        )
        .with_prop("endpoint", endpoint)
    }

    #[test]
    fn pattern_filters_on_props() {
        let pattern = EdgePattern::new(EdgeKind::RelStateFor)
            .from_node(NodeLabel::RelationState, "RS1")
            .where_prop("endpoint", "A");
        assert!(pattern.matches(&rel_edge("A")));
        assert!(!pattern.matches(&rel_edge("B")));
    }

    #[test]
    fn pattern_checks_kind_and_labels() {
        let pattern = EdgePattern::new(EdgeKind::RelStateFor).to_label(NodeLabel::Scene);
        assert!(!pattern.matches(&rel_edge("A")));
        assert!(!EdgePattern::new(EdgeKind::AppearsIn).matches(&rel_edge("A")));
    }

    #[test]
    fn exact_key_requires_label_and_id() {
        let pattern = EdgePattern::new(EdgeKind::HasStory).from_node(NodeLabel::Universe, "U1");
        assert_eq!(
            pattern.from.exact_key(),
            Some(NodeKey::new(NodeLabel::Universe, "U1"))
        );
        assert_eq!(pattern.to.exact_key(), None);
    }
}
