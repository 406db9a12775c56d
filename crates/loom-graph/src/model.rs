//! Node and edge records
//!
//! The schema is closed: every node carries one of the [`NodeLabel`]s and every
//! edge one of the [`EdgeKind`]s. Properties are free-form JSON values.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Property map attached to nodes and edges
pub type Props = BTreeMap<String, Value>;

/// Node label
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeLabel {
    /// Versioned container of narrative state
    Universe,
    /// Ordered grouping of stories
    Arc,
    /// Sequence of scenes
    Story,
    /// Unit of narrative time
    Scene,
    /// Character, place or object
    Entity,
    /// Rules-system sheet owned by an entity
    Sheet,
    /// Something that happened in a scene
    Fact,
    /// Relationship between two entities over time
    RelationState,
    /// Rule that applies to a universe
    Axiom,
    /// Entity template
    Archetype,
    /// Rules system
    System,
    /// Group of universes
    Multiverse,
    /// Group of multiverses
    Omniverse,
}

impl NodeLabel {
    /// All labels, in declaration order
    pub const ALL: [Self; 13] = [
        Self::Universe,
        Self::Arc,
        Self::Story,
        Self::Scene,
        Self::Entity,
        Self::Sheet,
        Self::Fact,
        Self::RelationState,
        Self::Axiom,
        Self::Archetype,
        Self::System,
        Self::Multiverse,
        Self::Omniverse,
    ];

    /// Label as written in the schema
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Universe => "Universe",
            Self::Arc => "Arc",
            Self::Story => "Story",
            Self::Scene => "Scene",
            Self::Entity => "Entity",
            Self::Sheet => "Sheet",
            Self::Fact => "Fact",
            Self::RelationState => "RelationState",
            Self::Axiom => "Axiom",
            Self::Archetype => "Archetype",
            Self::System => "System",
            Self::Multiverse => "Multiverse",
            Self::Omniverse => "Omniverse",
        }
    }
}

impl Display for NodeLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| format!("unknown node label: {s}"))
    }
}

/// Edge kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    /// Multiverse -> Universe
    HasUniverse,
    /// Universe -> Arc
    HasArc,
    /// Universe -> Story, or Arc -> Story (`sequence_index`)
    HasStory,
    /// Story -> Scene (`sequence_index`)
    HasScene,
    /// Entity -> Universe
    BelongsTo,
    /// Entity -> Scene
    AppearsIn,
    /// Fact -> Scene
    OccursIn,
    /// Entity -> Fact (`role`)
    ParticipatesAs,
    /// Entity -> Sheet (`story_id`, `system_id`)
    HasSheet,
    /// RelationState -> Entity (`endpoint`: A or B)
    RelStateFor,
    /// RelationState -> Scene where it started
    SetInScene,
    /// RelationState -> Scene where it changed
    ChangedInScene,
    /// RelationState -> Scene where it ended
    EndedInScene,
    /// Universe/Story/Entity/Sheet -> System
    UsesSystem,
    /// Axiom -> Universe
    AppliesTo,
    /// Clone -> original
    BranchedFrom,
}

impl EdgeKind {
    /// Kind as written in the schema
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HasUniverse => "HAS_UNIVERSE",
            Self::HasArc => "HAS_ARC",
            Self::HasStory => "HAS_STORY",
            Self::HasScene => "HAS_SCENE",
            Self::BelongsTo => "BELONGS_TO",
            Self::AppearsIn => "APPEARS_IN",
            Self::OccursIn => "OCCURS_IN",
            Self::ParticipatesAs => "PARTICIPATES_AS",
            Self::HasSheet => "HAS_SHEET",
            Self::RelStateFor => "REL_STATE_FOR",
            Self::SetInScene => "SET_IN_SCENE",
            Self::ChangedInScene => "CHANGED_IN_SCENE",
            Self::EndedInScene => "ENDED_IN_SCENE",
            Self::UsesSystem => "USES_SYSTEM",
            Self::AppliesTo => "APPLIES_TO",
            Self::BranchedFrom => "BRANCHED_FROM",
        }
    }

    /// Property that distinguishes parallel edges of this kind
    ///
    /// Two edges between the same endpoints are distinct only when this
    /// property differs; for every other kind `(from, kind, to)` is the identity.
    #[inline]
    #[must_use]
    pub const fn discriminator(self) -> Option<&'static str> {
        match self {
            Self::RelStateFor => Some("endpoint"),
            Self::ParticipatesAs => Some("role"),
            _ => None,
        }
    }
}

impl Display for EdgeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a node: `(label, id)`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeKey {
    /// Node label
    pub label: NodeLabel,
    /// Id, unique within the label
    pub id: String,
}

impl NodeKey {
    /// Create new key
    #[inline]
    #[must_use]
    pub fn new(label: NodeLabel, id: impl Into<String>) -> Self {
        Self {
            label,
            id: id.into(),
        }
    }
}

impl Display for NodeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.label, self.id)
    }
}

/// Node with its properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Identity
    #[serde(flatten)]
    pub key: NodeKey,
    /// Properties
    #[serde(default)]
    pub props: Props,
}

impl Node {
    /// Create node without properties
    #[inline]
    #[must_use]
    pub fn new(label: NodeLabel, id: impl Into<String>) -> Self {
        Self {
            key: NodeKey::new(label, id),
            props: Props::new(),
        }
    }

    /// Node id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.key.id
    }

    /// String property
    #[inline]
    #[must_use]
    pub fn prop_str(&self, name: &str) -> Option<&str> {
        self.props.get(name).and_then(Value::as_str)
    }

    /// Integer property
    #[inline]
    #[must_use]
    pub fn prop_i64(&self, name: &str) -> Option<i64> {
        self.props.get(name).and_then(Value::as_i64)
    }
}

/// Directed, typed edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Source endpoint
    pub from: NodeKey,
    /// Edge kind
    pub kind: EdgeKind,
    /// Target endpoint
    pub to: NodeKey,
    /// Properties
    #[serde(default)]
    pub props: Props,
}

impl Edge {
    /// Create edge without properties
    #[inline]
    #[must_use]
    pub fn new(from: NodeKey, kind: EdgeKind, to: NodeKey) -> Self {
        Self {
            from,
            kind,
            to,
            props: Props::new(),
        }
    }

    /// Add a property, returning the edge
    #[inline]
    #[must_use]
    pub fn with_prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    /// String property
    #[inline]
    #[must_use]
    pub fn prop_str(&self, name: &str) -> Option<&str> {
        self.props.get(name).and_then(Value::as_str)
    }

    /// Integer property
    #[inline]
    #[must_use]
    pub fn prop_i64(&self, name: &str) -> Option<i64> {
        self.props.get(name).and_then(Value::as_i64)
    }

    /// Identity used by upserts
    #[must_use]
    pub fn key(&self) -> EdgeKey {
        let discriminator = self
            .kind
            .discriminator()
            .and_then(|name| self.props.get(name))
            .map(|value| match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
        EdgeKey {
            from: self.from.clone(),
            kind: self.kind,
            to: self.to.clone(),
            discriminator,
        }
    }
}

/// Identity of an edge
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeKey {
    /// Source endpoint
    pub from: NodeKey,
    /// Edge kind
    pub kind: EdgeKind,
    /// Target endpoint
    pub to: NodeKey,
    /// Value of the kind's discriminator property, if any
    pub discriminator: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: &str) -> NodeKey {
        NodeKey::new(NodeLabel::Entity, id)
    }

    #[test]
    fn label_parse_matches_display() {
        for label in NodeLabel::ALL {
            assert_eq!(label.to_string().parse::<NodeLabel>().unwrap(), label);
        }
        assert!("Planet".parse::<NodeLabel>().is_err());
    }

    #[test]
    fn edge_kind_serializes_schema_name() {
        let json = serde_json::to_string(&EdgeKind::RelStateFor).unwrap();
        assert_eq!(json, "\"REL_STATE_FOR\"");
    }

    #[test]
    fn rel_state_endpoints_are_distinct_identities() {
        let rs = NodeKey::new(NodeLabel::RelationState, "RS1");
        let a = Edge::new(rs.clone(), EdgeKind::RelStateFor, entity("E1")).with_prop("endpoint", "A");
        let b = Edge::new(rs, EdgeKind::RelStateFor, entity("E1")).with_prop("endpoint", "B");
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn ordinary_edge_identity_ignores_props() {
        let story = NodeKey::new(NodeLabel::Story, "ST1");
        let scene = NodeKey::new(NodeLabel::Scene, "SC1");
        let first = Edge::new(story.clone(), EdgeKind::HasScene, scene.clone()).with_prop("sequence_index", 1);
        let second = Edge::new(story, EdgeKind::HasScene, scene).with_prop("sequence_index", 7);
        assert_eq!(first.key(), second.key());
    }

    #[test]
    fn node_roundtrips_flattened_key() {
        let mut node = Node::new(NodeLabel::Scene, "SC1");
        node.props.insert("sequence_index".into(), Value::from(3));
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["label"], "Scene");
        assert_eq!(json["id"], "SC1");
        let back: Node = serde_json::from_value(json).unwrap();
        assert_eq!(back.prop_i64("sequence_index"), Some(3));
    }
}
