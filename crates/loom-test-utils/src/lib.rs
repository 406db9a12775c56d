//! Testing utilities for the Loom workspace
//!
//! Graph fixtures and small lookups shared by integration tests.

#![allow(missing_docs)]

use loom_graph::{
    Edge, EdgeKind, EdgePattern, GraphRead, GraphSnapshot, MemoryGraph, Node, NodeKey, NodeLabel,
    Props,
};
use serde_json::Value;
use std::collections::BTreeMap;

fn key(label: NodeLabel, id: &str) -> NodeKey {
    NodeKey::new(label, id)
}

/// Declarative graph builder; nodes are created on first mention
#[derive(Debug, Clone, Default)]
pub struct FixtureBuilder {
    nodes: BTreeMap<NodeKey, Props>,
    edges: Vec<Edge>,
}

impl FixtureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, label: NodeLabel, id: &str) -> Self {
        self.nodes.entry(key(label, id)).or_default();
        self
    }

    pub fn prop(mut self, label: NodeLabel, id: &str, name: &str, value: impl Into<Value>) -> Self {
        self.nodes
            .entry(key(label, id))
            .or_default()
            .insert(name.to_string(), value.into());
        self
    }

    pub fn edge(mut self, edge: Edge) -> Self {
        self.nodes.entry(edge.from.clone()).or_default();
        self.nodes.entry(edge.to.clone()).or_default();
        self.edges.push(edge);
        self
    }

    fn link(self, from: (NodeLabel, &str), kind: EdgeKind, to: (NodeLabel, &str)) -> Self {
        self.edge(Edge::new(key(from.0, from.1), kind, key(to.0, to.1)))
    }

    pub fn universe(self, id: &str, name: &str) -> Self {
        self.prop(NodeLabel::Universe, id, "name", name)
            .prop(NodeLabel::Universe, id, "description", format!("{name} timeline"))
    }

    pub fn story(self, universe: &str, story: &str) -> Self {
        self.prop(NodeLabel::Story, story, "title", format!("Story {story}"))
            .link((NodeLabel::Universe, universe), EdgeKind::HasStory, (NodeLabel::Story, story))
    }

    /// Scene ordered by its `HAS_SCENE` edge
    pub fn scene(self, story: &str, scene: &str, sequence_index: i64) -> Self {
        self.prop(NodeLabel::Scene, scene, "title", format!("Scene {scene}"))
            .edge(
                Edge::new(key(NodeLabel::Story, story), EdgeKind::HasScene, key(NodeLabel::Scene, scene))
                    .with_prop("sequence_index", sequence_index),
            )
    }

    /// Scene with no order anywhere
    pub fn unordered_scene(self, story: &str, scene: &str) -> Self {
        self.link((NodeLabel::Story, story), EdgeKind::HasScene, (NodeLabel::Scene, scene))
    }

    pub fn entity(self, universe: &str, entity: &str) -> Self {
        self.prop(NodeLabel::Entity, entity, "name", format!("Entity {entity}"))
            .link((NodeLabel::Entity, entity), EdgeKind::BelongsTo, (NodeLabel::Universe, universe))
    }

    pub fn appears_in(self, entity: &str, scene: &str) -> Self {
        self.link((NodeLabel::Entity, entity), EdgeKind::AppearsIn, (NodeLabel::Scene, scene))
    }

    pub fn fact(self, scene: &str, fact: &str) -> Self {
        self.prop(NodeLabel::Fact, fact, "text", format!("Fact {fact}"))
            .link((NodeLabel::Fact, fact), EdgeKind::OccursIn, (NodeLabel::Scene, scene))
    }

    pub fn participates(self, entity: &str, fact: &str, role: &str) -> Self {
        self.edge(
            Edge::new(key(NodeLabel::Entity, entity), EdgeKind::ParticipatesAs, key(NodeLabel::Fact, fact))
                .with_prop("role", role),
        )
    }

    pub fn sheet(self, entity: &str, sheet: &str, story_id: &str, system_id: &str) -> Self {
        self.prop(NodeLabel::Sheet, sheet, "hp", 10)
            .edge(
                Edge::new(key(NodeLabel::Entity, entity), EdgeKind::HasSheet, key(NodeLabel::Sheet, sheet))
                    .with_prop("story_id", story_id)
                    .with_prop("system_id", system_id),
            )
    }

    pub fn relation_state(self, rs: &str, a: &str, b: &str) -> Self {
        let from = key(NodeLabel::RelationState, rs);
        self.prop(NodeLabel::RelationState, rs, "kind", "ally")
            .edge(
                Edge::new(from.clone(), EdgeKind::RelStateFor, key(NodeLabel::Entity, a))
                    .with_prop("endpoint", "A"),
            )
            .edge(
                Edge::new(from, EdgeKind::RelStateFor, key(NodeLabel::Entity, b))
                    .with_prop("endpoint", "B"),
            )
    }

    pub fn set_in_scene(self, rs: &str, scene: &str) -> Self {
        self.link((NodeLabel::RelationState, rs), EdgeKind::SetInScene, (NodeLabel::Scene, scene))
    }

    pub fn changed_in_scene(self, rs: &str, scene: &str) -> Self {
        self.link((NodeLabel::RelationState, rs), EdgeKind::ChangedInScene, (NodeLabel::Scene, scene))
    }

    pub fn ended_in_scene(self, rs: &str, scene: &str) -> Self {
        self.link((NodeLabel::RelationState, rs), EdgeKind::EndedInScene, (NodeLabel::Scene, scene))
    }

    /// Arc owning `stories` in order
    pub fn arc(mut self, universe: &str, arc: &str, stories: &[&str]) -> Self {
        self = self.link((NodeLabel::Universe, universe), EdgeKind::HasArc, (NodeLabel::Arc, arc));
        for (index, story) in stories.iter().enumerate() {
            self = self.edge(
                Edge::new(key(NodeLabel::Arc, arc), EdgeKind::HasStory, key(NodeLabel::Story, story))
                    .with_prop("sequence_index", index as i64 + 1),
            );
        }
        self
    }

    pub fn multiverse(self, multiverse: &str, universe: &str) -> Self {
        self.link((NodeLabel::Multiverse, multiverse), EdgeKind::HasUniverse, (NodeLabel::Universe, universe))
    }

    pub fn uses_system(self, label: NodeLabel, id: &str, system: &str) -> Self {
        self.link((label, id), EdgeKind::UsesSystem, (NodeLabel::System, system))
    }

    pub fn axiom(self, axiom: &str, universe: &str) -> Self {
        self.link((NodeLabel::Axiom, axiom), EdgeKind::AppliesTo, (NodeLabel::Universe, universe))
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self
                .nodes
                .iter()
                .map(|(key, props)| Node {
                    key: key.clone(),
                    props: props.clone(),
                })
                .collect(),
            edges: self.edges.clone(),
        }
    }

    pub fn build(&self) -> MemoryGraph {
        MemoryGraph::from_snapshot(self.snapshot()).expect("fixture graph is valid")
    }
}

/// `U1` with story `ST1`, scenes `SC1..SC3` ordered 1..3, entity `E1` in all
/// three and fact `F1` in `SC2`
pub fn scenario_a() -> FixtureBuilder {
    FixtureBuilder::new()
        .universe("U1", "Prime")
        .story("U1", "ST1")
        .scene("ST1", "SC1", 1)
        .scene("ST1", "SC2", 2)
        .scene("ST1", "SC3", 3)
        .entity("U1", "E1")
        .appears_in("E1", "SC1")
        .appears_in("E1", "SC2")
        .appears_in("E1", "SC3")
        .fact("SC2", "F1")
}

/// Scenario A plus a second story, a late-only entity, sheets, relation
/// states, an arc and the universe's surroundings
pub fn rich_universe() -> FixtureBuilder {
    scenario_a()
        .multiverse("MV1", "U1")
        .axiom("AX1", "U1")
        .uses_system(NodeLabel::Universe, "U1", "SYS1")
        .uses_system(NodeLabel::Story, "ST1", "SYS1")
        .uses_system(NodeLabel::Entity, "E1", "SYS1")
        .story("U1", "ST2")
        .scene("ST2", "SC4", 1)
        .entity("U1", "E2")
        .appears_in("E2", "SC3")
        .appears_in("E2", "SC4")
        .entity("U1", "E3")
        .appears_in("E3", "SC1")
        .entity("U1", "E4")
        .participates("E1", "F1", "witness")
        .participates("E3", "F1", "culprit")
        .fact("SC3", "F2")
        .fact("SC4", "F3")
        .sheet("E1", "SH1", "ST1", "SYS1")
        .sheet("E1", "SH2", "ST2", "SYS1")
        .uses_system(NodeLabel::Sheet, "SH1", "SYS1")
        .relation_state("RS1", "E1", "E3")
        .set_in_scene("RS1", "SC1")
        .changed_in_scene("RS1", "SC3")
        .relation_state("RS2", "E1", "E2")
        .set_in_scene("RS2", "SC3")
        .relation_state("RS3", "E1", "E3")
        .set_in_scene("RS3", "SC3")
        .arc("U1", "A1", &["ST1", "ST2"])
        .arc("U1", "A2", &["ST2"])
}

/// Ids of every node with `label`
pub fn ids(graph: &MemoryGraph, label: NodeLabel) -> Vec<String> {
    graph
        .nodes(label)
        .expect("nodes readable")
        .into_iter()
        .map(|n| n.key.id)
        .collect()
}

/// Targets of a node's outgoing `kind` edges
pub fn targets(graph: &MemoryGraph, from: &NodeKey, kind: EdgeKind) -> Vec<NodeKey> {
    graph
        .query(&EdgePattern::new(kind).from_node(from.label, from.id.clone()))
        .expect("edges readable")
        .into_iter()
        .map(|e| e.to)
        .collect()
}

/// Edges of one kind, anywhere
pub fn edges_of(graph: &MemoryGraph, kind: EdgeKind) -> Vec<Edge> {
    graph.query(&EdgePattern::new(kind)).expect("edges readable")
}
