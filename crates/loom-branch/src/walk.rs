//! Shared graph walks over a universe's ownership edges

use crate::selection::SceneRef;
use loom_graph::{Edge, EdgeKind, EdgePattern, GraphRead, NodeKey, NodeLabel, StoreError};
use std::collections::BTreeSet;

/// Kinds linking a `RelationState` to the scenes that shaped it
pub(crate) const PROVENANCE_KINDS: [EdgeKind; 3] = [
    EdgeKind::SetInScene,
    EdgeKind::ChangedInScene,
    EdgeKind::EndedInScene,
];

/// Outgoing edges of `kind` from one node
pub(crate) fn outgoing(
    reader: &dyn GraphRead,
    from: &NodeKey,
    kind: EdgeKind,
) -> Result<Vec<Edge>, StoreError> {
    reader.query(&EdgePattern::new(kind).from_node(from.label, from.id.clone()))
}

/// Incoming edges of `kind` into one node, from nodes with `from_label`
pub(crate) fn incoming(
    reader: &dyn GraphRead,
    to: &NodeKey,
    kind: EdgeKind,
    from_label: NodeLabel,
) -> Result<Vec<Edge>, StoreError> {
    reader.query(
        &EdgePattern::new(kind)
            .from_label(from_label)
            .to_node(to.label, to.id.clone()),
    )
}

fn universe(id: &str) -> NodeKey {
    NodeKey::new(NodeLabel::Universe, id)
}

/// Story ids owned by a universe
pub(crate) fn universe_stories(
    reader: &dyn GraphRead,
    universe_id: &str,
) -> Result<BTreeSet<String>, StoreError> {
    Ok(outgoing(reader, &universe(universe_id), EdgeKind::HasStory)?
        .into_iter()
        .filter(|e| e.to.label == NodeLabel::Story)
        .map(|e| e.to.id)
        .collect())
}

/// Arc ids owned by a universe
pub(crate) fn universe_arcs(
    reader: &dyn GraphRead,
    universe_id: &str,
) -> Result<BTreeSet<String>, StoreError> {
    Ok(outgoing(reader, &universe(universe_id), EdgeKind::HasArc)?
        .into_iter()
        .map(|e| e.to.id)
        .collect())
}

/// Entity ids that belong to a universe
pub(crate) fn universe_entities(
    reader: &dyn GraphRead,
    universe_id: &str,
) -> Result<BTreeSet<String>, StoreError> {
    Ok(
        incoming(reader, &universe(universe_id), EdgeKind::BelongsTo, NodeLabel::Entity)?
            .into_iter()
            .map(|e| e.from.id)
            .collect(),
    )
}

/// Scene order: the scene's own property, else the `HAS_SCENE` edge's
pub(crate) fn sequence_index(
    reader: &dyn GraphRead,
    has_scene: &Edge,
) -> Result<Option<i64>, StoreError> {
    let own = reader
        .node(&has_scene.to)?
        .and_then(|scene| scene.prop_i64("sequence_index"));
    Ok(own.or_else(|| has_scene.prop_i64("sequence_index")))
}

/// Scenes of one story with their resolved order
pub(crate) fn story_scenes(
    reader: &dyn GraphRead,
    story_id: &str,
) -> Result<Vec<SceneRef>, StoreError> {
    let story = NodeKey::new(NodeLabel::Story, story_id);
    let mut scenes = Vec::new();
    for edge in outgoing(reader, &story, EdgeKind::HasScene)? {
        scenes.push(SceneRef {
            story_id: story_id.to_string(),
            sequence_index: sequence_index(reader, &edge)?,
            scene_id: edge.to.id,
        });
    }
    Ok(scenes)
}

/// Every `(story, scene)` pair reachable from a universe
pub(crate) fn universe_scenes(
    reader: &dyn GraphRead,
    universe_id: &str,
) -> Result<BTreeSet<SceneRef>, StoreError> {
    let mut scenes = BTreeSet::new();
    for story in universe_stories(reader, universe_id)? {
        scenes.extend(story_scenes(reader, &story)?);
    }
    Ok(scenes)
}

/// Fact ids occurring in a scene
pub(crate) fn scene_facts(
    reader: &dyn GraphRead,
    scene_id: &str,
) -> Result<BTreeSet<String>, StoreError> {
    let scene = NodeKey::new(NodeLabel::Scene, scene_id);
    Ok(incoming(reader, &scene, EdgeKind::OccursIn, NodeLabel::Fact)?
        .into_iter()
        .map(|e| e.from.id)
        .collect())
}

/// Entity ids appearing in a scene
pub(crate) fn scene_entities(
    reader: &dyn GraphRead,
    scene_id: &str,
) -> Result<BTreeSet<String>, StoreError> {
    let scene = NodeKey::new(NodeLabel::Scene, scene_id);
    Ok(incoming(reader, &scene, EdgeKind::AppearsIn, NodeLabel::Entity)?
        .into_iter()
        .map(|e| e.from.id)
        .collect())
}

/// Fact ids occurring in any scene of a universe
pub(crate) fn universe_facts(
    reader: &dyn GraphRead,
    universe_id: &str,
) -> Result<BTreeSet<String>, StoreError> {
    let mut facts = BTreeSet::new();
    let scene_ids: BTreeSet<String> = universe_scenes(reader, universe_id)?
        .into_iter()
        .map(|s| s.scene_id)
        .collect();
    for scene in &scene_ids {
        facts.extend(scene_facts(reader, scene)?);
    }
    Ok(facts)
}

/// Scene-provenance edges of one relation state
pub(crate) fn provenance(
    reader: &dyn GraphRead,
    relation_state_id: &str,
) -> Result<Vec<Edge>, StoreError> {
    let rs = NodeKey::new(NodeLabel::RelationState, relation_state_id);
    let mut edges = Vec::new();
    for kind in PROVENANCE_KINDS {
        edges.extend(outgoing(reader, &rs, kind)?);
    }
    Ok(edges)
}
