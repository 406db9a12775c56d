//! Graph cloner: writes a [`Selection`] under a new universe
//!
//! Every copied node lands at a namespaced id (see [`crate::remap`]) and gets
//! exactly one `BRANCHED_FROM` edge back to its original. All writes are
//! upserts keyed by identity, so rerunning a clone into the same target merges
//! instead of duplicating.

use crate::cancel::CancelToken;
use crate::config::BranchConfig;
use crate::error::BranchError;
use crate::remap::{remap, remap_scene};
use crate::selection::{CloneCounts, CloneMode, Selection};
use crate::walk;
use loom_graph::{Edge, EdgeKind, GraphWrite, NodeKey, NodeLabel, Props, StoreError};
use serde_json::Value;
use std::collections::BTreeMap;

/// Where a clone is written
#[derive(Debug, Clone, Copy)]
pub struct CloneTarget<'a> {
    /// Target universe id
    pub id: &'a str,
    /// Explicit universe name
    pub name: Option<&'a str>,
    /// Merge into an existing target instead of failing
    pub force: bool,
}

/// Result of a clone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneOutcome {
    /// Target universe id
    pub target_id: String,
    /// Nodes written, per type
    pub counts: CloneCounts,
}

/// Writes selections inside a caller-owned transaction
#[derive(Debug)]
pub struct GraphCloner<'c> {
    config: &'c BranchConfig,
    cancel: &'c CancelToken,
}

/// Per-run lookup state
struct Plan<'s> {
    selection: &'s Selection,
    target: &'s str,
    /// Scene id -> owning stories that were cloned
    scene_owners: BTreeMap<&'s str, Vec<&'s str>>,
}

impl Plan<'_> {
    /// Clone ids of a source scene, one per cloned owning story
    fn scene_clones(&self, scene_id: &str) -> Vec<String> {
        self.scene_owners
            .get(scene_id)
            .map(|stories| {
                stories
                    .iter()
                    .map(|story| remap_scene(self.target, story, scene_id))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl<'c> GraphCloner<'c> {
    /// Create cloner
    #[inline]
    #[must_use]
    pub fn new(config: &'c BranchConfig, cancel: &'c CancelToken) -> Self {
        Self { config, cancel }
    }

    /// Write `selection` under `target`
    ///
    /// The caller must have run the source/target guardrail in the same
    /// transaction.
    ///
    /// # Errors
    /// - [`BranchError::TargetAlreadyExists`] if the target appeared and `force` is unset
    /// - [`BranchError::Cancelled`] between node-type batches
    /// - [`BranchError::Store`] on write failures
    pub fn execute(
        &self,
        tx: &mut dyn GraphWrite,
        selection: &Selection,
        target: CloneTarget<'_>,
    ) -> Result<CloneOutcome, BranchError> {
        let plan = Plan {
            selection,
            target: target.id,
            scene_owners: selection.scene_owners(),
        };

        self.cancel.check()?;
        self.write_universe(tx, selection, target)?;

        let mut counts = CloneCounts::default();
        self.cancel.check()?;
        counts.stories = clone_stories(tx, &plan)?;
        self.cancel.check()?;
        counts.scenes = clone_scenes(tx, &plan)?;
        self.cancel.check()?;
        counts.entities = clone_entities(tx, &plan)?;
        self.cancel.check()?;
        counts.facts = clone_facts(tx, &plan)?;
        self.cancel.check()?;
        counts.sheets = clone_sheets(tx, &plan)?;
        self.cancel.check()?;
        counts.relation_states = clone_relation_states(tx, &plan)?;
        self.cancel.check()?;
        counts.arcs = clone_arcs(tx, &plan)?;

        tracing::debug!(
            target_id = target.id,
            nodes = counts.total(),
            "clone written"
        );
        Ok(CloneOutcome {
            target_id: target.id.to_string(),
            counts,
        })
    }

    fn write_universe(
        &self,
        tx: &mut dyn GraphWrite,
        selection: &Selection,
        target: CloneTarget<'_>,
    ) -> Result<(), BranchError> {
        let source_key = NodeKey::new(NodeLabel::Universe, selection.source_id.clone());
        let source = tx
            .node(&source_key)?
            .ok_or_else(|| BranchError::SourceNotFound(selection.source_id.clone()))?;

        let name = target.name.map_or_else(
            || {
                format!(
                    "{} [{}]",
                    source.prop_str("name").unwrap_or(&selection.source_id),
                    self.config.suffix(selection.mode)
                )
            },
            str::to_string,
        );
        let note = match (selection.mode, &selection.divergence) {
            (CloneMode::Branch, Some(d)) => format!(" (branched at {})", d.scene_id),
            (CloneMode::Branch, None) => " (branched)".to_string(),
            (CloneMode::Clone, _) => " (cloned)".to_string(),
            (CloneMode::Subset, _) => " (subset clone)".to_string(),
        };
        let description = format!("{}{note}", source.prop_str("description").unwrap_or(""));

        let mut props = Props::new();
        props.insert("name".into(), Value::from(name));
        props.insert("description".into(), Value::from(description));

        if target.force {
            tx.upsert_node(NodeLabel::Universe, target.id, props)?;
        } else {
            tx.create_node(NodeLabel::Universe, target.id, props)
                .map_err(|e| match e {
                    StoreError::AlreadyExists { .. } => {
                        BranchError::TargetAlreadyExists(target.id.to_string())
                    }
                    other => BranchError::Store(other),
                })?;
        }
        let target_key = NodeKey::new(NodeLabel::Universe, target.id);

        for owner in walk::incoming(tx.as_read(), &source_key, EdgeKind::HasUniverse, NodeLabel::Multiverse)? {
            tx.upsert_edge(Edge::new(owner.from, EdgeKind::HasUniverse, target_key.clone()))?;
        }
        carry_systems(tx, &source_key, &target_key)?;
        for axiom in walk::incoming(tx.as_read(), &source_key, EdgeKind::AppliesTo, NodeLabel::Axiom)? {
            tx.upsert_edge(Edge::new(axiom.from, EdgeKind::AppliesTo, target_key.clone()))?;
        }

        let mut provenance = Edge::new(target_key, EdgeKind::BranchedFrom, source_key);
        if let Some(d) = &selection.divergence {
            provenance = provenance
                .with_prop("at_scene", d.scene_id.clone())
                .with_prop("story_id", d.story_id.clone())
                .with_prop("sequence_index", d.sequence_index);
        }
        tx.upsert_edge(provenance)?;
        Ok(())
    }
}

/// Copy one node to `clone_id` with merged props and a `BRANCHED_FROM` edge
fn copy_node(
    tx: &mut dyn GraphWrite,
    label: NodeLabel,
    source_id: &str,
    clone_id: &str,
) -> Result<(NodeKey, NodeKey), BranchError> {
    let original = NodeKey::new(label, source_id);
    let props = tx.node(&original)?.map(|n| n.props).unwrap_or_default();
    tx.upsert_node(label, clone_id, props)?;
    let clone = NodeKey::new(label, clone_id);
    tx.upsert_edge(Edge::new(clone.clone(), EdgeKind::BranchedFrom, original.clone()))?;
    Ok((original, clone))
}

fn carry_systems(
    tx: &mut dyn GraphWrite,
    original: &NodeKey,
    clone: &NodeKey,
) -> Result<(), BranchError> {
    for edge in walk::outgoing(tx.as_read(), original, EdgeKind::UsesSystem)? {
        tx.upsert_edge(Edge::new(clone.clone(), EdgeKind::UsesSystem, edge.to))?;
    }
    Ok(())
}

/// Props of the first edge `from -kind-> to`, if any
fn edge_props(
    tx: &dyn GraphWrite,
    from: &NodeKey,
    kind: EdgeKind,
    to: &NodeKey,
) -> Result<Props, BranchError> {
    Ok(walk::outgoing(tx.as_read(), from, kind)?
        .into_iter()
        .find(|e| &e.to == to)
        .map(|e| e.props)
        .unwrap_or_default())
}

fn clone_stories(tx: &mut dyn GraphWrite, plan: &Plan<'_>) -> Result<usize, BranchError> {
    let source_universe = NodeKey::new(NodeLabel::Universe, plan.selection.source_id.clone());
    let target_universe = NodeKey::new(NodeLabel::Universe, plan.target);
    for story in &plan.selection.stories {
        let (original, clone) = copy_node(tx, NodeLabel::Story, story, &remap(plan.target, story))?;
        let mut owns = Edge::new(target_universe.clone(), EdgeKind::HasStory, clone.clone());
        owns.props = edge_props(tx, &source_universe, EdgeKind::HasStory, &original)?;
        tx.upsert_edge(owns)?;
        carry_systems(tx, &original, &clone)?;
    }
    Ok(plan.selection.stories.len())
}

fn clone_scenes(tx: &mut dyn GraphWrite, plan: &Plan<'_>) -> Result<usize, BranchError> {
    for scene in &plan.selection.scenes {
        let story_clone = NodeKey::new(NodeLabel::Story, remap(plan.target, &scene.story_id));
        let clone_id = remap(&story_clone.id, &scene.scene_id);
        let (_, clone) = copy_node(tx, NodeLabel::Scene, &scene.scene_id, &clone_id)?;
        let mut owns = Edge::new(story_clone, EdgeKind::HasScene, clone);
        if let Some(index) = scene.sequence_index {
            owns = owns.with_prop("sequence_index", index);
        }
        tx.upsert_edge(owns)?;
    }
    Ok(plan.selection.scenes.len())
}

fn clone_entities(tx: &mut dyn GraphWrite, plan: &Plan<'_>) -> Result<usize, BranchError> {
    let target_universe = NodeKey::new(NodeLabel::Universe, plan.target);
    for entity in &plan.selection.entities {
        let (original, clone) =
            copy_node(tx, NodeLabel::Entity, entity, &remap(plan.target, entity))?;
        tx.upsert_edge(Edge::new(clone.clone(), EdgeKind::BelongsTo, target_universe.clone()))?;
        carry_systems(tx, &original, &clone)?;

        for appearance in walk::outgoing(tx.as_read(), &original, EdgeKind::AppearsIn)? {
            for scene in plan.scene_clones(&appearance.to.id) {
                tx.upsert_edge(Edge::new(
                    clone.clone(),
                    EdgeKind::AppearsIn,
                    NodeKey::new(NodeLabel::Scene, scene),
                ))?;
            }
        }
    }
    Ok(plan.selection.entities.len())
}

fn clone_facts(tx: &mut dyn GraphWrite, plan: &Plan<'_>) -> Result<usize, BranchError> {
    for fact in &plan.selection.facts {
        let (original, clone) = copy_node(tx, NodeLabel::Fact, fact, &remap(plan.target, fact))?;

        for occurrence in walk::outgoing(tx.as_read(), &original, EdgeKind::OccursIn)? {
            for scene in plan.scene_clones(&occurrence.to.id) {
                tx.upsert_edge(Edge::new(
                    clone.clone(),
                    EdgeKind::OccursIn,
                    NodeKey::new(NodeLabel::Scene, scene),
                ))?;
            }
        }

        let participants =
            walk::incoming(tx.as_read(), &original, EdgeKind::ParticipatesAs, NodeLabel::Entity)?;
        for participant in participants {
            if !plan.selection.entities.contains(&participant.from.id) {
                continue;
            }
            let mut edge = Edge::new(
                NodeKey::new(NodeLabel::Entity, remap(plan.target, &participant.from.id)),
                EdgeKind::ParticipatesAs,
                clone.clone(),
            );
            edge.props = participant.props;
            tx.upsert_edge(edge)?;
        }
    }
    Ok(plan.selection.facts.len())
}

fn clone_sheets(tx: &mut dyn GraphWrite, plan: &Plan<'_>) -> Result<usize, BranchError> {
    for sheet in &plan.selection.sheets {
        let (original, clone) = copy_node(tx, NodeLabel::Sheet, sheet, &remap(plan.target, sheet))?;
        carry_systems(tx, &original, &clone)?;
    }
    for link in &plan.selection.sheet_links {
        let owner = NodeKey::new(NodeLabel::Entity, link.entity_id.clone());
        let sheet = NodeKey::new(NodeLabel::Sheet, link.sheet_id.clone());
        let mut edge = Edge::new(
            NodeKey::new(NodeLabel::Entity, remap(plan.target, &link.entity_id)),
            EdgeKind::HasSheet,
            NodeKey::new(NodeLabel::Sheet, remap(plan.target, &link.sheet_id)),
        );
        edge.props = edge_props(tx, &owner, EdgeKind::HasSheet, &sheet)?;
        tx.upsert_edge(edge)?;
    }
    Ok(plan.selection.sheets.len())
}

fn clone_relation_states(tx: &mut dyn GraphWrite, plan: &Plan<'_>) -> Result<usize, BranchError> {
    for rs in &plan.selection.relation_states {
        let (original, clone) =
            copy_node(tx, NodeLabel::RelationState, rs, &remap(plan.target, rs))?;

        for endpoint in walk::outgoing(tx.as_read(), &original, EdgeKind::RelStateFor)? {
            if !plan.selection.entities.contains(&endpoint.to.id) {
                continue;
            }
            let mut edge = Edge::new(
                clone.clone(),
                EdgeKind::RelStateFor,
                NodeKey::new(NodeLabel::Entity, remap(plan.target, &endpoint.to.id)),
            );
            edge.props = endpoint.props;
            tx.upsert_edge(edge)?;
        }

        for anchor in walk::provenance(tx.as_read(), rs)? {
            for scene in plan.scene_clones(&anchor.to.id) {
                tx.upsert_edge(Edge::new(
                    clone.clone(),
                    anchor.kind,
                    NodeKey::new(NodeLabel::Scene, scene),
                ))?;
            }
        }
    }
    Ok(plan.selection.relation_states.len())
}

fn clone_arcs(tx: &mut dyn GraphWrite, plan: &Plan<'_>) -> Result<usize, BranchError> {
    let target_universe = NodeKey::new(NodeLabel::Universe, plan.target);
    for arc in &plan.selection.arcs {
        let (original, clone) = copy_node(tx, NodeLabel::Arc, arc, &remap(plan.target, arc))?;
        tx.upsert_edge(Edge::new(target_universe.clone(), EdgeKind::HasArc, clone.clone()))?;

        for ordering in walk::outgoing(tx.as_read(), &original, EdgeKind::HasStory)? {
            if !plan.selection.stories.contains(&ordering.to.id) {
                continue;
            }
            let mut edge = Edge::new(
                clone.clone(),
                EdgeKind::HasStory,
                NodeKey::new(NodeLabel::Story, remap(plan.target, &ordering.to.id)),
            );
            edge.props = ordering.props;
            tx.upsert_edge(edge)?;
        }
    }
    Ok(plan.selection.arcs.len())
}
