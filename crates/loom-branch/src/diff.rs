//! Universe diffs
//!
//! Source ids are compared literally; target ids are unmapped out of the
//! target's namespace first, so a fresh clone diffs empty against its source.
//! Scenes are compared per owning story: a scene shared by two stories is
//! only in the source if either of its stories lost it.
//! Ids that were not produced by namespacing under the target are ignored on
//! the target side.

use crate::error::BranchError;
use crate::remap::{remap, unmap};
use crate::walk;
use loom_graph::{EdgeKind, GraphRead, NodeKey, NodeLabel};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Ids present on only one side
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Presence {
    /// Logical ids only the source has, sorted
    pub only_in_source: Vec<String>,
    /// Logical ids only the target has, sorted
    pub only_in_target: Vec<String>,
}

impl Presence {
    fn between(source: &BTreeSet<String>, target: &BTreeSet<String>) -> Self {
        Self {
            only_in_source: source.difference(target).cloned().collect(),
            only_in_target: target.difference(source).cloned().collect(),
        }
    }

    /// Scene presence, compared per owning story and reported by scene id
    fn between_scenes(
        source: &BTreeSet<(String, String)>,
        target: &BTreeSet<(String, String)>,
    ) -> Self {
        Self {
            only_in_source: scene_ids(source.difference(target)),
            only_in_target: scene_ids(target.difference(source)),
        }
    }

    /// Check if both sides agree
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.only_in_source.is_empty() && self.only_in_target.is_empty()
    }
}

/// Distinct, sorted scene ids of `(story, scene)` pairs
fn scene_ids<'a>(pairs: impl Iterator<Item = &'a (String, String)>) -> Vec<String> {
    pairs
        .map(|(_, scene)| scene.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Target nodes with a `BRANCHED_FROM` edge into the source, per type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProvenanceCounts {
    /// Stories
    pub stories: usize,
    /// Scenes
    pub scenes: usize,
    /// Entities
    pub entities: usize,
    /// Facts
    pub facts: usize,
}

/// Per-type presence between two universes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UniverseDiff {
    /// Source universe
    pub source_id: String,
    /// Target universe
    pub target_id: String,
    /// Stories
    pub stories: Presence,
    /// Scenes
    pub scenes: Presence,
    /// Entities
    pub entities: Presence,
    /// Facts
    pub facts: Presence,
    /// Structural lineage, independent of naming
    pub provenance_counts: ProvenanceCounts,
}

impl UniverseDiff {
    /// Count-only form
    #[must_use]
    pub fn summary(&self) -> DiffSummary {
        let mut counts = BTreeMap::new();
        for (name, presence) in [
            ("stories", &self.stories),
            ("scenes", &self.scenes),
            ("entities", &self.entities),
            ("facts", &self.facts),
        ] {
            counts.insert(format!("{name}_only_in_source"), presence.only_in_source.len());
            counts.insert(format!("{name}_only_in_target"), presence.only_in_target.len());
        }
        DiffSummary {
            source_id: self.source_id.clone(),
            target_id: self.target_id.clone(),
            counts,
            provenance_counts: self.provenance_counts,
        }
    }

    /// Check if every type agrees
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
            && self.scenes.is_empty()
            && self.entities.is_empty()
            && self.facts.is_empty()
    }
}

/// Count-only diff
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    /// Source universe
    pub source_id: String,
    /// Target universe
    pub target_id: String,
    /// `<type>_only_in_source` / `<type>_only_in_target`
    pub counts: BTreeMap<String, usize>,
    /// Structural lineage, independent of naming
    pub provenance_counts: ProvenanceCounts,
}

/// Literal ids reachable from one universe
struct UniverseIds {
    stories: BTreeSet<String>,
    scenes: BTreeSet<(String, String)>,
    entities: BTreeSet<String>,
    facts: BTreeSet<String>,
}

impl UniverseIds {
    fn gather(reader: &dyn GraphRead, universe_id: &str) -> Result<Self, BranchError> {
        Ok(Self {
            stories: walk::universe_stories(reader, universe_id)?,
            scenes: walk::universe_scenes(reader, universe_id)?
                .into_iter()
                .map(|s| (s.story_id, s.scene_id))
                .collect(),
            entities: walk::universe_entities(reader, universe_id)?,
            facts: walk::universe_facts(reader, universe_id)?,
        })
    }

    fn scene_ids(&self) -> BTreeSet<String> {
        self.scenes.iter().map(|(_, scene)| scene.clone()).collect()
    }
}

/// Read-only comparison of two universes
pub struct DiffEngine<'r> {
    reader: &'r dyn GraphRead,
}

impl<'r> DiffEngine<'r> {
    /// Create engine over a reader
    #[inline]
    #[must_use]
    pub fn new(reader: &'r dyn GraphRead) -> Self {
        Self { reader }
    }

    /// Typed diff of `target` against `source`
    ///
    /// Missing universes read as empty.
    ///
    /// # Errors
    /// Store failures only
    pub fn diff_typed(&self, source_id: &str, target_id: &str) -> Result<UniverseDiff, BranchError> {
        let source = UniverseIds::gather(self.reader, source_id)?;
        let target = UniverseIds::gather(self.reader, target_id)?;

        let logical = |ids: &BTreeSet<String>| -> BTreeSet<String> {
            ids.iter()
                .filter_map(|id| unmap(id, target_id))
                .map(str::to_string)
                .collect()
        };
        let target_scenes: BTreeSet<(String, String)> = target
            .scenes
            .iter()
            .filter_map(|(story, scene)| {
                let story = unmap(story, target_id)?;
                let scene = unmap(scene, &remap(target_id, story))?;
                Some((story.to_string(), scene.to_string()))
            })
            .collect();

        let diff = UniverseDiff {
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            stories: Presence::between(&source.stories, &logical(&target.stories)),
            scenes: Presence::between_scenes(&source.scenes, &target_scenes),
            entities: Presence::between(&source.entities, &logical(&target.entities)),
            facts: Presence::between(&source.facts, &logical(&target.facts)),
            provenance_counts: ProvenanceCounts {
                stories: self.lineage(NodeLabel::Story, &target.stories, &source.stories)?,
                scenes: self.lineage(NodeLabel::Scene, &target.scene_ids(), &source.scene_ids())?,
                entities: self.lineage(NodeLabel::Entity, &target.entities, &source.entities)?,
                facts: self.lineage(NodeLabel::Fact, &target.facts, &source.facts)?,
            },
        };
        tracing::debug!(
            source_id,
            target_id,
            scenes_only_in_source = diff.scenes.only_in_source.len(),
            scenes_only_in_target = diff.scenes.only_in_target.len(),
            "diff computed"
        );
        Ok(diff)
    }

    /// Count-only diff
    ///
    /// # Errors
    /// Store failures only
    pub fn diff(&self, source_id: &str, target_id: &str) -> Result<DiffSummary, BranchError> {
        Ok(self.diff_typed(source_id, target_id)?.summary())
    }

    /// Target nodes of `label` that branched from one of the source's
    fn lineage(
        &self,
        label: NodeLabel,
        target: &BTreeSet<String>,
        source: &BTreeSet<String>,
    ) -> Result<usize, BranchError> {
        let mut count = 0;
        for id in target {
            let key = NodeKey::new(label, id.clone());
            let descends = walk::outgoing(self.reader, &key, EdgeKind::BranchedFrom)?
                .iter()
                .any(|e| e.to.label == label && source.contains(&e.to.id));
            if descends {
                count += 1;
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn presence_is_asymmetric_difference() {
        let presence = Presence::between(&set(&["SC1", "SC2", "SC3"]), &set(&["SC1", "SC2", "SC4"]));
        assert_eq!(presence.only_in_source, vec!["SC3"]);
        assert_eq!(presence.only_in_target, vec!["SC4"]);
        assert!(!presence.is_empty());
    }

    #[test]
    fn shared_scene_missing_from_one_story_is_only_in_source() {
        let pair = |story: &str, scene: &str| (story.to_string(), scene.to_string());
        let source: BTreeSet<_> = [pair("ST1", "SC1"), pair("ST2", "SC1"), pair("ST2", "SC2")].into();
        let target: BTreeSet<_> = [pair("ST1", "SC1")].into();

        let presence = Presence::between_scenes(&source, &target);
        assert_eq!(presence.only_in_source, vec!["SC1", "SC2"]);
        assert!(presence.only_in_target.is_empty());
    }

    #[test]
    fn summary_names_each_side() {
        let diff = UniverseDiff {
            scenes: Presence::between(&set(&["SC3"]), &set(&[])),
            ..UniverseDiff::default()
        };
        let summary = diff.summary();
        assert_eq!(summary.counts["scenes_only_in_source"], 1);
        assert_eq!(summary.counts["scenes_only_in_target"], 0);
        assert_eq!(summary.counts.len(), 8);
    }
}
