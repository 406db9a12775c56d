//! `append_facts`: attach source facts to target scenes with equal literal ids

use super::strategy::{PromotionPlan, PromotionStrategy, PromotionStrategyKind};
use crate::error::BranchError;
use crate::remap::unmap;
use crate::walk;
use loom_graph::{Edge, EdgeKind, GraphRead, NodeKey, NodeLabel};
use std::collections::BTreeSet;

/// Links each source fact to the target scene sharing its literal
/// `(story_id, scene_id)` pair
///
/// Universes produced by cloning never share literal ids with their source,
/// so between such universes this strategy matches nothing. When `strict`,
/// that situation is reported as [`BranchError::LiteralIdPrecondition`]
/// instead of a zero metric.
#[derive(Debug, Clone, Copy)]
pub struct AppendFactsStrategy {
    strict: bool,
}

impl AppendFactsStrategy {
    /// Create strategy
    #[inline]
    #[must_use]
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }
}

impl Default for AppendFactsStrategy {
    fn default() -> Self {
        Self::new(true)
    }
}

impl PromotionStrategy for AppendFactsStrategy {
    fn kind(&self) -> PromotionStrategyKind {
        PromotionStrategyKind::AppendFacts
    }

    fn plan(
        &self,
        reader: &dyn GraphRead,
        source_id: &str,
        target_id: &str,
    ) -> Result<PromotionPlan, BranchError> {
        let target_pairs: BTreeSet<(String, String)> = walk::universe_scenes(reader, target_id)?
            .into_iter()
            .map(|s| (s.story_id, s.scene_id))
            .collect();

        let mut plan = PromotionPlan::new(self.kind());
        let mut inserted = BTreeSet::new();
        let mut source_has_facts = false;
        for scene in walk::universe_scenes(reader, source_id)? {
            let facts = walk::scene_facts(reader, &scene.scene_id)?;
            source_has_facts |= !facts.is_empty();
            if !target_pairs.contains(&(scene.story_id.clone(), scene.scene_id.clone())) {
                continue;
            }
            for fact in facts {
                plan.add_edge(Edge::new(
                    NodeKey::new(NodeLabel::Fact, fact.clone()),
                    EdgeKind::OccursIn,
                    NodeKey::new(NodeLabel::Scene, scene.scene_id.clone()),
                ));
                inserted.insert(fact);
            }
        }

        if self.strict && inserted.is_empty() && source_has_facts {
            let source_stories = walk::universe_stories(reader, source_id)?;
            let target_stories = walk::universe_stories(reader, target_id)?;
            if namespaced(&source_stories, &target_stories, source_id, target_id) {
                return Err(BranchError::LiteralIdPrecondition {
                    strategy: PromotionStrategyKind::AppendFacts.as_str(),
                    source_id: source_id.to_string(),
                    target_id: target_id.to_string(),
                });
            }
        }

        plan.metric = inserted.len();
        Ok(plan)
    }
}

/// Check if either universe's stories are namespaced under either universe
fn namespaced(
    source_stories: &BTreeSet<String>,
    target_stories: &BTreeSet<String>,
    source_id: &str,
    target_id: &str,
) -> bool {
    [source_stories, target_stories].into_iter().any(|stories| {
        stories
            .iter()
            .any(|id| unmap(id, source_id).is_some() || unmap(id, target_id).is_some())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn clone_namespaces_are_detected() {
        assert!(namespaced(&set(&["U2/ST1"]), &set(&["ST1"]), "U2", "U1"));
        assert!(namespaced(&set(&["U1/ST1"]), &set(&["ST1"]), "U2", "U1"));
        assert!(namespaced(&set(&["ST1"]), &set(&["U1/ST1"]), "U1", "U3"));
        assert!(namespaced(&set(&["ST1"]), &set(&["U3/ST1"]), "U1", "U3"));
    }

    #[test]
    fn independent_universes_are_not_namespaced() {
        assert!(!namespaced(&set(&["ST1"]), &set(&["ST9"]), "U1", "U5"));
    }
}
