//! `append_missing`: make the source's nodes jointly owned by the target

use super::strategy::{PromotionPlan, PromotionStrategy, PromotionStrategyKind};
use crate::error::BranchError;
use crate::walk;
use loom_graph::{Edge, EdgeKind, EdgePattern, GraphRead, NodeKey, NodeLabel};

/// Adds ownership edges from the target universe to the source's stories,
/// scenes, entities, facts and sheets without copying any node
///
/// `HAS_SCENE` edges are re-asserted with their existing properties, so the
/// source's scene order is never rewritten. The metric is the number of
/// planned edge upserts; rerunning is idempotent.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppendMissingStrategy;

impl PromotionStrategy for AppendMissingStrategy {
    fn kind(&self) -> PromotionStrategyKind {
        PromotionStrategyKind::AppendMissing
    }

    fn plan(
        &self,
        reader: &dyn GraphRead,
        source_id: &str,
        target_id: &str,
    ) -> Result<PromotionPlan, BranchError> {
        let mut plan = PromotionPlan::new(self.kind());
        if !reader.exists(NodeLabel::Universe, target_id)? {
            return Ok(plan);
        }
        let target = NodeKey::new(NodeLabel::Universe, target_id);

        for story in walk::universe_stories(reader, source_id)? {
            plan.add_edge(Edge::new(
                target.clone(),
                EdgeKind::HasStory,
                NodeKey::new(NodeLabel::Story, story),
            ));
        }

        for scene in walk::universe_scenes(reader, source_id)? {
            let scene_key = NodeKey::new(NodeLabel::Scene, scene.scene_id.clone());
            let ordering = EdgePattern::new(EdgeKind::HasScene)
                .from_node(NodeLabel::Story, scene.story_id.clone())
                .to_node(NodeLabel::Scene, scene.scene_id.clone());
            for has_scene in reader.query(&ordering)? {
                plan.add_edge(has_scene);
            }
            for entity in walk::scene_entities(reader, &scene.scene_id)? {
                plan.add_edge(Edge::new(
                    NodeKey::new(NodeLabel::Entity, entity),
                    EdgeKind::AppearsIn,
                    scene_key.clone(),
                ));
            }
            for fact in walk::scene_facts(reader, &scene.scene_id)? {
                plan.add_edge(Edge::new(
                    NodeKey::new(NodeLabel::Fact, fact),
                    EdgeKind::OccursIn,
                    scene_key.clone(),
                ));
            }
        }

        for entity in walk::universe_entities(reader, source_id)? {
            let entity_key = NodeKey::new(NodeLabel::Entity, entity);
            plan.add_edge(Edge::new(entity_key.clone(), EdgeKind::BelongsTo, target.clone()));
            for sheet in walk::outgoing(reader, &entity_key, EdgeKind::HasSheet)? {
                plan.add_edge(sheet);
            }
        }

        plan.metric = plan.edges.len();
        tracing::debug!(source_id, target_id, ops = plan.metric, "append_missing planned");
        Ok(plan)
    }
}
