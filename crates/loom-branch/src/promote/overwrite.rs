//! `overwrite`: replace properties of facts with matching ids

use super::strategy::{PromotionPlan, PromotionStrategy, PromotionStrategyKind};
use crate::error::BranchError;
use crate::walk;
use loom_graph::{GraphRead, NodeKey, NodeLabel};

/// For every source fact whose id names an existing `Fact`, replaces that
/// node's properties with the source fact's
///
/// Matching is by literal id anywhere in the store. Last writer wins and the
/// previous properties are not kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverwriteStrategy;

impl PromotionStrategy for OverwriteStrategy {
    fn kind(&self) -> PromotionStrategyKind {
        PromotionStrategyKind::Overwrite
    }

    fn plan(
        &self,
        reader: &dyn GraphRead,
        source_id: &str,
        _target_id: &str,
    ) -> Result<PromotionPlan, BranchError> {
        let mut plan = PromotionPlan::new(self.kind());
        for fact in walk::universe_facts(reader, source_id)? {
            let key = NodeKey::new(NodeLabel::Fact, fact);
            if let Some(node) = reader.node(&key)? {
                plan.overwrites.push((key, node.props));
            }
        }
        plan.metric = plan.overwrites.len();
        Ok(plan)
    }
}
