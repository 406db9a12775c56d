//! Serializable operation reports

use crate::promote::{AppliedPromotion, PromotionPlan, PromotionStrategyKind};
use crate::selection::{CloneCounts, CloneMode, Divergence, Selection, SelectionFingerprint};
use serde::Serialize;

/// Result of a branch or clone
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloneReport {
    /// Whether this was a dry run
    pub dry_run: bool,
    /// Source universe
    pub source_id: String,
    /// Target universe
    pub target_id: String,
    /// Operation mode
    pub mode: CloneMode,
    /// Divergence point, for branches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub divergence: Option<Divergence>,
    /// Nodes copied (or that would be), per type
    pub counts: CloneCounts,
    /// Fingerprint of the selection that was copied
    pub fingerprint: SelectionFingerprint,
}

impl CloneReport {
    /// Report for a selection with the given counts
    #[must_use]
    pub fn new(selection: &Selection, target_id: &str, counts: CloneCounts, dry_run: bool) -> Self {
        Self {
            dry_run,
            source_id: selection.source_id.clone(),
            target_id: target_id.to_string(),
            mode: selection.mode,
            divergence: selection.divergence.clone(),
            counts,
            fingerprint: selection.fingerprint(),
        }
    }
}

/// Result of a promotion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromotionReport {
    /// Always true for a completed promotion
    pub ok: bool,
    /// Whether this was a dry run
    pub dry_run: bool,
    /// Source universe
    pub source_id: String,
    /// Target universe
    pub target_id: String,
    /// Strategy used
    pub strategy: PromotionStrategyKind,
    /// `inserted`, `ops` or `updated`
    pub metric_name: &'static str,
    /// Strategy metric
    pub metric: usize,
    /// Edges that did not exist before; zero for dry runs
    pub edges_created: usize,
    /// Nodes whose properties were replaced; zero for dry runs
    pub nodes_updated: usize,
}

impl PromotionReport {
    /// Report for a plan and what applying it changed
    #[must_use]
    pub fn new(
        source_id: &str,
        target_id: &str,
        plan: &PromotionPlan,
        applied: Option<AppliedPromotion>,
    ) -> Self {
        let applied_or_zero = applied.unwrap_or_default();
        Self {
            ok: true,
            dry_run: applied.is_none(),
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            strategy: plan.strategy,
            metric_name: plan.strategy.metric_name(),
            metric: plan.metric,
            edges_created: applied_or_zero.edges_created,
            nodes_updated: applied_or_zero.nodes_updated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_run_promotion_applies_nothing() {
        let mut plan = PromotionPlan::new(PromotionStrategyKind::AppendMissing);
        plan.metric = 4;
        let report = PromotionReport::new("U2", "U1", &plan, None);
        assert!(report.dry_run);
        assert_eq!(report.metric_name, "ops");
        assert_eq!(report.metric, 4);
        assert_eq!(report.edges_created, 0);
    }

    #[test]
    fn clone_report_omits_missing_divergence() {
        let selection = Selection::empty("U1", CloneMode::Clone);
        let report = CloneReport::new(&selection, "U3", selection.counts(), true);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["mode"], "clone");
        assert!(json.get("divergence").is_none());
        assert_eq!(json["fingerprint"].as_str().map(str::len), Some(64));
    }
}
