//! Promotion strategy trait and plan

use crate::cancel::CancelToken;
use crate::error::BranchError;
use loom_graph::{Edge, EdgeKey, GraphRead, GraphWrite, NodeKey, Props};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Built-in promotion strategies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionStrategyKind {
    /// Attach source facts to target scenes with the same literal ids
    #[default]
    AppendFacts,
    /// Make source nodes jointly owned by the target
    AppendMissing,
    /// Replace properties of facts with matching ids
    Overwrite,
}

impl PromotionStrategyKind {
    /// All strategies
    pub const ALL: [Self; 3] = [Self::AppendFacts, Self::AppendMissing, Self::Overwrite];

    /// Strategy name
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AppendFacts => "append_facts",
            Self::AppendMissing => "append_missing",
            Self::Overwrite => "overwrite",
        }
    }

    /// Name of the metric the strategy reports
    #[inline]
    #[must_use]
    pub const fn metric_name(self) -> &'static str {
        match self {
            Self::AppendFacts => "inserted",
            Self::AppendMissing => "ops",
            Self::Overwrite => "updated",
        }
    }
}

impl Display for PromotionStrategyKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromotionStrategyKind {
    type Err = BranchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| BranchError::UnknownStrategy(s.to_string()))
    }
}

/// Writes one promotion will make
#[derive(Debug, Clone, PartialEq)]
pub struct PromotionPlan {
    /// Strategy that built the plan
    pub strategy: PromotionStrategyKind,
    /// Edges to upsert, deduplicated by identity
    pub edges: BTreeMap<EdgeKey, Edge>,
    /// Nodes whose properties are replaced
    pub overwrites: Vec<(NodeKey, Props)>,
    /// Strategy metric
    pub metric: usize,
}

impl PromotionPlan {
    /// Create empty plan
    #[inline]
    #[must_use]
    pub fn new(strategy: PromotionStrategyKind) -> Self {
        Self {
            strategy,
            edges: BTreeMap::new(),
            overwrites: Vec::new(),
            metric: 0,
        }
    }

    /// Add an edge; repeats collapse onto one upsert
    #[inline]
    pub fn add_edge(&mut self, edge: Edge) {
        self.edges.insert(edge.key(), edge);
    }

    /// Check if applying would write nothing
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty() && self.overwrites.is_empty()
    }

    /// Apply inside a transaction
    ///
    /// # Errors
    /// [`BranchError::Cancelled`] or store failures
    pub fn apply(
        self,
        tx: &mut dyn GraphWrite,
        cancel: &CancelToken,
    ) -> Result<AppliedPromotion, BranchError> {
        let mut applied = AppliedPromotion::default();
        cancel.check()?;
        for edge in self.edges.into_values() {
            if tx.upsert_edge(edge)?.created() {
                applied.edges_created += 1;
            }
        }
        cancel.check()?;
        for (key, props) in self.overwrites {
            tx.replace_props(&key, props)?;
            applied.nodes_updated += 1;
        }
        Ok(applied)
    }
}

/// What applying a plan actually changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AppliedPromotion {
    /// Edges that did not exist before
    pub edges_created: usize,
    /// Nodes whose properties were replaced
    pub nodes_updated: usize,
}

/// Promotion strategy
pub trait PromotionStrategy: Send + Sync + fmt::Debug {
    /// Which strategy this is
    fn kind(&self) -> PromotionStrategyKind;

    /// Plan the promotion of `source_id` into `target_id`
    ///
    /// # Errors
    /// Strategy preconditions or store failures
    fn plan(
        &self,
        reader: &dyn GraphRead,
        source_id: &str,
        target_id: &str,
    ) -> Result<PromotionPlan, BranchError>;
}
