//! Promotion strategy registry

use super::append_facts::AppendFactsStrategy;
use super::append_missing::AppendMissingStrategy;
use super::overwrite::OverwriteStrategy;
use super::strategy::{PromotionStrategy, PromotionStrategyKind};
use crate::config::BranchConfig;
use std::collections::BTreeMap;

/// Strategies available to a [`crate::Brancher`], by kind
#[derive(Debug, Default)]
pub struct PromotionRegistry {
    strategies: BTreeMap<PromotionStrategyKind, Box<dyn PromotionStrategy>>,
}

impl PromotionRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create registry with the built-in strategies configured from `config`
    #[must_use]
    pub fn with_defaults(config: &BranchConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(AppendFactsStrategy::new(config.strict_append_facts)));
        registry.register(Box::new(AppendMissingStrategy));
        registry.register(Box::new(OverwriteStrategy));
        registry
    }

    /// Register a strategy, replacing any with the same kind
    pub fn register(&mut self, strategy: Box<dyn PromotionStrategy>) {
        self.strategies.insert(strategy.kind(), strategy);
    }

    /// Look up a strategy
    #[inline]
    #[must_use]
    pub fn get(&self, kind: PromotionStrategyKind) -> Option<&dyn PromotionStrategy> {
        self.strategies.get(&kind).map(AsRef::as_ref)
    }

    /// Registered strategy names
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.keys().map(|kind| kind.as_str()).collect()
    }

    /// Number of registered strategies
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_kind() {
        let registry = PromotionRegistry::with_defaults(&BranchConfig::default());
        assert_eq!(registry.len(), PromotionStrategyKind::ALL.len());
        for kind in PromotionStrategyKind::ALL {
            assert_eq!(registry.get(kind).map(|s| s.kind()), Some(kind));
        }
        assert_eq!(registry.names(), vec!["append_facts", "append_missing", "overwrite"]);
    }

    #[test]
    fn empty_registry_has_nothing() {
        let registry = PromotionRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get(PromotionStrategyKind::Overwrite).is_none());
    }
}
