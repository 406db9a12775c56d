//! Brancher: the operation surface
//!
//! Every mutating operation is one store transaction: guardrail, selection and
//! writes either all commit or leave the store untouched. Dry runs execute the
//! same guardrail and selection against committed state and write nothing.

use crate::cancel::CancelToken;
use crate::cloner::{CloneTarget, GraphCloner};
use crate::config::BranchConfig;
use crate::diff::{DiffEngine, DiffSummary, UniverseDiff};
use crate::error::BranchError;
use crate::promote::{PromotionRegistry, PromotionStrategyKind};
use crate::report::{CloneReport, PromotionReport};
use crate::selection::{SelectionRequest, SubsetFilter};
use crate::selector::Selector;
use loom_graph::{GraphRead, GraphStore};

/// Target and behavior of a clone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloneOptions {
    /// Target universe id
    pub target_id: String,
    /// Explicit universe name
    pub target_name: Option<String>,
    /// Merge into an existing target instead of failing
    pub force: bool,
    /// Plan only
    pub dry_run: bool,
}

impl CloneOptions {
    /// Create options for a target
    #[inline]
    #[must_use]
    pub fn new(target_id: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            ..Self::default()
        }
    }

    /// Set universe name
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.target_name = Some(name.into());
        self
    }

    /// Allow writing into an existing target
    #[inline]
    #[must_use]
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Plan without writing
    #[inline]
    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Branch, clone, diff and promote universes in a store
///
/// Borrows the store for its own lifetime; create one per request.
#[derive(Debug)]
pub struct Brancher<'s, S: GraphStore> {
    store: &'s S,
    config: BranchConfig,
    registry: PromotionRegistry,
    cancel: CancelToken,
}

impl<'s, S: GraphStore> Brancher<'s, S> {
    /// Create brancher with default configuration
    #[must_use]
    pub fn new(store: &'s S) -> Self {
        Self::with_config(store, BranchConfig::default())
    }

    /// Create brancher with a configuration
    #[must_use]
    pub fn with_config(store: &'s S, config: BranchConfig) -> Self {
        Self {
            store,
            registry: PromotionRegistry::with_defaults(&config),
            config,
            cancel: CancelToken::new(),
        }
    }

    /// Use a shared cancellation token
    #[inline]
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &BranchConfig {
        &self.config
    }

    /// Branch `source_id` at a divergence scene
    ///
    /// # Errors
    /// Guardrail failures, [`BranchError::Cancelled`] or store failures
    pub fn branch_at_scene(
        &self,
        source_id: &str,
        scene_id: &str,
        options: &CloneOptions,
    ) -> Result<CloneReport, BranchError> {
        let request = SelectionRequest::BranchAtScene {
            scene_id: scene_id.to_string(),
        };
        self.run_clone(source_id, &request, options)
    }

    /// Clone all of `source_id`
    ///
    /// # Errors
    /// Guardrail failures, [`BranchError::Cancelled`] or store failures
    pub fn clone_full(
        &self,
        source_id: &str,
        options: &CloneOptions,
    ) -> Result<CloneReport, BranchError> {
        self.run_clone(source_id, &SelectionRequest::Full, options)
    }

    /// Clone the part of `source_id` admitted by `filter`
    ///
    /// # Errors
    /// Guardrail failures, [`BranchError::Cancelled`] or store failures
    pub fn clone_subset(
        &self,
        source_id: &str,
        filter: &SubsetFilter,
        options: &CloneOptions,
    ) -> Result<CloneReport, BranchError> {
        self.run_clone(source_id, &SelectionRequest::Subset(filter.clone()), options)
    }

    /// Run any clone request
    ///
    /// # Errors
    /// Guardrail failures, [`BranchError::Cancelled`] or store failures
    pub fn run_clone(
        &self,
        source_id: &str,
        request: &SelectionRequest,
        options: &CloneOptions,
    ) -> Result<CloneReport, BranchError> {
        let mode = request.mode();
        tracing::info!(
            source_id,
            target_id = %options.target_id,
            mode = %mode,
            dry_run = options.dry_run,
            force = options.force,
            "clone requested"
        );

        if options.dry_run {
            let selector = Selector::new(self.store as &dyn GraphRead);
            selector.check_source_and_target(source_id, &options.target_id, options.force)?;
            let selection = selector.select(source_id, request)?;
            return Ok(CloneReport::new(
                &selection,
                &options.target_id,
                selection.counts(),
                true,
            ));
        }

        let result = self.store.transaction(|tx| {
            let selector = Selector::new(tx.as_read());
            selector.check_source_and_target(source_id, &options.target_id, options.force)?;
            let selection = selector.select(source_id, request)?;

            let target = CloneTarget {
                id: &options.target_id,
                name: options.target_name.as_deref(),
                force: options.force,
            };
            let outcome = GraphCloner::new(&self.config, &self.cancel).execute(tx, &selection, target)?;
            Ok::<_, BranchError>(CloneReport::new(
                &selection,
                &outcome.target_id,
                outcome.counts,
                false,
            ))
        });

        match &result {
            Ok(report) => tracing::info!(
                source_id,
                target_id = %report.target_id,
                nodes = report.counts.total(),
                "clone committed"
            ),
            Err(e) => tracing::warn!(source_id, target_id = %options.target_id, error = %e, "clone rolled back"),
        }
        result
    }

    /// Typed diff of `target_id` against `source_id`
    ///
    /// # Errors
    /// Store failures only
    pub fn diff_typed(&self, source_id: &str, target_id: &str) -> Result<UniverseDiff, BranchError> {
        DiffEngine::new(self.store as &dyn GraphRead).diff_typed(source_id, target_id)
    }

    /// Count-only diff of `target_id` against `source_id`
    ///
    /// # Errors
    /// Store failures only
    pub fn diff(&self, source_id: &str, target_id: &str) -> Result<DiffSummary, BranchError> {
        DiffEngine::new(self.store as &dyn GraphRead).diff(source_id, target_id)
    }

    /// Promote `source_id` into `target_id`
    ///
    /// # Errors
    /// [`BranchError::UnknownStrategy`] if the strategy is not registered;
    /// strategy preconditions, [`BranchError::Cancelled`] or store failures
    pub fn promote(
        &self,
        source_id: &str,
        target_id: &str,
        kind: PromotionStrategyKind,
        dry_run: bool,
    ) -> Result<PromotionReport, BranchError> {
        let strategy = self
            .registry
            .get(kind)
            .ok_or_else(|| BranchError::UnknownStrategy(kind.to_string()))?;
        tracing::info!(source_id, target_id, strategy = %kind, dry_run, "promotion requested");

        if dry_run {
            let plan = strategy.plan(self.store as &dyn GraphRead, source_id, target_id)?;
            return Ok(PromotionReport::new(source_id, target_id, &plan, None));
        }

        let report = self.store.transaction(|tx| {
            let plan = strategy.plan(tx.as_read(), source_id, target_id)?;
            let summary = PromotionReport::new(source_id, target_id, &plan, None);
            let applied = plan.apply(tx, &self.cancel)?;
            Ok::<_, BranchError>(PromotionReport {
                dry_run: false,
                edges_created: applied.edges_created,
                nodes_updated: applied.nodes_updated,
                ..summary
            })
        })?;
        tracing::info!(
            source_id,
            target_id,
            strategy = %kind,
            metric = report.metric,
            edges_created = report.edges_created,
            "promotion committed"
        );
        Ok(report)
    }

    /// Promote by strategy name
    ///
    /// # Errors
    /// [`BranchError::UnknownStrategy`] for unrecognized names; otherwise as
    /// [`Self::promote`]
    pub fn promote_named(
        &self,
        source_id: &str,
        target_id: &str,
        strategy: &str,
        dry_run: bool,
    ) -> Result<PromotionReport, BranchError> {
        self.promote(source_id, target_id, strategy.parse()?, dry_run)
    }
}
