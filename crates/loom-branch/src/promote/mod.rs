//! Promotion: merging one universe's state into another
//!
//! Each strategy reads both universes and produces a [`PromotionPlan`]; the
//! plan is the only thing that writes. Dry runs stop after planning, so the
//! reported metric is the one a real run would apply.

mod append_facts;
mod append_missing;
mod overwrite;
mod registry;
mod strategy;

pub use append_facts::AppendFactsStrategy;
pub use append_missing::AppendMissingStrategy;
pub use overwrite::OverwriteStrategy;
pub use registry::PromotionRegistry;
pub use strategy::{AppliedPromotion, PromotionPlan, PromotionStrategy, PromotionStrategyKind};
