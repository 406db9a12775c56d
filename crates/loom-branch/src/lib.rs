//! Loom Branch
//!
//! Version control for narrative universes stored in a property graph.
//!
//! # Operations
//!
//! - **branch at scene**: copy one story up to a divergence scene into a new universe
//! - **clone full / subset**: copy a whole universe, or a filtered part of it
//! - **diff**: compare two universes by logical id, plus structural lineage
//! - **promote**: merge one universe's state into another by a named strategy
//!
//! Copies live under namespaced ids (`<target>/<id>`, scenes
//! `<target>/<story>/<scene>`) and point back at their originals with
//! `BRANCHED_FROM`. Every mutating operation runs in one store transaction.
//!
//! # Example
//!
//! ```rust,ignore
//! use loom_branch::{Brancher, CloneOptions};
//! use loom_graph::MemoryGraph;
//!
//! let graph = MemoryGraph::new();
//! let brancher = Brancher::new(&graph);
//!
//! let plan = brancher.branch_at_scene("U1", "SC2", &CloneOptions::new("U2").dry_run(true))?;
//! let done = brancher.branch_at_scene("U1", "SC2", &CloneOptions::new("U2"))?;
//! assert_eq!(plan.counts, done.counts);
//!
//! let diff = brancher.diff_typed("U1", "U2")?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cancel;
pub mod cloner;
pub mod config;
pub mod diff;
pub mod error;
pub mod promote;
pub mod remap;
pub mod report;
pub mod selection;
pub mod selector;
pub mod service;
mod walk;

pub use cancel::CancelToken;
pub use cloner::{CloneOutcome, CloneTarget, GraphCloner};
pub use config::BranchConfig;
pub use diff::{DiffEngine, DiffSummary, Presence, ProvenanceCounts, UniverseDiff};
pub use error::BranchError;
pub use promote::{
    AppendFactsStrategy, AppendMissingStrategy, AppliedPromotion, OverwriteStrategy,
    PromotionPlan, PromotionRegistry, PromotionStrategy, PromotionStrategyKind,
};
pub use remap::{remap, remap_scene, unmap};
pub use report::{CloneReport, PromotionReport};
pub use selection::{
    CloneCounts, CloneMode, Divergence, SceneRef, Selection, SelectionFingerprint,
    SelectionRequest, SheetLink, SubsetFilter,
};
pub use selector::Selector;
pub use service::{Brancher, CloneOptions};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
