//! Deal Brain Valuation Coordinator
//!
//! The orchestration layer around the core rule engine: an in-memory
//! entity store, evaluation-context assembly from eagerly joined
//! catalog rows, single-listing recompute with denormalized-field
//! persistence, draft-rule preview, and the background bulk-recompute
//! queue with scope coalescing.
//!
//! # Example
//!
//! ```rust,no_run
//! use dealbrain_coordinator::prelude::*;
//! use dealbrain_core::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn demo() -> dealbrain_coordinator::error::Result<()> {
//! let store = Arc::new(Store::new());
//! store.upsert_ruleset(Ruleset::new(1, "default"));
//! store.upsert_listing(Listing::new(1, "EliteDesk", 450.0, ListingCondition::Used));
//!
//! let coordinator = ValuationCoordinator::new(store);
//! let breakdown = coordinator.recompute_listing(1).await?;
//! println!("adjusted: {}", breakdown.adjusted_price);
//! # Ok(())
//! # }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod jobs;
pub mod store;

mod hydration;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::CoordinatorConfig;
    pub use crate::context::{build_context, AssembledContext};
    pub use crate::coordinator::{
        PreviewReport, PreviewResult, RecomputeOutcome, RuleDraft, Scorer, ValuationCoordinator,
    };
    pub use crate::error::{CoordinatorError, Result};
    pub use crate::jobs::{JobStatus, ProgressSnapshot, RecomputeJob, RecomputeScope};
    pub use crate::store::{CatalogRef, Store};
}

/// Coordinator version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
