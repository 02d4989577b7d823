//! Deal Brain Valuation Core
//!
//! The valuation rule engine for second-hand small-form-factor PC
//! listings: given a listing joined with its catalog components, it
//! computes a market-adjusted price with per-component contributions.
//!
//! # Features
//!
//! - **Condition Trees**: nested AND/OR conditions over dotted field
//!   paths, with a complete per-leaf trace
//! - **Typed Actions**: fixed offsets, per-unit scaling over a closed
//!   metric registry, percentage deltas, benchmark-scaled deltas and
//!   sandboxed formulas
//! - **Rulesets**: priority-ordered groups with category weights,
//!   exclusive rules and per-listing overrides
//! - **Baseline Hydration**: compact metadata rules materialized into
//!   executable rules, idempotently
//!
//! # Example
//!
//! ```rust
//! use dealbrain_core::prelude::*;
//!
//! let ruleset = Ruleset::new(1, "default").with_group(
//!     RuleGroup::new(1, "RAM", "ram")
//!         .with_rule(Rule::new(1, "ram value").with_action(Action::per_unit("ram_gb", -2.5))),
//! );
//!
//! let ctx = EvaluationContext::from_json(
//!     r#"{"listing": {"base_price": 500.0, "condition": "used",
//!         "ram": {"total_capacity_gb": 16}}}"#,
//! )
//! .unwrap();
//!
//! let engine = ValuationEngine::new();
//! let breakdown = engine.evaluate(&ctx, &ruleset, &ListingOverrides::default());
//! assert_eq!(breakdown.adjusted_price, 460.0);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod breakdown;
pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod formula;
pub mod rule;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::breakdown::{
        ActionOutput, AppliedRuleRecord, Breakdown, ConditionTrace, GroupBreakdown, RuleState,
        RulesetRef,
    };
    pub use crate::catalog::{
        Cpu, Gpu, Listing, ListingCondition, Port, PortsProfile, RamSpec, StorageMedium,
        StorageProfile,
    };
    pub use crate::config::{EngineConfig, FormulaLimits};
    pub use crate::context::{EvaluationContext, Value};
    pub use crate::error::{Result, ValuationError};
    pub use crate::formula::{FormulaError, FormulaEvaluator, FormulaParser};
    pub use crate::rule::{
        hydrate_ruleset, select_ruleset, Action, ActionEvaluator, ActionKind,
        BaselineFieldMetadata, BaselineFieldType, ConditionEvaluator, ConditionMultipliers,
        ConditionNode, ConditionOperator, HydrationResult, ListingOverride, ListingOverrides,
        LogicalOp, MetricRegistry, OverrideAction, PercentBase, Rule, RuleGroup, RuleMetadata,
        Ruleset, ValuationEngine,
    };
}

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name
pub const NAME: &str = "dealbrain-core";
