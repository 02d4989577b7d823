//! Rule system module
//!
//! Everything between a stored ruleset and a breakdown: condition
//! trees, action evaluation, the metric registry, the rule/ruleset
//! models, the orchestrating engine and the baseline hydrator.

mod action;
mod baseline;
mod condition;
mod engine;
mod metrics;
mod model;

pub use action::{Action, ActionEvaluator, ActionKind, ConditionMultipliers, PercentBase};
pub use baseline::{
    hydrate_ruleset, BaselineFieldMetadata, BaselineFieldType, HydrationCounts, HydrationFailure,
    HydrationResult,
};
pub use condition::{
    ConditionEvaluator, ConditionNode, ConditionOperator, ConditionOutcome, LogicalOp,
};
pub use engine::{select_ruleset, ValuationEngine, SKIP_EXCLUSIVE, SKIP_OVERRIDE_DISABLED};
pub use metrics::MetricRegistry;
pub use model::{
    ListingOverride, ListingOverrides, OverrideAction, Rule, RuleGroup, RuleMetadata, Ruleset,
};
