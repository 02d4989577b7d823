//! Action evaluator
//!
//! Computes signed adjustment deltas for a matched rule's actions, in
//! declared order, each scaled by the listing-condition multiplier.
//! Data problems (unknown metric, formula failure, zero benchmark
//! reference) produce a zero delta plus a note, never an error: a
//! matched rule always reports.

use super::metrics::MetricRegistry;
use crate::breakdown::ActionOutput;
use crate::catalog::ListingCondition;
use crate::config::FormulaLimits;
use crate::context::{EvaluationContext, Value};
use crate::formula::FormulaEvaluator;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;
use tracing::warn;

/// Multipliers applied to an action's raw output by listing condition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConditionMultipliers {
    #[serde(default = "default_multiplier")]
    pub new: f64,
    #[serde(default = "default_multiplier")]
    pub refurb: f64,
    #[serde(default = "default_multiplier")]
    pub used: f64,
}

fn default_multiplier() -> f64 {
    1.0
}

impl Default for ConditionMultipliers {
    fn default() -> Self {
        Self {
            new: 1.0,
            refurb: 1.0,
            used: 1.0,
        }
    }
}

impl ConditionMultipliers {
    /// Select the multiplier for a condition; unknown condition is 1.0
    pub fn for_condition(&self, condition: Option<ListingCondition>) -> f64 {
        match condition {
            Some(ListingCondition::New) => self.new,
            Some(ListingCondition::Refurb) => self.refurb,
            Some(ListingCondition::Used) => self.used,
            None => 1.0,
        }
    }
}

/// Base a percentage action applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PercentBase {
    /// The immutable listing base price
    BasePrice,
    /// `base_price + Σ prior deltas` within the current group
    RunningSubtotal,
}

/// Typed delta generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionKind {
    /// Constant delta
    FixedValue { amount: f64 },

    /// `resolve(metric) * unit_value`
    PerUnit { metric: String, unit_value: f64 },

    /// Percentage of the base price or the running subtotal
    Percentage { pct: f64, of: PercentBase },

    /// `(resolve(benchmark) / reference_value) * scale`
    BenchmarkBased {
        benchmark: String,
        reference_value: f64,
        scale: f64,
    },

    /// Sandboxed formula over named context variables
    Formula {
        expression: String,
        /// Variable name -> context field path
        #[serde(default)]
        variables: HashMap<String, String>,
    },
}

impl ActionKind {
    /// Serialized tag of this kind
    pub fn tag(&self) -> &'static str {
        match self {
            Self::FixedValue { .. } => "fixed_value",
            Self::PerUnit { .. } => "per_unit",
            Self::Percentage { .. } => "percentage",
            Self::BenchmarkBased { .. } => "benchmark_based",
            Self::Formula { .. } => "formula",
        }
    }
}

/// An action with its optional condition multipliers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(flatten)]
    pub kind: ActionKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_multipliers: Option<ConditionMultipliers>,
}

impl Action {
    /// Create an action with default (1.0) multipliers
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            condition_multipliers: None,
        }
    }

    /// Create a fixed-value action
    pub fn fixed(amount: f64) -> Self {
        Self::new(ActionKind::FixedValue { amount })
    }

    /// Create a per-unit action
    pub fn per_unit(metric: impl Into<String>, unit_value: f64) -> Self {
        Self::new(ActionKind::PerUnit {
            metric: metric.into(),
            unit_value,
        })
    }

    /// Create a percentage action
    pub fn percentage(pct: f64, of: PercentBase) -> Self {
        Self::new(ActionKind::Percentage { pct, of })
    }

    /// Attach condition multipliers
    pub fn with_multipliers(mut self, multipliers: ConditionMultipliers) -> Self {
        self.condition_multipliers = Some(multipliers);
        self
    }
}

/// Action evaluator
pub struct ActionEvaluator {
    metrics: MetricRegistry,
    formulas: FormulaEvaluator,
}

impl Default for ActionEvaluator {
    fn default() -> Self {
        Self::new(FormulaLimits::default())
    }
}

impl ActionEvaluator {
    /// Create an evaluator with the given formula limits
    pub fn new(limits: FormulaLimits) -> Self {
        Self {
            metrics: MetricRegistry::new(),
            formulas: FormulaEvaluator::new(limits),
        }
    }

    /// The metric registry
    pub fn metrics(&self) -> &MetricRegistry {
        &self.metrics
    }

    /// The formula evaluator
    pub fn formulas(&self) -> &FormulaEvaluator {
        &self.formulas
    }

    /// Evaluate a rule's actions in declared order
    ///
    /// `running_subtotal` evolves as `base_price + Σ prior deltas`
    /// within the current group; percentage actions over it are
    /// order-sensitive. Returns the outputs and the rule's total
    /// contribution.
    pub fn evaluate_actions(
        &self,
        ctx: &EvaluationContext,
        actions: &[Action],
        condition: Option<ListingCondition>,
        base_price: f64,
        running_subtotal: &mut f64,
    ) -> (SmallVec<[ActionOutput; 2]>, f64) {
        let mut outputs = SmallVec::new();
        let mut total = 0.0;

        for action in actions {
            let output = self.evaluate_action(ctx, action, condition, base_price, *running_subtotal);
            *running_subtotal += output.delta;
            total += output.delta;
            outputs.push(output);
        }

        (outputs, total)
    }

    /// Evaluate a single action
    pub fn evaluate_action(
        &self,
        ctx: &EvaluationContext,
        action: &Action,
        condition: Option<ListingCondition>,
        base_price: f64,
        running_subtotal: f64,
    ) -> ActionOutput {
        let multiplier = action
            .condition_multipliers
            .unwrap_or_default()
            .for_condition(condition);
        let tag = action.kind.tag();

        match &action.kind {
            ActionKind::FixedValue { amount } => ActionOutput::new(tag, *amount, multiplier),

            ActionKind::PerUnit { metric, unit_value } => {
                match self.resolve_metric(metric, ctx) {
                    Ok(quantity) => ActionOutput::new(tag, quantity * unit_value, multiplier),
                    Err(note) => ActionOutput::new(tag, 0.0, multiplier).with_note(note),
                }
            }

            ActionKind::Percentage { pct, of } => {
                let base = match of {
                    PercentBase::BasePrice => base_price,
                    PercentBase::RunningSubtotal => running_subtotal,
                };
                ActionOutput::new(tag, base * pct / 100.0, multiplier)
            }

            ActionKind::BenchmarkBased {
                benchmark,
                reference_value,
                scale,
            } => match self.resolve_metric(benchmark, ctx) {
                Ok(_) if *reference_value == 0.0 => ActionOutput::new(tag, 0.0, multiplier)
                    .with_note(format!("zero reference value for '{}'", benchmark)),
                Ok(value) => {
                    ActionOutput::new(tag, value / reference_value * scale, multiplier)
                }
                Err(note) => ActionOutput::new(tag, 0.0, multiplier).with_note(note),
            },

            ActionKind::Formula {
                expression,
                variables,
            } => {
                let mut bound: HashMap<String, Value> = HashMap::new();
                for (name, path) in variables {
                    if let Some(value) = ctx.get(path) {
                        bound.insert(name.clone(), value.clone());
                    }
                    // Missing paths stay unbound; the sandbox reports
                    // an undefined-variable error below
                }

                match self.formulas.evaluate(expression, &bound) {
                    Ok(value) => ActionOutput::new(tag, value, multiplier),
                    Err(err) => {
                        warn!(expression = %expression, error = %err, "formula action failed");
                        ActionOutput::new(tag, 0.0, multiplier).with_note(err.to_string())
                    }
                }
            }
        }
    }

    fn resolve_metric(&self, name: &str, ctx: &EvaluationContext) -> Result<f64, String> {
        if !self.metrics.contains(name) {
            warn!(metric = %name, "unknown per-unit metric");
            return Err(format!("unknown metric '{}'", name));
        }
        match self.metrics.resolve(name, ctx) {
            Some(value) => Ok(value),
            None => Err(format!("metric '{}' unavailable for this listing", name)),
        }
    }
}
