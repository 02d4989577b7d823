//! Baseline hydrator
//!
//! Baselines are compact metadata rules ("condition: new x1.00, refurb
//! x0.75, used x0.60") living in a placeholder rule's metadata. The
//! hydrator materializes them into executable rules so they can be
//! edited individually in advanced mode. Hydration is idempotent:
//! children carry lineage back to their placeholder, and a placeholder
//! with a live child generation is left alone.

use super::action::{Action, ActionKind, PercentBase};
use super::condition::ConditionNode;
use super::metrics::MetricRegistry;
use super::model::{Rule, RuleMetadata, Ruleset};
use crate::error::{Result, ValuationError};
use crate::formula::FormulaParser;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Baseline strategy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineFieldType {
    /// One fixed-value rule
    Scalar,
    /// One percentage rule per enum bucket
    Multiplier,
    /// One always-matching formula rule
    Formula,
}

/// Compact baseline descriptor
///
/// `default_value` tolerates the legacy `Default`/`value`/`Value` keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineFieldMetadata {
    /// Owning entity, e.g. "listing"
    pub entity_key: String,

    /// Dotted context path the baseline keys on, e.g. "listing.condition"
    pub field_id: String,

    pub field_type: BaselineFieldType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// Bucket key -> multiplier; null multipliers are skipped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valuation_buckets: Option<BTreeMap<String, Option<f64>>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula_text: Option<String>,

    #[serde(
        default,
        alias = "Default",
        alias = "value",
        alias = "Value",
        skip_serializing_if = "Option::is_none"
    )]
    pub default_value: Option<f64>,
}

/// Rules created per strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HydrationCounts {
    pub scalar: usize,
    pub multiplier: usize,
    pub formula: usize,
}

impl HydrationCounts {
    /// Total rules created
    pub fn total(&self) -> usize {
        self.scalar + self.multiplier + self.formula
    }
}

/// Per-baseline hydration failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydrationFailure {
    pub rule_id: i64,
    pub error: String,
}

/// Outcome of hydrating a ruleset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HydrationResult {
    pub ruleset_id: i64,

    /// Rules created, by strategy
    pub created: HydrationCounts,

    /// Placeholders skipped because a live child generation exists
    pub skipped: usize,

    /// Stale children deactivated ahead of a new generation
    pub deactivated_children: usize,

    pub failed: Vec<HydrationFailure>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl HydrationResult {
    /// Whether the run changed nothing
    pub fn is_noop(&self) -> bool {
        self.created.total() == 0 && self.deactivated_children == 0 && self.failed.is_empty()
    }
}

/// Hydrate every baseline placeholder in a ruleset
///
/// `next_rule_id` allocates ids for the created rules. Placeholders
/// whose current version already has at least one active child are
/// skipped; a version bump deactivates the prior generation first.
/// After hydration the placeholder itself is deactivated but retained
/// for lineage.
pub fn hydrate_ruleset(
    ruleset: &mut Ruleset,
    mut next_rule_id: impl FnMut() -> i64,
) -> HydrationResult {
    let mut result = HydrationResult {
        ruleset_id: ruleset.id,
        ..HydrationResult::default()
    };
    let metrics = MetricRegistry::new();

    for group in &mut ruleset.groups {
        let placeholders: Vec<(i64, u32, BaselineFieldMetadata, String)> = group
            .rules
            .iter()
            .filter(|r| r.is_baseline_placeholder())
            .filter_map(|r| {
                r.metadata
                    .baseline
                    .clone()
                    .map(|b| (r.id, r.version, b, r.name.clone()))
            })
            .collect();

        for (placeholder_id, version, baseline, name) in placeholders {
            let has_live_children = group.rules.iter().any(|r| {
                r.is_active
                    && r.metadata.hydration_source_rule_id == Some(placeholder_id)
                    && r.metadata.hydration_source_version == Some(version)
            });
            if has_live_children {
                debug!(rule_id = placeholder_id, "baseline already hydrated");
                result.skipped += 1;
                continue;
            }

            // A version bump replaces the prior generation
            for rule in group.rules.iter_mut() {
                if rule.is_active
                    && rule.metadata.hydration_source_rule_id == Some(placeholder_id)
                {
                    rule.is_active = false;
                    result.deactivated_children += 1;
                }
            }

            match build_rules(
                placeholder_id,
                version,
                &name,
                &baseline,
                &metrics,
                &mut next_rule_id,
                &mut result.warnings,
            ) {
                Ok(rules) => {
                    match baseline.field_type {
                        BaselineFieldType::Scalar => result.created.scalar += rules.len(),
                        BaselineFieldType::Multiplier => result.created.multiplier += rules.len(),
                        BaselineFieldType::Formula => result.created.formula += rules.len(),
                    }
                    group.rules.extend(rules);
                    if let Some(placeholder) =
                        group.rules.iter_mut().find(|r| r.id == placeholder_id)
                    {
                        placeholder.is_active = false;
                    }
                }
                Err(err) => {
                    warn!(rule_id = placeholder_id, error = %err, "hydration failed");
                    result.failed.push(HydrationFailure {
                        rule_id: placeholder_id,
                        error: err.to_string(),
                    });
                }
            }
        }
    }

    result
}

fn build_rules(
    placeholder_id: i64,
    version: u32,
    name: &str,
    baseline: &BaselineFieldMetadata,
    metrics: &MetricRegistry,
    next_rule_id: &mut impl FnMut() -> i64,
    warnings: &mut Vec<String>,
) -> Result<Vec<Rule>> {
    let lineage = RuleMetadata {
        hydration_source_rule_id: Some(placeholder_id),
        hydration_source_version: Some(version),
        ..RuleMetadata::default()
    };

    match baseline.field_type {
        BaselineFieldType::Multiplier => {
            let buckets = baseline.valuation_buckets.as_ref().ok_or_else(|| {
                ValuationError::hydration(placeholder_id, "multiplier baseline without buckets")
            })?;

            let mut rules = Vec::new();
            for (bucket_key, multiplier) in buckets {
                let Some(multiplier) = multiplier else {
                    warn!(
                        rule_id = placeholder_id,
                        bucket = %bucket_key,
                        "skipping bucket with null multiplier"
                    );
                    warnings.push(format!(
                        "baseline {}: bucket '{}' has no multiplier",
                        placeholder_id, bucket_key
                    ));
                    continue;
                };

                let mut rule = Rule::new(next_rule_id(), format!("{} [{}]", name, bucket_key))
                    .with_condition(ConditionNode::equals(
                        baseline.field_id.clone(),
                        bucket_key.as_str(),
                    ))
                    .with_action(Action::percentage(
                        (multiplier - 1.0) * 100.0,
                        PercentBase::RunningSubtotal,
                    ));
                rule.metadata = lineage.clone();
                rules.push(rule);
            }
            Ok(rules)
        }

        BaselineFieldType::Formula => {
            let expression = baseline.formula_text.as_ref().ok_or_else(|| {
                ValuationError::hydration(placeholder_id, "formula baseline without formula_text")
            })?;

            let rule = match FormulaParser::parse(expression) {
                Ok(expr) => {
                    // Bind identifiers to their canonical metric paths;
                    // unrecognized names fall back to listing fields
                    let mut variables = HashMap::new();
                    for ident in expr.identifiers() {
                        let path = metrics
                            .path(ident)
                            .map(str::to_string)
                            .unwrap_or_else(|| format!("listing.{}", ident));
                        variables.insert(ident.to_string(), path);
                    }

                    let mut rule = Rule::new(next_rule_id(), name.to_string()).with_action(
                        Action::new(ActionKind::Formula {
                            expression: expression.clone(),
                            variables,
                        }),
                    );
                    rule.metadata = lineage.clone();
                    rule
                }
                Err(err) => {
                    warn!(rule_id = placeholder_id, error = %err, "formula baseline fell back to fixed value");
                    let mut rule = Rule::new(next_rule_id(), name.to_string())
                        .with_action(Action::fixed(baseline.default_value.unwrap_or(0.0)));
                    rule.metadata = lineage.clone();
                    rule.metadata
                        .annotations
                        .push(format!("formula rejected: {}", err));
                    rule
                }
            };
            Ok(vec![rule])
        }

        BaselineFieldType::Scalar => {
            let mut rule = Rule::new(next_rule_id(), name.to_string())
                .with_action(Action::fixed(baseline.default_value.unwrap_or(0.0)));
            rule.metadata = lineage;
            Ok(vec![rule])
        }
    }
}
