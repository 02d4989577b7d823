//! Rule engine
//!
//! Orchestrates the condition and action evaluators across a ruleset's
//! groups and rules: groups in display order, rules by ascending
//! priority, exclusive short-circuit within a group, override merge,
//! category weighting at the group level, and the clamped adjusted
//! price. Evaluation is total: every call returns a breakdown, with
//! failures captured as per-rule skip reasons.

use super::action::{ActionEvaluator, ConditionMultipliers};
use super::condition::ConditionEvaluator;
use super::model::{ListingOverrides, OverrideAction, Rule, Ruleset};
use crate::breakdown::{
    ActionOutput, AppliedRuleRecord, Breakdown, GroupBreakdown, RuleState, RulesetRef,
};
use crate::catalog::ListingCondition;
use crate::config::EngineConfig;
use crate::context::EvaluationContext;
use smallvec::SmallVec;
use tracing::debug;

/// Skip reason recorded on rules behind a matched exclusive rule
pub const SKIP_EXCLUSIVE: &str = "exclusive_shortcircuit";

/// Skip reason recorded on disabled-by-override rules
pub const SKIP_OVERRIDE_DISABLED: &str = "override_disabled";

/// The valuation rule engine
pub struct ValuationEngine {
    conditions: ConditionEvaluator,
    actions: ActionEvaluator,
}

impl Default for ValuationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ValuationEngine {
    /// Create an engine with default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with the given configuration
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            conditions: ConditionEvaluator::new(config.max_condition_depth),
            actions: ActionEvaluator::new(config.formula),
        }
    }

    /// Evaluate a listing context against a ruleset
    pub fn evaluate(
        &self,
        ctx: &EvaluationContext,
        ruleset: &Ruleset,
        overrides: &ListingOverrides,
    ) -> Breakdown {
        let base_price = ctx.base_price();
        let condition = ctx.listing_condition();

        let mut groups = Vec::with_capacity(ruleset.groups.len());
        let mut total_delta = 0.0;

        for group in ruleset.sorted_groups() {
            let weight = ruleset.effective_weight(group);

            // The running subtotal resets per group
            let mut running_subtotal = base_price;
            let mut records: Vec<AppliedRuleRecord> = Vec::new();
            let mut exclusive_fired = false;

            for rule in group.sorted_rules() {
                if !rule.is_active {
                    continue;
                }

                if exclusive_fired {
                    records.push(AppliedRuleRecord::skipped(
                        rule.id,
                        &rule.name,
                        RuleState::NotMatched,
                        SKIP_EXCLUSIVE,
                    ));
                    continue;
                }

                let record = self.evaluate_rule(
                    ctx,
                    rule,
                    overrides.get(rule.id),
                    condition,
                    base_price,
                    &mut running_subtotal,
                );
                debug!(
                    rule_id = rule.id,
                    state = ?record.state,
                    contribution = record.contribution,
                    "rule evaluated"
                );

                if rule.is_exclusive && record.state.contributes() {
                    exclusive_fired = true;
                }
                records.push(record);
            }

            let contribution: f64 = records.iter().map(|r| r.contribution).sum();
            let weighted_contribution = contribution * weight;
            for record in &mut records {
                record.weighted_contribution = record.contribution * weight;
            }

            total_delta += weighted_contribution;
            groups.push(GroupBreakdown {
                name: group.name.clone(),
                category: group.category.clone(),
                weight_applied: weight,
                rules: records,
                contribution,
                weighted_contribution,
            });
        }

        Breakdown {
            ruleset: RulesetRef {
                id: ruleset.id,
                name: ruleset.name.clone(),
            },
            base_price,
            adjusted_price: (base_price + total_delta).max(0.0),
            total_delta,
            groups,
            has_integrity_warning: false,
        }
    }

    /// Per-rule state machine
    ///
    /// `pending -> {matched, not_matched, overridden_enable,
    /// overridden_disable, overridden_replace, error}`; only the
    /// terminal states `matched`, `overridden_enable` and
    /// `overridden_replace` yield action evaluation.
    fn evaluate_rule(
        &self,
        ctx: &EvaluationContext,
        rule: &Rule,
        override_action: Option<&OverrideAction>,
        condition: Option<ListingCondition>,
        base_price: f64,
        running_subtotal: &mut f64,
    ) -> AppliedRuleRecord {
        match override_action {
            Some(OverrideAction::Disable) => AppliedRuleRecord::skipped(
                rule.id,
                &rule.name,
                RuleState::OverriddenDisable,
                SKIP_OVERRIDE_DISABLED,
            ),

            Some(OverrideAction::ReplaceWithFixed {
                amount,
                condition_multipliers,
            }) => {
                let multiplier = condition_multipliers
                    .unwrap_or_else(ConditionMultipliers::default)
                    .for_condition(condition);
                let output = ActionOutput::new("fixed_value", *amount, multiplier);
                let delta = output.delta;
                *running_subtotal += delta;

                AppliedRuleRecord {
                    rule_id: rule.id,
                    rule_name: rule.name.clone(),
                    state: RuleState::OverriddenReplace,
                    matched_conditions: Vec::new(),
                    actions: SmallVec::from_elem(output, 1),
                    contribution: delta,
                    weighted_contribution: delta,
                    skipped_reason: None,
                }
            }

            // Force-enable bypasses the condition evaluator: matched
            // with an empty trace
            Some(OverrideAction::ForceEnable) => self.run_actions(
                ctx,
                rule,
                RuleState::OverriddenEnable,
                Vec::new(),
                condition,
                base_price,
                running_subtotal,
            ),

            None => match self.conditions.evaluate(ctx, rule.condition.as_ref()) {
                Err(err) => AppliedRuleRecord::skipped(
                    rule.id,
                    &rule.name,
                    RuleState::Error,
                    &err.to_string(),
                ),
                Ok(outcome) if !outcome.matched => AppliedRuleRecord {
                    rule_id: rule.id,
                    rule_name: rule.name.clone(),
                    state: RuleState::NotMatched,
                    matched_conditions: outcome.trace,
                    actions: SmallVec::new(),
                    contribution: 0.0,
                    weighted_contribution: 0.0,
                    skipped_reason: None,
                },
                Ok(outcome) => self.run_actions(
                    ctx,
                    rule,
                    RuleState::Matched,
                    outcome.trace,
                    condition,
                    base_price,
                    running_subtotal,
                ),
            },
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn run_actions(
        &self,
        ctx: &EvaluationContext,
        rule: &Rule,
        state: RuleState,
        trace: Vec<crate::breakdown::ConditionTrace>,
        condition: Option<ListingCondition>,
        base_price: f64,
        running_subtotal: &mut f64,
    ) -> AppliedRuleRecord {
        let (actions, contribution) = self.actions.evaluate_actions(
            ctx,
            &rule.actions,
            condition,
            base_price,
            running_subtotal,
        );

        AppliedRuleRecord {
            rule_id: rule.id,
            rule_name: rule.name.clone(),
            state,
            matched_conditions: trace,
            actions,
            contribution,
            weighted_contribution: contribution,
            skipped_reason: None,
        }
    }
}

/// Pick the ruleset for a listing without an explicit pin
///
/// Active rulesets in decreasing priority, ties broken by lower id.
pub fn select_ruleset<'a, I>(rulesets: I) -> Option<&'a Ruleset>
where
    I: IntoIterator<Item = &'a Ruleset>,
{
    rulesets
        .into_iter()
        .filter(|rs| rs.is_active)
        .min_by_key(|rs| (std::cmp::Reverse(rs.priority), rs.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::action::{Action, ActionKind, PercentBase};
    use crate::rule::condition::ConditionNode;
    use crate::rule::model::{ListingOverride, RuleGroup};
    use std::collections::HashMap;

    fn ctx(base_price: f64, condition: &str) -> EvaluationContext {
        EvaluationContext::from_json(&format!(
            r#"{{"listing": {{"base_price": {}, "condition": "{}",
                 "cpu": {{"cpu_mark_multi": 25000}},
                 "ram": {{"total_capacity_gb": 16}}}}}}"#,
            base_price, condition
        ))
        .unwrap()
    }

    fn no_overrides() -> ListingOverrides {
        ListingOverrides::default()
    }

    #[test]
    fn test_condition_multiplier_on_fixed_deduction() {
        // Scenario: base 1000 refurb, fixed -200 with refurb x0.75
        let ruleset = Ruleset::new(1, "default").with_group(
            RuleGroup::new(1, "Condition", "condition").with_rule(
                Rule::new(1, "condition deduction").with_action(
                    Action::fixed(-200.0).with_multipliers(ConditionMultipliers {
                        new: 1.0,
                        refurb: 0.75,
                        used: 0.5,
                    }),
                ),
            ),
        );

        let breakdown =
            ValuationEngine::new().evaluate(&ctx(1000.0, "refurb"), &ruleset, &no_overrides());

        assert_eq!(breakdown.total_delta, -150.0);
        assert_eq!(breakdown.adjusted_price, 850.0);
        assert_eq!(breakdown.groups[0].rules[0].state, RuleState::Matched);
    }

    #[test]
    fn test_per_unit_group_weighted() {
        // Scenario: base 500, 16 GB RAM, group weight 0.5, -2.5/GB
        let ruleset = Ruleset::new(1, "default").with_group(
            RuleGroup::new(1, "RAM", "ram")
                .with_weight(0.5)
                .with_rule(Rule::new(1, "ram").with_action(Action::per_unit("ram_gb", -2.5))),
        );

        let breakdown =
            ValuationEngine::new().evaluate(&ctx(500.0, "used"), &ruleset, &no_overrides());

        let rule = &breakdown.groups[0].rules[0];
        assert_eq!(rule.contribution, -40.0);
        assert_eq!(rule.weighted_contribution, -20.0);
        assert_eq!(breakdown.groups[0].weight_applied, 0.5);
        assert_eq!(breakdown.total_delta, -20.0);
        assert_eq!(breakdown.adjusted_price, 480.0);
    }

    #[test]
    fn test_category_weight_fallback() {
        let ruleset = Ruleset::new(1, "default")
            .with_category_weight("ram", 0.5)
            .with_group(
                RuleGroup::new(1, "RAM", "ram")
                    .with_rule(Rule::new(1, "ram").with_action(Action::per_unit("ram_gb", -2.5))),
            );

        let breakdown =
            ValuationEngine::new().evaluate(&ctx(500.0, "used"), &ruleset, &no_overrides());
        assert_eq!(breakdown.adjusted_price, 480.0);
    }

    #[test]
    fn test_exclusive_short_circuit() {
        // Scenario: priorities 10 (exclusive, -50) and 20 (-30)
        let ruleset = Ruleset::new(1, "default").with_group(
            RuleGroup::new(1, "CPU", "cpu")
                .with_rule(
                    Rule::new(1, "first")
                        .with_priority(10)
                        .exclusive()
                        .with_action(Action::fixed(-50.0)),
                )
                .with_rule(
                    Rule::new(2, "second")
                        .with_priority(20)
                        .with_action(Action::fixed(-30.0)),
                ),
        );

        let breakdown =
            ValuationEngine::new().evaluate(&ctx(1000.0, "used"), &ruleset, &no_overrides());

        assert_eq!(breakdown.total_delta, -50.0);
        let skipped = &breakdown.groups[0].rules[1];
        assert_eq!(skipped.skipped_reason.as_deref(), Some(SKIP_EXCLUSIVE));
        assert_eq!(skipped.contribution, 0.0);
    }

    #[test]
    fn test_exclusive_does_not_cross_groups() {
        let ruleset = Ruleset::new(1, "default")
            .with_group(
                RuleGroup::new(1, "A", "a").with_display_order(1).with_rule(
                    Rule::new(1, "excl").exclusive().with_action(Action::fixed(-50.0)),
                ),
            )
            .with_group(
                RuleGroup::new(2, "B", "b")
                    .with_display_order(2)
                    .with_rule(Rule::new(2, "other").with_action(Action::fixed(-30.0))),
            );

        let breakdown =
            ValuationEngine::new().evaluate(&ctx(1000.0, "used"), &ruleset, &no_overrides());
        assert_eq!(breakdown.total_delta, -80.0);
    }

    #[test]
    fn test_non_matching_exclusive_does_not_fire() {
        let ruleset = Ruleset::new(1, "default").with_group(
            RuleGroup::new(1, "CPU", "cpu")
                .with_rule(
                    Rule::new(1, "never")
                        .with_priority(10)
                        .exclusive()
                        .with_condition(ConditionNode::equals("listing.condition", "new"))
                        .with_action(Action::fixed(-50.0)),
                )
                .with_rule(
                    Rule::new(2, "applies")
                        .with_priority(20)
                        .with_action(Action::fixed(-30.0)),
                ),
        );

        let breakdown =
            ValuationEngine::new().evaluate(&ctx(1000.0, "used"), &ruleset, &no_overrides());
        assert_eq!(breakdown.total_delta, -30.0);
    }

    #[test]
    fn test_override_replace_with_fixed() {
        // Scenario: native action -250, override replaces with -100
        let ruleset = Ruleset::new(1, "default").with_group(
            RuleGroup::new(1, "CPU", "cpu").with_rule(
                Rule::new(7, "native")
                    .with_condition(ConditionNode::equals("listing.condition", "new"))
                    .with_action(Action::fixed(-250.0)),
            ),
        );
        let overrides = ListingOverrides::from_iter(&[ListingOverride {
            listing_id: 1,
            rule_id: 7,
            action: OverrideAction::ReplaceWithFixed {
                amount: -100.0,
                condition_multipliers: None,
            },
        }]);

        // The rule's own condition (new) would not match this used
        // listing; the replacement applies regardless
        let breakdown = ValuationEngine::new().evaluate(&ctx(1000.0, "used"), &ruleset, &overrides);

        let rule = &breakdown.groups[0].rules[0];
        assert_eq!(rule.state, RuleState::OverriddenReplace);
        assert_eq!(rule.contribution, -100.0);
        assert_eq!(breakdown.adjusted_price, 900.0);
    }

    #[test]
    fn test_override_replace_uses_own_multipliers() {
        let ruleset = Ruleset::new(1, "default").with_group(
            RuleGroup::new(1, "CPU", "cpu")
                .with_rule(Rule::new(7, "native").with_action(Action::fixed(-250.0))),
        );
        let overrides = ListingOverrides::from_iter(&[ListingOverride {
            listing_id: 1,
            rule_id: 7,
            action: OverrideAction::ReplaceWithFixed {
                amount: -100.0,
                condition_multipliers: Some(ConditionMultipliers {
                    new: 1.0,
                    refurb: 1.0,
                    used: 0.5,
                }),
            },
        }]);

        let breakdown = ValuationEngine::new().evaluate(&ctx(1000.0, "used"), &ruleset, &overrides);
        assert_eq!(breakdown.groups[0].rules[0].contribution, -50.0);
    }

    #[test]
    fn test_override_disable_equals_rule_removal() {
        let rule = Rule::new(7, "deduct").with_action(Action::fixed(-250.0));
        let with_rule = Ruleset::new(1, "default").with_group(
            RuleGroup::new(1, "CPU", "cpu")
                .with_rule(rule)
                .with_rule(Rule::new(8, "other").with_action(Action::fixed(-10.0))),
        );
        let without_rule = Ruleset::new(1, "default").with_group(
            RuleGroup::new(1, "CPU", "cpu")
                .with_rule(Rule::new(8, "other").with_action(Action::fixed(-10.0))),
        );

        let overrides = ListingOverrides::from_iter(&[ListingOverride {
            listing_id: 1,
            rule_id: 7,
            action: OverrideAction::Disable,
        }]);

        let engine = ValuationEngine::new();
        let disabled = engine.evaluate(&ctx(1000.0, "used"), &with_rule, &overrides);
        let removed = engine.evaluate(&ctx(1000.0, "used"), &without_rule, &no_overrides());

        assert_eq!(disabled.total_delta, removed.total_delta);
        assert_eq!(disabled.adjusted_price, removed.adjusted_price);
        let record = &disabled.groups[0].rules[0];
        assert_eq!(record.state, RuleState::OverriddenDisable);
        assert_eq!(
            record.skipped_reason.as_deref(),
            Some(SKIP_OVERRIDE_DISABLED)
        );
    }

    #[test]
    fn test_force_enable_bypasses_conditions() {
        let ruleset = Ruleset::new(1, "default").with_group(
            RuleGroup::new(1, "CPU", "cpu").with_rule(
                Rule::new(7, "gated")
                    .with_condition(ConditionNode::equals("listing.condition", "new"))
                    .with_action(Action::fixed(-40.0)),
            ),
        );
        let overrides = ListingOverrides::from_iter(&[ListingOverride {
            listing_id: 1,
            rule_id: 7,
            action: OverrideAction::ForceEnable,
        }]);

        let breakdown = ValuationEngine::new().evaluate(&ctx(1000.0, "used"), &ruleset, &overrides);
        let rule = &breakdown.groups[0].rules[0];
        assert_eq!(rule.state, RuleState::OverriddenEnable);
        assert!(rule.matched_conditions.is_empty());
        assert_eq!(rule.contribution, -40.0);
    }

    #[test]
    fn test_malformed_condition_skips_rule_only() {
        let ruleset = Ruleset::new(1, "default").with_group(
            RuleGroup::new(1, "CPU", "cpu")
                .with_rule(
                    Rule::new(1, "bad").with_condition(ConditionNode::leaf(
                        "listing.condition",
                        crate::rule::condition::ConditionOperator::In,
                        "not-a-sequence",
                    )),
                )
                .with_rule(Rule::new(2, "good").with_action(Action::fixed(-25.0))),
        );

        let breakdown =
            ValuationEngine::new().evaluate(&ctx(1000.0, "used"), &ruleset, &no_overrides());

        let bad = &breakdown.groups[0].rules[0];
        assert_eq!(bad.state, RuleState::Error);
        assert!(bad.skipped_reason.is_some());
        assert_eq!(breakdown.total_delta, -25.0);
    }

    #[test]
    fn test_adjusted_price_clamped_to_zero() {
        let ruleset = Ruleset::new(1, "default").with_group(
            RuleGroup::new(1, "CPU", "cpu")
                .with_rule(Rule::new(1, "huge").with_action(Action::fixed(-5000.0))),
        );

        let breakdown =
            ValuationEngine::new().evaluate(&ctx(1000.0, "used"), &ruleset, &no_overrides());
        assert_eq!(breakdown.adjusted_price, 0.0);
        assert_eq!(breakdown.total_delta, -5000.0);
    }

    #[test]
    fn test_conservation() {
        let ruleset = Ruleset::new(1, "default")
            .with_category_weight("ram", 0.5)
            .with_group(
                RuleGroup::new(1, "RAM", "ram").with_display_order(1).with_rule(
                    Rule::new(1, "ram").with_action(Action::per_unit("ram_gb", -2.5)),
                ),
            )
            .with_group(
                RuleGroup::new(2, "CPU", "cpu")
                    .with_display_order(2)
                    .with_rule(Rule::new(2, "cpu").with_action(Action::new(
                        ActionKind::BenchmarkBased {
                            benchmark: "cpu_mark_multi".to_string(),
                            reference_value: 10000.0,
                            scale: -20.0,
                        },
                    ))),
            );

        let breakdown =
            ValuationEngine::new().evaluate(&ctx(1000.0, "used"), &ruleset, &no_overrides());

        let weighted_sum: f64 = breakdown
            .groups
            .iter()
            .map(|g| g.weighted_contribution)
            .sum();
        assert!((breakdown.adjusted_price - breakdown.base_price - weighted_sum).abs() < 1e-6);
    }

    #[test]
    fn test_inactive_rules_produce_no_line() {
        let mut inactive = Rule::new(1, "off").with_action(Action::fixed(-100.0));
        inactive.is_active = false;
        let ruleset = Ruleset::new(1, "default").with_group(
            RuleGroup::new(1, "CPU", "cpu")
                .with_rule(inactive)
                .with_rule(Rule::new(2, "on").with_action(Action::fixed(-10.0))),
        );

        let breakdown =
            ValuationEngine::new().evaluate(&ctx(1000.0, "used"), &ruleset, &no_overrides());
        assert_eq!(breakdown.groups[0].rules.len(), 1);
        assert_eq!(breakdown.total_delta, -10.0);
    }

    #[test]
    fn test_running_subtotal_resets_per_group() {
        let pct = |p: f64| Action::percentage(p, PercentBase::RunningSubtotal);
        let ruleset = Ruleset::new(1, "default")
            .with_group(
                RuleGroup::new(1, "A", "a")
                    .with_display_order(1)
                    .with_rule(Rule::new(1, "half").with_action(pct(-50.0))),
            )
            .with_group(
                RuleGroup::new(2, "B", "b")
                    .with_display_order(2)
                    .with_rule(Rule::new(2, "tenth").with_action(pct(-10.0))),
            );

        let breakdown =
            ValuationEngine::new().evaluate(&ctx(1000.0, "used"), &ruleset, &no_overrides());

        // Group B's percentage applies to base 1000, not 500
        assert_eq!(breakdown.groups[0].rules[0].contribution, -500.0);
        assert_eq!(breakdown.groups[1].rules[0].contribution, -100.0);
    }

    #[test]
    fn test_select_ruleset_priority_then_id() {
        let mut low = Ruleset::new(3, "low").with_priority(1);
        let high_a = Ruleset::new(2, "high-a").with_priority(10);
        let high_b = Ruleset::new(1, "high-b").with_priority(10);
        low.is_active = true;

        let rulesets = vec![low, high_a, high_b];
        let selected = select_ruleset(rulesets.iter()).unwrap();
        assert_eq!(selected.id, 1);

        let mut all_inactive = rulesets.clone();
        for rs in &mut all_inactive {
            rs.is_active = false;
        }
        assert!(select_ruleset(all_inactive.iter()).is_none());
    }

    #[test]
    fn test_purity_identical_breakdowns() {
        let mut variables = HashMap::new();
        variables.insert(
            "cpu_mark_multi".to_string(),
            "listing.cpu.cpu_mark_multi".to_string(),
        );
        let ruleset = Ruleset::new(1, "default").with_group(
            RuleGroup::new(1, "CPU", "cpu").with_rule(
                Rule::new(1, "formula").with_action(Action::new(ActionKind::Formula {
                    expression: "clamp((cpu_mark_multi/10000)*-50, -200, 0)".to_string(),
                    variables,
                })),
            ),
        );

        let engine = ValuationEngine::new();
        let ctx = ctx(1000.0, "used");
        let a = engine.evaluate(&ctx, &ruleset, &no_overrides());
        let b = engine.evaluate(&ctx, &ruleset, &no_overrides());

        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
