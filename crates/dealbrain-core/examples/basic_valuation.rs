//! Basic valuation example
//!
//! Builds a small ruleset, values one listing and prints the breakdown.

use dealbrain_core::prelude::*;

fn main() {
    let ruleset = Ruleset::new(1, "default")
        .with_group(
            RuleGroup::new(1, "Condition", "condition")
                .with_display_order(1)
                .with_rule(
                    Rule::new(1, "used deduction")
                        .with_condition(ConditionNode::equals("listing.condition", "used"))
                        .with_action(Action::percentage(-40.0, PercentBase::RunningSubtotal)),
                ),
        )
        .with_group(
            RuleGroup::new(2, "RAM", "ram")
                .with_display_order(2)
                .with_weight(0.5)
                .with_rule(
                    Rule::new(2, "ram value").with_action(Action::per_unit("ram_gb", -2.5)),
                ),
        );

    let ctx = EvaluationContext::from_json(
        r#"{"listing": {
            "base_price": 650.0,
            "condition": "used",
            "cpu": {"cpu_mark_multi": 24000},
            "ram": {"total_capacity_gb": 16}
        }}"#,
    )
    .expect("valid context document");

    let engine = ValuationEngine::new();
    let breakdown = engine.evaluate(&ctx, &ruleset, &ListingOverrides::default());

    println!(
        "{}: {} -> {} (delta {})",
        breakdown.ruleset.name, breakdown.base_price, breakdown.adjusted_price, breakdown.total_delta
    );
    for group in &breakdown.groups {
        println!(
            "  [{}] x{} = {}",
            group.name, group.weight_applied, group.weighted_contribution
        );
        for rule in &group.rules {
            println!(
                "    {} ({:?}): {}",
                rule.rule_name, rule.state, rule.contribution
            );
        }
    }
}
