//! Property tests for the valuation engine invariants

use dealbrain_core::prelude::*;
use proptest::prelude::*;

fn context(base_price: f64, ram_gb: Option<f64>, condition: &str) -> EvaluationContext {
    let ram = match ram_gb {
        Some(gb) => format!(r#", "ram": {{"total_capacity_gb": {}}}"#, gb),
        None => String::new(),
    };
    EvaluationContext::from_json(&format!(
        r#"{{"listing": {{"base_price": {}, "condition": "{}"{}}}}}"#,
        base_price, condition, ram
    ))
    .unwrap()
}

fn fixed_rules_ruleset(amounts: &[f64], weight: f64) -> Ruleset {
    let mut group = RuleGroup::new(1, "Adjustments", "adjustments").with_weight(weight);
    for (i, amount) in amounts.iter().enumerate() {
        group = group.with_rule(Rule::new(i as i64 + 1, format!("rule {}", i)).with_action(
            Action::fixed(*amount),
        ));
    }
    Ruleset::new(1, "prop").with_group(group)
}

fn condition_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("new"), Just("refurb"), Just("used")]
}

proptest! {
    /// Two evaluations of the same inputs are byte-identical
    #[test]
    fn purity(
        base_price in 0.0..5000.0f64,
        ram_gb in proptest::option::of(1.0..256.0f64),
        condition in condition_strategy(),
        amounts in proptest::collection::vec(-500.0..500.0f64, 0..6),
    ) {
        let ruleset = fixed_rules_ruleset(&amounts, 1.0);
        let ctx = context(base_price, ram_gb, condition);
        let engine = ValuationEngine::new();

        let a = engine.evaluate(&ctx, &ruleset, &ListingOverrides::default());
        let b = engine.evaluate(&ctx, &ruleset, &ListingOverrides::default());

        prop_assert_eq!(&a, &b);
        prop_assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    /// The adjusted price never goes below zero
    #[test]
    fn adjusted_price_non_negative(
        base_price in 0.0..2000.0f64,
        amounts in proptest::collection::vec(-1000.0..500.0f64, 0..8),
    ) {
        let ruleset = fixed_rules_ruleset(&amounts, 1.0);
        let ctx = context(base_price, None, "used");
        let breakdown =
            ValuationEngine::new().evaluate(&ctx, &ruleset, &ListingOverrides::default());

        prop_assert!(breakdown.adjusted_price >= 0.0);
    }

    /// `adjusted - base` equals the sum of weighted group contributions
    /// (up to the zero clamp), within floating-point tolerance
    #[test]
    fn conservation(
        base_price in 0.0..5000.0f64,
        amounts in proptest::collection::vec(-300.0..300.0f64, 1..6),
        weight in 0.0..2.0f64,
    ) {
        let ruleset = fixed_rules_ruleset(&amounts, weight);
        let ctx = context(base_price, None, "used");
        let breakdown =
            ValuationEngine::new().evaluate(&ctx, &ruleset, &ListingOverrides::default());

        let weighted_sum: f64 = breakdown.groups.iter().map(|g| g.weighted_contribution).sum();
        prop_assert!((breakdown.total_delta - weighted_sum).abs() < 1e-6);
        let expected = (base_price + weighted_sum).max(0.0);
        prop_assert!((breakdown.adjusted_price - expected).abs() < 1e-6);
    }

    /// Weight 1.0 leaves per-rule contributions unweighted
    #[test]
    fn unit_weight_identity(
        amounts in proptest::collection::vec(-300.0..300.0f64, 1..6),
    ) {
        let ruleset = fixed_rules_ruleset(&amounts, 1.0);
        let ctx = context(1000.0, None, "used");
        let breakdown =
            ValuationEngine::new().evaluate(&ctx, &ruleset, &ListingOverrides::default());

        for rule in &breakdown.groups[0].rules {
            prop_assert_eq!(rule.contribution, rule.weighted_contribution);
        }
    }

    /// A disable override is indistinguishable from removing the rule
    #[test]
    fn disable_override_equals_removal(
        amounts in proptest::collection::vec(-300.0..300.0f64, 1..6),
        pick in 0usize..6,
    ) {
        let target = (pick % amounts.len()) as i64 + 1;

        let full = fixed_rules_ruleset(&amounts, 1.0);

        // Rebuild the reduced ruleset keeping surviving rule ids stable
        let mut group = RuleGroup::new(1, "Adjustments", "adjustments").with_weight(1.0);
        for (i, amount) in amounts.iter().enumerate() {
            let id = i as i64 + 1;
            if id != target {
                group = group.with_rule(
                    Rule::new(id, format!("rule {}", i)).with_action(Action::fixed(*amount)),
                );
            }
        }
        let without = Ruleset::new(1, "prop").with_group(group);

        let overrides = ListingOverrides::from_iter(&[ListingOverride {
            listing_id: 1,
            rule_id: target,
            action: OverrideAction::Disable,
        }]);

        let ctx = context(1000.0, None, "used");
        let engine = ValuationEngine::new();
        let disabled = engine.evaluate(&ctx, &full, &overrides);
        let removed = engine.evaluate(&ctx, &without, &ListingOverrides::default());

        prop_assert!((disabled.total_delta - removed.total_delta).abs() < 1e-9);
        prop_assert!((disabled.adjusted_price - removed.adjusted_price).abs() < 1e-9);
    }

    /// Replace-with-fixed forces the contribution to amount x multiplier
    #[test]
    fn replace_override_forces_contribution(
        native in -300.0..300.0f64,
        replacement in -300.0..300.0f64,
        multiplier in 0.0..2.0f64,
        condition in condition_strategy(),
    ) {
        let ruleset = fixed_rules_ruleset(&[native], 1.0);
        let overrides = ListingOverrides::from_iter(&[ListingOverride {
            listing_id: 1,
            rule_id: 1,
            action: OverrideAction::ReplaceWithFixed {
                amount: replacement,
                condition_multipliers: Some(ConditionMultipliers {
                    new: multiplier,
                    refurb: multiplier,
                    used: multiplier,
                }),
            },
        }]);

        let ctx = context(1000.0, None, condition);
        let breakdown = ValuationEngine::new().evaluate(&ctx, &ruleset, &overrides);

        let rule = &breakdown.groups[0].rules[0];
        prop_assert_eq!(rule.state, RuleState::OverriddenReplace);
        prop_assert!((rule.contribution - replacement * multiplier).abs() < 1e-9);
    }
}
