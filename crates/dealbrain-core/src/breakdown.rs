//! Valuation breakdown
//!
//! The stable structured record of an evaluation: per-rule condition
//! traces and action outputs, per-group weighted totals, and the final
//! adjusted price. Embedded in the listing row as JSON for read
//! locality; the rule tables remain the source of truth for rule
//! state. Consumers should tolerate additive fields.

use crate::context::Value;
use crate::rule::ConditionOperator;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Per-rule evaluation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleState {
    Pending,
    Matched,
    NotMatched,
    OverriddenEnable,
    OverriddenDisable,
    OverriddenReplace,
    Error,
}

impl RuleState {
    /// States whose actions contribute to the total
    pub fn contributes(&self) -> bool {
        matches!(
            self,
            Self::Matched | Self::OverriddenEnable | Self::OverriddenReplace
        )
    }
}

/// One evaluated condition leaf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionTrace {
    pub field_path: String,
    pub operator: ConditionOperator,
    pub value: Value,
    pub actual: Value,
    pub result: bool,
}

/// One evaluated action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutput {
    /// Action kind tag, e.g. "fixed_value" or "formula"
    pub kind: String,

    /// Raw output before the condition multiplier
    pub raw: f64,

    /// Condition multiplier applied to the raw output
    pub multiplier: f64,

    /// Signed contribution of this action
    pub delta: f64,

    /// Non-fatal issues (unknown metric, formula error, zero reference)
    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub notes: SmallVec<[String; 2]>,
}

impl ActionOutput {
    /// Create an output with `delta = raw * multiplier`
    pub fn new(kind: &str, raw: f64, multiplier: f64) -> Self {
        Self {
            kind: kind.to_string(),
            raw,
            multiplier,
            delta: raw * multiplier,
            notes: SmallVec::new(),
        }
    }

    /// Attach a non-fatal note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

/// Per-rule record inside a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedRuleRecord {
    pub rule_id: i64,
    pub rule_name: String,
    pub state: RuleState,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_conditions: Vec<ConditionTrace>,

    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub actions: SmallVec<[ActionOutput; 2]>,

    /// Pre-weight contribution (sum of action deltas)
    pub contribution: f64,

    /// Contribution after the group weight
    pub weighted_contribution: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped_reason: Option<String>,
}

impl AppliedRuleRecord {
    /// Create a zero-contribution record in the given state
    pub fn skipped(rule_id: i64, rule_name: &str, state: RuleState, reason: &str) -> Self {
        Self {
            rule_id,
            rule_name: rule_name.to_string(),
            state,
            matched_conditions: Vec::new(),
            actions: SmallVec::new(),
            contribution: 0.0,
            weighted_contribution: 0.0,
            skipped_reason: Some(reason.to_string()),
        }
    }
}

/// Per-group record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupBreakdown {
    pub name: String,
    pub category: String,

    /// Effective weight: group weight, else ruleset category weight, else 1.0
    pub weight_applied: f64,

    pub rules: Vec<AppliedRuleRecord>,

    /// Pre-weight sum of rule contributions
    pub contribution: f64,

    /// Post-weight group total
    pub weighted_contribution: f64,
}

/// Identifying reference to the evaluated ruleset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesetRef {
    pub id: i64,
    pub name: String,
}

/// Complete evaluation breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub ruleset: RulesetRef,
    pub base_price: f64,

    /// `max(0, base_price + total_delta)`
    pub adjusted_price: f64,

    /// Sum of weighted group contributions
    pub total_delta: f64,

    pub groups: Vec<GroupBreakdown>,

    /// Set when the listing references a missing catalog row
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub has_integrity_warning: bool,
}

impl Breakdown {
    /// Sum of negative weighted rule contributions (the deductions)
    ///
    /// Used by the delta method for adjusted $/CPU Mark metrics:
    /// additions are ignored, deductions lower the effective price.
    pub fn total_deductions(&self) -> f64 {
        self.groups
            .iter()
            .flat_map(|g| g.rules.iter())
            .map(|r| r.weighted_contribution.min(0.0))
            .sum()
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
