//! Rule model definitions
//!
//! Rulesets, rule groups, rules and listing overrides. Rules are
//! versioned: edits bump `version`, and evaluation always uses the
//! current version.

use super::action::{Action, ConditionMultipliers};
use super::baseline::BaselineFieldMetadata;
use super::condition::ConditionNode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Rule metadata blob
///
/// Carries baseline descriptors and hydration lineage; persisted as the
/// rule's `metadata_json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleMetadata {
    /// Marks a baseline placeholder authored in compact form
    #[serde(default)]
    pub system_baseline: bool,

    /// Compact baseline descriptor, present on placeholders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<BaselineFieldMetadata>,

    /// Id of the baseline placeholder this rule was hydrated from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hydration_source_rule_id: Option<i64>,

    /// Placeholder version at hydration time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hydration_source_version: Option<u32>,

    /// Free-form annotations (e.g. formula fallback notices)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<String>,
}

/// A valuation rule: condition tree + ordered action list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: i64,
    pub name: String,

    /// Lower priority applies first within a group
    #[serde(default)]
    pub priority: i32,

    #[serde(default = "default_true")]
    pub is_active: bool,

    /// A matching exclusive rule short-circuits the rest of its group
    #[serde(default)]
    pub is_exclusive: bool,

    /// System scaffolding rules hidden from user-facing rule listings
    #[serde(default)]
    pub is_foreign_key_rule: bool,

    /// Monotone version; edits create new versions
    #[serde(default = "default_version")]
    pub version: u32,

    /// Condition tree; absent means "applies to all"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionNode>,

    #[serde(default)]
    pub actions: Vec<Action>,

    #[serde(default)]
    pub metadata: RuleMetadata,
}

fn default_true() -> bool {
    true
}

fn default_version() -> u32 {
    1
}

impl Rule {
    /// Create an always-matching rule with no actions
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            priority: 0,
            is_active: true,
            is_exclusive: false,
            is_foreign_key_rule: false,
            version: 1,
            condition: None,
            actions: Vec::new(),
            metadata: RuleMetadata::default(),
        }
    }

    /// Set the condition tree
    pub fn with_condition(mut self, condition: ConditionNode) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Append an action
    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Set the in-group priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Mark as exclusive
    pub fn exclusive(mut self) -> Self {
        self.is_exclusive = true;
        self
    }

    /// Record an edit: bump the monotone version
    pub fn bump_version(&mut self) {
        self.version += 1;
    }

    /// Whether this is a baseline placeholder
    pub fn is_baseline_placeholder(&self) -> bool {
        self.metadata.system_baseline && self.metadata.baseline.is_some()
    }
}

/// Category-tagged ordered collection of rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleGroup {
    pub id: i64,
    pub name: String,

    /// Free-form category tag keyed by ruleset category weights
    pub category: String,

    #[serde(default)]
    pub display_order: i32,

    /// Optional per-group weight override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,

    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl RuleGroup {
    /// Create an empty group
    pub fn new(id: i64, name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            category: category.into(),
            display_order: 0,
            weight: None,
            rules: Vec::new(),
        }
    }

    /// Set the display order
    pub fn with_display_order(mut self, display_order: i32) -> Self {
        self.display_order = display_order;
        self
    }

    /// Set the group weight override
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Append a rule
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Rules in evaluation order: ascending priority, then id
    pub fn sorted_rules(&self) -> Vec<&Rule> {
        let mut rules: Vec<&Rule> = self.rules.iter().collect();
        rules.sort_by_key(|r| (r.priority, r.id));
        rules
    }
}

/// Named collection of rule groups applied to listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ruleset {
    pub id: i64,
    pub name: String,

    /// Higher wins ties between concurrently-active rulesets
    #[serde(default)]
    pub priority: i32,

    #[serde(default = "default_true")]
    pub is_active: bool,

    /// Category name -> weight in [0, ∞); missing categories weigh 1.0
    #[serde(default)]
    pub category_weights: HashMap<String, f64>,

    #[serde(default)]
    pub groups: Vec<RuleGroup>,
}

impl Ruleset {
    /// Create an empty ruleset
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            priority: 0,
            is_active: true,
            category_weights: HashMap::new(),
            groups: Vec::new(),
        }
    }

    /// Set the selection priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set a category weight
    pub fn with_category_weight(mut self, category: impl Into<String>, weight: f64) -> Self {
        self.category_weights.insert(category.into(), weight);
        self
    }

    /// Append a group
    pub fn with_group(mut self, group: RuleGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Groups in evaluation order: display order, then id
    pub fn sorted_groups(&self) -> Vec<&RuleGroup> {
        let mut groups: Vec<&RuleGroup> = self.groups.iter().collect();
        groups.sort_by_key(|g| (g.display_order, g.id));
        groups
    }

    /// Effective weight for a group
    ///
    /// Group weight override, else the ruleset's category weight, else 1.0.
    pub fn effective_weight(&self, group: &RuleGroup) -> f64 {
        group
            .weight
            .or_else(|| self.category_weights.get(&group.category).copied())
            .unwrap_or(1.0)
    }

    /// Iterate every rule across groups
    pub fn iter_rules(&self) -> impl Iterator<Item = &Rule> {
        self.groups.iter().flat_map(|g| g.rules.iter())
    }

    /// Find a rule by id
    pub fn find_rule(&self, rule_id: i64) -> Option<&Rule> {
        self.iter_rules().find(|r| r.id == rule_id)
    }

    /// Rules shown in user-facing listings
    ///
    /// Foreign-key scaffolding rules are excluded here but still
    /// evaluated by the engine.
    pub fn user_visible_rules(&self) -> impl Iterator<Item = &Rule> {
        self.iter_rules().filter(|r| !r.is_foreign_key_rule)
    }

    /// Load from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Validate structural invariants
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let mut group_ids = std::collections::HashSet::new();
        let mut rule_ids = std::collections::HashSet::new();

        for group in &self.groups {
            if !group_ids.insert(group.id) {
                errors.push(format!("Duplicate group id {}", group.id));
            }
            if let Some(weight) = group.weight {
                if weight < 0.0 || !weight.is_finite() {
                    errors.push(format!(
                        "Group '{}' has invalid weight {}",
                        group.name, weight
                    ));
                }
            }
            for rule in &group.rules {
                if !rule_ids.insert(rule.id) {
                    errors.push(format!("Duplicate rule id {}", rule.id));
                }
            }
        }

        for (category, weight) in &self.category_weights {
            if *weight < 0.0 || !weight.is_finite() {
                errors.push(format!(
                    "Category '{}' has invalid weight {}",
                    category, weight
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Per-listing, per-rule override action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OverrideAction {
    /// Skip the rule entirely
    Disable,

    /// Treat the rule as matched without evaluating its conditions
    ForceEnable,

    /// Replace the rule's actions with a single fixed amount
    ///
    /// The override carries its own multipliers, defaulting to 1.0.
    ReplaceWithFixed {
        amount: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        condition_multipliers: Option<ConditionMultipliers>,
    },
}

/// Per-listing, per-rule toggle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingOverride {
    pub listing_id: i64,
    pub rule_id: i64,

    #[serde(flatten)]
    pub action: OverrideAction,
}

/// Overrides for one listing, keyed by rule id
#[derive(Debug, Clone, Default)]
pub struct ListingOverrides {
    by_rule: HashMap<i64, OverrideAction>,
}

impl ListingOverrides {
    /// Collect the overrides that target one listing
    pub fn from_iter<'a>(overrides: impl IntoIterator<Item = &'a ListingOverride>) -> Self {
        Self {
            by_rule: overrides
                .into_iter()
                .map(|o| (o.rule_id, o.action.clone()))
                .collect(),
        }
    }

    /// Look up the override for a rule
    pub fn get(&self, rule_id: i64) -> Option<&OverrideAction> {
        self.by_rule.get(&rule_id)
    }

    /// Whether any override is present
    pub fn is_empty(&self) -> bool {
        self.by_rule.is_empty()
    }
}
