//! Condition evaluator
//!
//! Evaluates a rule's condition tree against the evaluation context,
//! producing a boolean match plus a complete per-leaf trace. Pure and
//! total over data: missing fields and type mismatches yield `false`,
//! never errors. Only structurally malformed trees (bad `in`/`between`
//! operands, over-deep nesting) error out, and the engine turns those
//! into rule-level skip reasons.

use crate::breakdown::ConditionTrace;
use crate::context::{EvaluationContext, Value};
use crate::error::{Result, ValuationError};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Logical composition of child conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOp {
    And,
    Or,
}

/// Leaf condition operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Gt,
    Lt,
    Gte,
    Lte,
    Contains,
    StartsWith,
    EndsWith,
    In,
    NotIn,
    Between,
}

/// Condition tree node
///
/// A leaf compares a resolved field path against a literal; a branch
/// combines children with AND/OR. An absent tree at the rule root
/// means "applies to all".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionNode {
    Branch {
        logical_op: LogicalOp,
        #[serde(default)]
        children: Vec<ConditionNode>,
    },
    Leaf {
        field_path: String,
        operator: ConditionOperator,
        #[serde(default)]
        value: Value,
    },
}

impl ConditionNode {
    /// Create an equality leaf
    pub fn equals(field_path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Leaf {
            field_path: field_path.into(),
            operator: ConditionOperator::Equals,
            value: value.into(),
        }
    }

    /// Create a leaf with an arbitrary operator
    pub fn leaf(
        field_path: impl Into<String>,
        operator: ConditionOperator,
        value: impl Into<Value>,
    ) -> Self {
        Self::Leaf {
            field_path: field_path.into(),
            operator,
            value: value.into(),
        }
    }

    /// Create an AND branch
    pub fn all(children: Vec<ConditionNode>) -> Self {
        Self::Branch {
            logical_op: LogicalOp::And,
            children,
        }
    }

    /// Create an OR branch
    pub fn any(children: Vec<ConditionNode>) -> Self {
        Self::Branch {
            logical_op: LogicalOp::Or,
            children,
        }
    }
}

/// Result of evaluating a condition tree
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionOutcome {
    pub matched: bool,
    pub trace: Vec<ConditionTrace>,
}

impl ConditionOutcome {
    /// Outcome for an absent tree: applies to all, empty trace
    pub fn always() -> Self {
        Self {
            matched: true,
            trace: Vec::new(),
        }
    }
}

/// Condition tree evaluator
#[derive(Debug, Clone)]
pub struct ConditionEvaluator {
    max_depth: usize,
}

impl ConditionEvaluator {
    /// Create an evaluator with the given depth cap
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Evaluate a rule's condition tree
    ///
    /// `None` means the rule applies to every listing. Children are
    /// evaluated eagerly so the trace is complete for diagnostics.
    pub fn evaluate(
        &self,
        ctx: &EvaluationContext,
        node: Option<&ConditionNode>,
    ) -> Result<ConditionOutcome> {
        let Some(node) = node else {
            return Ok(ConditionOutcome::always());
        };

        let mut trace = Vec::new();
        let matched = self.eval_node(ctx, node, 0, &mut trace)?;
        Ok(ConditionOutcome { matched, trace })
    }

    fn eval_node(
        &self,
        ctx: &EvaluationContext,
        node: &ConditionNode,
        depth: usize,
        trace: &mut Vec<ConditionTrace>,
    ) -> Result<bool> {
        if depth >= self.max_depth {
            return Err(ValuationError::ConditionTooDeep {
                max_depth: self.max_depth,
            });
        }

        match node {
            ConditionNode::Branch {
                logical_op,
                children,
            } => {
                // Eager evaluation keeps the trace complete
                let mut results = Vec::with_capacity(children.len());
                for child in children {
                    results.push(self.eval_node(ctx, child, depth + 1, trace)?);
                }
                Ok(match logical_op {
                    LogicalOp::And => results.iter().all(|r| *r),
                    LogicalOp::Or => results.iter().any(|r| *r),
                })
            }

            ConditionNode::Leaf {
                field_path,
                operator,
                value,
            } => {
                let actual = ctx.get(field_path).cloned().unwrap_or(Value::Null);
                let result = self.eval_leaf(*operator, &actual, value)?;
                trace.push(ConditionTrace {
                    field_path: field_path.clone(),
                    operator: *operator,
                    value: value.clone(),
                    actual,
                    result,
                });
                Ok(result)
            }
        }
    }

    fn eval_leaf(
        &self,
        operator: ConditionOperator,
        actual: &Value,
        value: &Value,
    ) -> Result<bool> {
        match operator {
            // Membership: a null operand is a non-member
            ConditionOperator::In => Ok(self.eval_membership(actual, value)?),
            ConditionOperator::NotIn => Ok(!self.eval_membership(actual, value)?),

            ConditionOperator::Between => self.eval_between(actual, value),

            // Null policy: any remaining operator against null is false
            _ if actual.is_null() => Ok(false),

            ConditionOperator::Equals => Ok(actual.loosely_equals(value)),
            ConditionOperator::NotEquals => Ok(!actual.loosely_equals(value)),

            ConditionOperator::Gt => Ok(numeric_cmp(actual, value, |o| o.is_gt())),
            ConditionOperator::Lt => Ok(numeric_cmp(actual, value, |o| o.is_lt())),
            ConditionOperator::Gte => Ok(numeric_cmp(actual, value, |o| o.is_ge())),
            ConditionOperator::Lte => Ok(numeric_cmp(actual, value, |o| o.is_le())),

            ConditionOperator::Contains => Ok(string_op(actual, value, |a, v| a.contains(v))),
            ConditionOperator::StartsWith => Ok(string_op(actual, value, |a, v| a.starts_with(v))),
            ConditionOperator::EndsWith => Ok(string_op(actual, value, |a, v| a.ends_with(v))),
        }
    }

    fn eval_membership(&self, actual: &Value, value: &Value) -> Result<bool> {
        let items = value.as_array().ok_or_else(|| {
            ValuationError::malformed(format!(
                "'in'/'not_in' requires a sequence, got {}",
                value.type_name()
            ))
        })?;

        if actual.is_null() {
            return Ok(false);
        }
        Ok(items.iter().any(|item| actual.loosely_equals(item)))
    }

    fn eval_between(&self, actual: &Value, value: &Value) -> Result<bool> {
        let bounds = value.as_array().ok_or_else(|| {
            ValuationError::malformed(format!(
                "'between' requires a two-element sequence, got {}",
                value.type_name()
            ))
        })?;
        if bounds.len() != 2 {
            return Err(ValuationError::malformed(format!(
                "'between' requires exactly two bounds, got {}",
                bounds.len()
            )));
        }

        let (Some(a), Some(b)) = (bounds[0].as_f64(), bounds[1].as_f64()) else {
            return Err(ValuationError::malformed(
                "'between' bounds must be numeric",
            ));
        };

        // Reversed bounds are auto-normalized; both ends inclusive
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };

        match actual.as_f64() {
            Some(x) => Ok(x >= lo && x <= hi),
            None => Ok(false),
        }
    }
}

/// Numeric ordering; false unless both sides are numbers
fn numeric_cmp(a: &Value, b: &Value, pred: impl Fn(std::cmp::Ordering) -> bool) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).map(&pred).unwrap_or(false),
        _ => false,
    }
}

/// Case-insensitive, NFC-normalized string operator
fn string_op(a: &Value, b: &Value, pred: impl Fn(&str, &str) -> bool) -> bool {
    match (a.as_str(), b.as_str()) {
        (Some(a), Some(b)) => pred(&fold(a), &fold(b)),
        _ => false,
    }
}

fn fold(s: &str) -> String {
    s.nfc().collect::<String>().to_lowercase()
}
