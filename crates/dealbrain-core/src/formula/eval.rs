//! Formula evaluator
//!
//! Walks the restricted AST against the caller-provided variable map.
//! The variable map is the only external surface: no process state,
//! imports or unbounded allocation is reachable from a formula.

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::parser::FormulaParser;
use super::{FormulaError, FormulaResult};
use crate::config::FormulaLimits;
use crate::context::Value;
use std::collections::HashMap;
use std::time::Instant;

/// Formula evaluator with enforced limits
#[derive(Debug, Clone, Default)]
pub struct FormulaEvaluator {
    limits: FormulaLimits,
}

impl FormulaEvaluator {
    /// Create an evaluator with the given limits
    pub fn new(limits: FormulaLimits) -> Self {
        Self { limits }
    }

    /// Parse an expression, enforcing the length cap
    pub fn parse(&self, expression: &str) -> FormulaResult<Expr> {
        if expression.len() > self.limits.max_expression_len {
            return Err(FormulaError::TooLong {
                len: expression.len(),
                max: self.limits.max_expression_len,
            });
        }
        FormulaParser::parse(expression)
    }

    /// Parse and evaluate an expression to a scalar
    pub fn evaluate(
        &self,
        expression: &str,
        variables: &HashMap<String, Value>,
    ) -> FormulaResult<f64> {
        let expr = self.parse(expression)?;
        self.evaluate_expr(&expr, variables)
    }

    /// Evaluate a pre-parsed expression to a scalar
    pub fn evaluate_expr(
        &self,
        expr: &Expr,
        variables: &HashMap<String, Value>,
    ) -> FormulaResult<f64> {
        let state = EvalState {
            variables,
            started: Instant::now(),
            timeout_ms: self.limits.timeout_ms,
        };
        let value = state.eval(expr)?;
        let result = value.as_f64().ok_or(FormulaError::Type {
            expected: "number",
            actual: value.type_name(),
        })?;
        if !result.is_finite() {
            return Err(FormulaError::Domain(format!(
                "non-finite result {}",
                result
            )));
        }
        Ok(result)
    }
}

struct EvalState<'a> {
    variables: &'a HashMap<String, Value>,
    started: Instant,
    timeout_ms: u64,
}

impl EvalState<'_> {
    fn eval(&self, expr: &Expr) -> FormulaResult<Value> {
        if self.timeout_ms > 0 && self.started.elapsed().as_millis() as u64 >= self.timeout_ms {
            return Err(FormulaError::Timeout(self.timeout_ms));
        }

        match expr {
            Expr::Number(n) => Ok(Value::float(*n)),

            Expr::Str(s) => Ok(Value::string(s.clone())),

            Expr::Ident(name) => self
                .variables
                .get(name)
                .cloned()
                .ok_or_else(|| FormulaError::UndefinedVariable(name.clone())),

            Expr::Unary {
                op: UnaryOp::Neg,
                operand,
            } => {
                let value = self.eval(operand)?;
                let n = require_number(&value)?;
                Ok(Value::float(-n))
            }

            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                self.eval_binary(*op, &left, &right)
            }

            Expr::Call { function, args } => {
                let arg_values: Vec<Value> = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<FormulaResult<_>>()?;
                function.call(&arg_values)
            }
        }
    }

    fn eval_binary(&self, op: BinaryOp, left: &Value, right: &Value) -> FormulaResult<Value> {
        match op {
            BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::FloorDiv
            | BinaryOp::Mod
            | BinaryOp::Pow => {
                let a = require_number(left)?;
                let b = require_number(right)?;
                self.eval_arithmetic(op, a, b)
            }

            BinaryOp::Eq => Ok(bool_value(values_equal(left, right)?)),
            BinaryOp::Ne => Ok(bool_value(!values_equal(left, right)?)),

            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let ord = left.ordering(right).ok_or(FormulaError::Type {
                    expected: "comparable operands",
                    actual: left.type_name(),
                })?;
                let result = match op {
                    BinaryOp::Lt => ord == std::cmp::Ordering::Less,
                    BinaryOp::Le => ord != std::cmp::Ordering::Greater,
                    BinaryOp::Gt => ord == std::cmp::Ordering::Greater,
                    BinaryOp::Ge => ord != std::cmp::Ordering::Less,
                    _ => unreachable!(),
                };
                Ok(bool_value(result))
            }
        }
    }

    fn eval_arithmetic(&self, op: BinaryOp, a: f64, b: f64) -> FormulaResult<Value> {
        let result = match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => {
                if b == 0.0 {
                    return Err(FormulaError::DivisionByZero);
                }
                a / b
            }
            BinaryOp::FloorDiv => {
                if b == 0.0 {
                    return Err(FormulaError::DivisionByZero);
                }
                (a / b).floor()
            }
            BinaryOp::Mod => {
                if b == 0.0 {
                    return Err(FormulaError::DivisionByZero);
                }
                a % b
            }
            BinaryOp::Pow => a.powf(b),
            _ => unreachable!(),
        };

        if !result.is_finite() {
            return Err(FormulaError::Domain(format!(
                "non-finite result of {:?}",
                op
            )));
        }
        Ok(Value::float(result))
    }
}

/// Comparisons produce 0/1 so they compose with arithmetic
fn bool_value(b: bool) -> Value {
    Value::float(if b { 1.0 } else { 0.0 })
}

fn values_equal(left: &Value, right: &Value) -> FormulaResult<bool> {
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => Ok(a == b),
        _ => match (left.as_str(), right.as_str()) {
            (Some(a), Some(b)) => Ok(a == b),
            _ => Err(FormulaError::Type {
                expected: "two numbers or two strings",
                actual: left.type_name(),
            }),
        },
    }
}

fn require_number(value: &Value) -> FormulaResult<f64> {
    value.as_f64().ok_or(FormulaError::Type {
        expected: "number",
        actual: value.type_name(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, f64)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::float(*v)))
            .collect()
    }

    #[test]
    fn test_basic_arithmetic() {
        let eval = FormulaEvaluator::default();
        let empty = HashMap::new();

        assert_eq!(eval.evaluate("1 + 2 * 3", &empty).unwrap(), 7.0);
        assert_eq!(eval.evaluate("2 ** 10", &empty).unwrap(), 1024.0);
        assert_eq!(eval.evaluate("7 // 2", &empty).unwrap(), 3.0);
        assert_eq!(eval.evaluate("7 % 2", &empty).unwrap(), 1.0);
        assert_eq!(eval.evaluate("-(3 + 1)", &empty).unwrap(), -4.0);
    }

    #[test]
    fn test_variables() {
        let eval = FormulaEvaluator::default();
        let vars = vars(&[("cpu_mark_multi", 25000.0)]);

        let result = eval
            .evaluate("clamp((cpu_mark_multi / 10000) * -50, -200, 0)", &vars)
            .unwrap();
        assert_eq!(result, -125.0);
    }

    #[test]
    fn test_clamp_saturates() {
        let eval = FormulaEvaluator::default();
        let vars = vars(&[("cpu_mark_multi", 60000.0)]);

        let result = eval
            .evaluate("clamp((cpu_mark_multi / 10000) * -50, -200, 0)", &vars)
            .unwrap();
        assert_eq!(result, -200.0);
    }

    #[test]
    fn test_undefined_variable() {
        let eval = FormulaEvaluator::default();
        let err = eval.evaluate("x + 1", &HashMap::new()).unwrap_err();
        assert_eq!(err, FormulaError::UndefinedVariable("x".to_string()));
    }

    #[test]
    fn test_division_by_zero() {
        let eval = FormulaEvaluator::default();
        let err = eval.evaluate("1 / 0", &HashMap::new()).unwrap_err();
        assert_eq!(err, FormulaError::DivisionByZero);
    }

    #[test]
    fn test_comparisons_produce_zero_one() {
        let eval = FormulaEvaluator::default();
        let vars = vars(&[("x", 5.0)]);

        assert_eq!(eval.evaluate("(x > 3) * 10", &vars).unwrap(), 10.0);
        assert_eq!(eval.evaluate("(x > 7) * 10", &vars).unwrap(), 0.0);
    }

    #[test]
    fn test_string_comparison_only() {
        let eval = FormulaEvaluator::default();
        let mut vars = HashMap::new();
        vars.insert("tier".to_string(), Value::string("premium"));

        assert_eq!(
            eval.evaluate("if_then_else(tier == 'premium', 100, 0)", &vars)
                .unwrap(),
            100.0
        );
        // Strings cannot participate in arithmetic
        assert!(eval.evaluate("tier + 1", &vars).is_err());
    }

    #[test]
    fn test_if_then_else_branching() {
        let eval = FormulaEvaluator::default();
        let vars = vars(&[("ram_gb", 32.0)]);

        let result = eval
            .evaluate("if_then_else(ram_gb >= 16, ram_gb * -2, 0)", &vars)
            .unwrap();
        assert_eq!(result, -64.0);
    }

    #[test]
    fn test_length_cap() {
        let eval = FormulaEvaluator::new(FormulaLimits {
            max_expression_len: 10,
            timeout_ms: 100,
        });
        let err = eval.evaluate("1 + 1 + 1 + 1", &HashMap::new()).unwrap_err();
        assert!(matches!(err, FormulaError::TooLong { .. }));
    }

    #[test]
    fn test_formula_equivalent_to_per_unit() {
        // `value = x` with x bound equals a per-unit action with unit_value 1
        let eval = FormulaEvaluator::default();
        let vars = vars(&[("x", 16.0)]);
        assert_eq!(eval.evaluate("x", &vars).unwrap(), 16.0);
    }
}
