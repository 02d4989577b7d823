//! Whitelisted formula functions
//!
//! The closed set of callables admitted by the sandbox. Unknown names
//! are rejected at parse time; arity and argument types are checked
//! here at call time.

use super::{FormulaError, FormulaResult};
use crate::context::Value;
use serde::{Deserialize, Serialize};

/// The closed function set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Function {
    Clamp,
    Min,
    Max,
    Abs,
    Round,
    Ceil,
    Floor,
    Sqrt,
    Log,
    Exp,
    IfThenElse,
}

impl Function {
    /// Look up a function by source name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "clamp" => Some(Self::Clamp),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "abs" => Some(Self::Abs),
            "round" => Some(Self::Round),
            "ceil" => Some(Self::Ceil),
            "floor" => Some(Self::Floor),
            "sqrt" => Some(Self::Sqrt),
            "log" => Some(Self::Log),
            "exp" => Some(Self::Exp),
            "if_then_else" => Some(Self::IfThenElse),
            _ => None,
        }
    }

    /// Source name of the function
    pub fn name(&self) -> &'static str {
        match self {
            Self::Clamp => "clamp",
            Self::Min => "min",
            Self::Max => "max",
            Self::Abs => "abs",
            Self::Round => "round",
            Self::Ceil => "ceil",
            Self::Floor => "floor",
            Self::Sqrt => "sqrt",
            Self::Log => "log",
            Self::Exp => "exp",
            Self::IfThenElse => "if_then_else",
        }
    }

    /// Invoke the function over evaluated arguments
    pub fn call(&self, args: &[Value]) -> FormulaResult<Value> {
        match self {
            Self::Clamp => {
                require_args(self.name(), args, 3)?;
                let x = require_number(args, 0)?;
                let lo = require_number(args, 1)?;
                let hi = require_number(args, 2)?;
                if lo > hi {
                    return Err(FormulaError::Domain(format!(
                        "clamp: lo ({}) greater than hi ({})",
                        lo, hi
                    )));
                }
                Ok(Value::float(x.max(lo).min(hi)))
            }

            Self::Min => {
                require_at_least(self.name(), args, 1)?;
                let mut best = require_number(args, 0)?;
                for i in 1..args.len() {
                    best = best.min(require_number(args, i)?);
                }
                Ok(Value::float(best))
            }

            Self::Max => {
                require_at_least(self.name(), args, 1)?;
                let mut best = require_number(args, 0)?;
                for i in 1..args.len() {
                    best = best.max(require_number(args, i)?);
                }
                Ok(Value::float(best))
            }

            Self::Abs => {
                require_args(self.name(), args, 1)?;
                Ok(Value::float(require_number(args, 0)?.abs()))
            }

            Self::Round => {
                if args.is_empty() || args.len() > 2 {
                    return Err(arity(self.name(), "expected 1 or 2 arguments", args.len()));
                }
                let x = require_number(args, 0)?;
                if args.len() == 2 {
                    let ndigits = require_number(args, 1)? as i32;
                    let factor = 10f64.powi(ndigits);
                    Ok(Value::float((x * factor).round() / factor))
                } else {
                    Ok(Value::float(x.round()))
                }
            }

            Self::Ceil => {
                require_args(self.name(), args, 1)?;
                Ok(Value::float(require_number(args, 0)?.ceil()))
            }

            Self::Floor => {
                require_args(self.name(), args, 1)?;
                Ok(Value::float(require_number(args, 0)?.floor()))
            }

            Self::Sqrt => {
                require_args(self.name(), args, 1)?;
                let x = require_number(args, 0)?;
                if x < 0.0 {
                    return Err(FormulaError::Domain(format!("sqrt of negative {}", x)));
                }
                Ok(Value::float(x.sqrt()))
            }

            Self::Log => {
                if args.is_empty() || args.len() > 2 {
                    return Err(arity(self.name(), "expected 1 or 2 arguments", args.len()));
                }
                let x = require_number(args, 0)?;
                if x <= 0.0 {
                    return Err(FormulaError::Domain(format!("log of non-positive {}", x)));
                }
                if args.len() == 2 {
                    let base = require_number(args, 1)?;
                    if base <= 0.0 || base == 1.0 {
                        return Err(FormulaError::Domain(format!("log base {}", base)));
                    }
                    Ok(Value::float(x.log(base)))
                } else {
                    Ok(Value::float(x.ln()))
                }
            }

            Self::Exp => {
                require_args(self.name(), args, 1)?;
                Ok(Value::float(require_number(args, 0)?.exp()))
            }

            Self::IfThenElse => {
                require_args(self.name(), args, 3)?;
                let cond = require_number(args, 0)?;
                if cond != 0.0 {
                    Ok(args[1].clone())
                } else {
                    Ok(args[2].clone())
                }
            }
        }
    }
}

// ==================== Argument helpers ====================

fn arity(function: &'static str, message: &str, got: usize) -> FormulaError {
    FormulaError::Arity {
        function,
        message: format!("{}, got {}", message, got),
    }
}

fn require_args(function: &'static str, args: &[Value], count: usize) -> FormulaResult<()> {
    if args.len() != count {
        Err(arity(
            function,
            &format!("expected {} argument(s)", count),
            args.len(),
        ))
    } else {
        Ok(())
    }
}

fn require_at_least(function: &'static str, args: &[Value], count: usize) -> FormulaResult<()> {
    if args.len() < count {
        Err(arity(
            function,
            &format!("expected at least {} argument(s)", count),
            args.len(),
        ))
    } else {
        Ok(())
    }
}

fn require_number(args: &[Value], index: usize) -> FormulaResult<f64> {
    args[index].as_f64().ok_or(FormulaError::Type {
        expected: "number",
        actual: args[index].type_name(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp() {
        let out = Function::Clamp
            .call(&[Value::float(-300.0), Value::float(-200.0), Value::float(0.0)])
            .unwrap();
        assert_eq!(out, Value::float(-200.0));

        assert!(Function::Clamp
            .call(&[Value::float(1.0), Value::float(5.0), Value::float(0.0)])
            .is_err());
    }

    #[test]
    fn test_min_max_variadic() {
        let args = [Value::int(3), Value::float(1.5), Value::int(2)];
        assert_eq!(Function::Min.call(&args).unwrap(), Value::float(1.5));
        assert_eq!(Function::Max.call(&args).unwrap(), Value::float(3.0));
    }

    #[test]
    fn test_round_ndigits() {
        let out = Function::Round
            .call(&[Value::float(2.345), Value::int(2)])
            .unwrap();
        assert_eq!(out, Value::float(2.35));
    }

    #[test]
    fn test_log_domain() {
        assert!(Function::Log.call(&[Value::float(0.0)]).is_err());
        assert!(Function::Sqrt.call(&[Value::float(-1.0)]).is_err());
        let out = Function::Log
            .call(&[Value::float(8.0), Value::float(2.0)])
            .unwrap();
        assert_eq!(out, Value::float(3.0));
    }

    #[test]
    fn test_if_then_else() {
        let out = Function::IfThenElse
            .call(&[Value::float(1.0), Value::int(10), Value::int(20)])
            .unwrap();
        assert_eq!(out, Value::int(10));
    }

    #[test]
    fn test_closed_set() {
        assert_eq!(Function::from_name("clamp"), Some(Function::Clamp));
        assert_eq!(Function::from_name("eval"), None);
        assert_eq!(Function::from_name("__import__"), None);
    }
}
