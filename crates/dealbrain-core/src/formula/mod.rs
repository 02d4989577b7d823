//! Formula sandbox
//!
//! Parses and evaluates single-expression arithmetic formulas over a
//! restricted variable and function set. The grammar admits numeric
//! literals, string literals (for comparisons only), identifiers bound
//! in the caller's variable map, the arithmetic operators
//! `+ - * / // % **`, unary minus, comparisons (producing 0/1), and a
//! closed set of whitelisted functions. Anything else is rejected at
//! parse time; evaluation enforces a wall-time cap and returns clean
//! errors for division by zero, domain errors and undefined
//! identifiers.

mod ast;
mod eval;
mod functions;
mod parser;

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use eval::FormulaEvaluator;
pub use functions::Function;
pub use parser::FormulaParser;

use thiserror::Error;

/// Formula sandbox error
///
/// Never escapes into the rule engine: the action evaluator converts
/// these into per-action notes with a zero delta.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulaError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("expression too long: {len} chars (max {max})")]
    TooLong { len: usize, max: usize },

    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("{function}: {message}")]
    Arity { function: &'static str, message: String },

    #[error("type error: expected {expected}, got {actual}")]
    Type {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("domain error: {0}")]
    Domain(String),

    #[error("evaluation exceeded {0}ms")]
    Timeout(u64),
}

/// Formula Result type alias
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;
