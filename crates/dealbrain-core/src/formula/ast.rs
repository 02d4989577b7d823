//! Formula AST definitions
//!
//! The restricted node set doubles as the sandbox allow-list: the
//! parser can only produce these nodes, so validating a formula is the
//! same act as parsing it.

use super::functions::Function;
use serde::{Deserialize, Serialize};

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,      // +
    Sub,      // -
    Mul,      // *
    Div,      // /
    FloorDiv, // //
    Mod,      // %
    Pow,      // **

    // Comparison (produce 0/1)
    Eq, // ==
    Ne, // !=
    Lt, // <
    Le, // <=
    Gt, // >
    Ge, // >=
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg, // -
}

/// Formula expression node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Numeric literal
    Number(f64),

    /// String literal (comparison operand only)
    Str(String),

    /// Identifier bound in the variable map
    Ident(String),

    /// Binary operation
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Unary operation
    Unary { op: UnaryOp, operand: Box<Expr> },

    /// Whitelisted function call
    Call { function: Function, args: Vec<Expr> },
}

impl Expr {
    /// Create a binary operation
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Create a negation
    pub fn neg(operand: Expr) -> Self {
        Self::Unary {
            op: UnaryOp::Neg,
            operand: Box::new(operand),
        }
    }

    /// Collect every identifier referenced by this expression
    pub fn identifiers(&self) -> Vec<&str> {
        let mut idents = Vec::new();
        self.collect_identifiers(&mut idents);
        idents
    }

    fn collect_identifiers<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Ident(name) => out.push(name),
            Self::Binary { left, right, .. } => {
                left.collect_identifiers(out);
                right.collect_identifiers(out);
            }
            Self::Unary { operand, .. } => operand.collect_identifiers(out),
            Self::Call { args, .. } => {
                for arg in args {
                    arg.collect_identifiers(out);
                }
            }
            Self::Number(_) | Self::Str(_) => {}
        }
    }
}
