//! Core error types

use thiserror::Error;

/// Core valuation error type
#[derive(Error, Debug, Clone)]
pub enum ValuationError {
    /// Rule or ruleset definition could not be parsed
    #[error("Parse error: {message}")]
    ParseError { message: String },

    /// Condition tree is structurally malformed
    #[error("Malformed condition: {message}")]
    MalformedCondition { message: String },

    /// Condition tree exceeds the safety depth cap
    #[error("Condition tree exceeds max depth {max_depth}")]
    ConditionTooDeep { max_depth: usize },

    /// Formula rejected or failed during evaluation
    #[error("Formula error: {message}")]
    FormulaError { message: String },

    /// Ruleset failed structural validation
    #[error("Invalid ruleset '{name}': {message}")]
    InvalidRuleset { name: String, message: String },

    /// Baseline descriptor cannot be hydrated
    #[error("Hydration error for rule {rule_id}: {message}")]
    HydrationError { rule_id: i64, message: String },
}

/// Core Result type alias
pub type Result<T> = std::result::Result<T, ValuationError>;

impl ValuationError {
    /// Create a parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
        }
    }

    /// Create a malformed-condition error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedCondition {
            message: message.into(),
        }
    }

    /// Create a formula error
    pub fn formula(message: impl Into<String>) -> Self {
        Self::FormulaError {
            message: message.into(),
        }
    }

    /// Create a hydration error
    pub fn hydration(rule_id: i64, message: impl Into<String>) -> Self {
        Self::HydrationError {
            rule_id,
            message: message.into(),
        }
    }
}
