//! Engine configuration

use serde::{Deserialize, Serialize};

/// Limits enforced by the formula sandbox
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FormulaLimits {
    /// Maximum expression length in characters
    #[serde(default = "default_max_expression_len")]
    pub max_expression_len: usize,

    /// Evaluation wall-time cap in milliseconds
    #[serde(default = "default_formula_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_max_expression_len() -> usize {
    2_000
}

fn default_formula_timeout_ms() -> u64 {
    100
}

impl Default for FormulaLimits {
    fn default() -> Self {
        Self {
            max_expression_len: default_max_expression_len(),
            timeout_ms: default_formula_timeout_ms(),
        }
    }
}

/// Rule engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Safety cap on condition tree depth
    #[serde(default = "default_max_condition_depth")]
    pub max_condition_depth: usize,

    /// Formula sandbox limits
    #[serde(default)]
    pub formula: FormulaLimits,
}

fn default_max_condition_depth() -> usize {
    32
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_condition_depth: default_max_condition_depth(),
            formula: FormulaLimits::default(),
        }
    }
}
