//! Coordinator error types

use dealbrain_core::error::ValuationError;
use thiserror::Error;

/// Coordinator error type
#[derive(Error, Debug, Clone)]
pub enum CoordinatorError {
    #[error("Listing not found: {id}")]
    ListingNotFound { id: i64 },

    #[error("Ruleset not found: {id}")]
    RulesetNotFound { id: i64 },

    /// No active ruleset exists and the listing carries no pin
    #[error("No active ruleset")]
    NoActiveRuleset,

    /// Context assembly failed (catalog rows could not be serialized)
    #[error("Context error: {message}")]
    Context { message: String },

    /// Stored state could not be read or written
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    #[error(transparent)]
    Core(#[from] ValuationError),
}

/// Coordinator Result type alias
pub type Result<T> = std::result::Result<T, CoordinatorError>;

impl CoordinatorError {
    /// Create a context-assembly error
    pub fn context(message: impl Into<String>) -> Self {
        Self::Context {
            message: message.into(),
        }
    }

    /// Create a persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }
}
