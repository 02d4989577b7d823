//! Evaluation context module
//!
//! Provides the dynamic value type and the read-only context the
//! evaluators resolve field paths against.

mod context;
mod value;

pub use context::EvaluationContext;
pub use value::Value;
