//! Evaluation context
//!
//! A read-only view over the nested context document assembled by the
//! coordinator: `{ listing: { ...flat fields, cpu: {...}, gpu: {...},
//! ram: {...}, primary_storage: {...}, secondary_storage: {...},
//! ports: {...} } }`. Dotted field paths resolve here, and only here:
//! each segment steps into an object key or an array index, and any
//! miss along the way yields `None` rather than an error.

use super::Value;
use crate::catalog::ListingCondition;

/// Read-only evaluation context
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext {
    root: Value,
}

impl EvaluationContext {
    /// Create a context from an assembled document
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    /// Create a context from a JSON document
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let root: Value = serde_json::from_str(json)?;
        Ok(Self::new(root))
    }

    /// Get the root document
    #[inline]
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Resolve a dotted field path like `listing.cpu.cpu_mark_multi`
    ///
    /// Numeric segments index into arrays. Missing keys, out-of-range
    /// indices and steps through scalars all yield `None`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.root;
        for segment in path.split('.') {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Resolve a path to a float, coercing integers
    pub fn get_f64(&self, path: &str) -> Option<f64> {
        self.get(path).and_then(Value::as_f64)
    }

    /// The listing's immutable base price
    ///
    /// A context without a numeric `listing.base_price` values as zero.
    pub fn base_price(&self) -> f64 {
        self.get_f64("listing.base_price").unwrap_or(0.0)
    }

    /// The listing's condition, if present and recognized
    pub fn listing_condition(&self) -> Option<ListingCondition> {
        self.get("listing.condition")
            .and_then(Value::as_str)
            .and_then(ListingCondition::parse)
    }
}
