//! Per-unit metric registry
//!
//! A closed, explicit mapping from canonical metric names to context
//! accessors, initialized once. Adding a metric is an intentional code
//! change, not a runtime extension.

use crate::context::EvaluationContext;
use hashbrown::HashMap;

/// The closed metric table: canonical name -> context field path
const METRIC_PATHS: &[(&str, &str)] = &[
    ("ram_gb", "listing.ram.total_capacity_gb"),
    ("ram_speed_mhz", "listing.ram.speed_mhz"),
    ("primary_storage_gb", "listing.primary_storage.capacity_gb"),
    ("secondary_storage_gb", "listing.secondary_storage.capacity_gb"),
    ("cpu_tdp_w", "listing.cpu.tdp_w"),
    ("cpu_mark_multi", "listing.cpu.cpu_mark_multi"),
    ("cpu_mark_single", "listing.cpu.cpu_mark_single"),
    ("igpu_mark", "listing.cpu.igpu_mark"),
];

/// Closed registry of per-unit metrics
pub struct MetricRegistry {
    metrics: HashMap<&'static str, &'static str>,
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricRegistry {
    /// Create the registry over the built-in metric table
    pub fn new() -> Self {
        Self {
            metrics: METRIC_PATHS.iter().copied().collect(),
        }
    }

    /// Whether a metric name is part of the closed set
    pub fn contains(&self, name: &str) -> bool {
        self.metrics.contains_key(name)
    }

    /// Context field path backing a metric
    pub fn path(&self, name: &str) -> Option<&'static str> {
        self.metrics.get(name).copied()
    }

    /// Resolve a metric against the context
    ///
    /// `None` either means the name is unknown or the backing field is
    /// missing; use [`contains`](Self::contains) to tell them apart.
    pub fn resolve(&self, name: &str, ctx: &EvaluationContext) -> Option<f64> {
        self.metrics.get(name).and_then(|path| ctx.get_f64(path))
    }

    /// Names in the closed set, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.metrics.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
