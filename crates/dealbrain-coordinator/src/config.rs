//! Coordinator configuration

use dealbrain_core::config::EngineConfig;
use serde::{Deserialize, Serialize};

/// Valuation coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Listings per background-job batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Soft deadline for request-path recompute, in milliseconds;
    /// beyond it the request returns the stale value and the recompute
    /// is deferred to the background queue
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Breakdown LRU cache capacity
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Engine configuration passed through to evaluations
    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_batch_size() -> usize {
    100
}

fn default_request_timeout_ms() -> u64 {
    2_000
}

fn default_cache_capacity() -> usize {
    1_024
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            request_timeout_ms: default_request_timeout_ms(),
            cache_capacity: default_cache_capacity(),
            engine: EngineConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.request_timeout_ms, 2_000);
        assert_eq!(config.cache_capacity, 1_024);
    }

    #[test]
    fn test_partial_deserialization() {
        let config: CoordinatorConfig = serde_json::from_str(r#"{"batch_size": 10}"#).unwrap();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.request_timeout_ms, 2_000);
        assert_eq!(config.engine.max_condition_depth, 32);
    }
}
