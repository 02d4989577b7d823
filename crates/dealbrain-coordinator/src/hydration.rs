//! Hydration service
//!
//! Applies the core baseline hydrator to a stored ruleset, persists the
//! new rule generation and schedules the recompute that brings listing
//! valuations in line with the hydrated rules.

use crate::coordinator::ValuationCoordinator;
use crate::error::{CoordinatorError, Result};
use crate::jobs::RecomputeScope;
use dealbrain_core::rule::{hydrate_ruleset, HydrationResult};
use tracing::info;

impl ValuationCoordinator {
    /// Hydrate every baseline placeholder in a ruleset
    ///
    /// Idempotent: a ruleset whose placeholders all have live children
    /// is returned unchanged and no recompute is scheduled.
    pub async fn hydrate_ruleset(&self, ruleset_id: i64) -> Result<HydrationResult> {
        let store = self.inner_store().clone();
        let mut ruleset = store
            .get_ruleset(ruleset_id)
            .ok_or(CoordinatorError::RulesetNotFound { id: ruleset_id })?;

        let result = hydrate_ruleset(&mut ruleset, || store.allocate_id());

        if result.is_noop() {
            info!(ruleset_id, "hydration was a no-op");
            return Ok(result);
        }

        store.upsert_ruleset(ruleset);
        self.invalidate_cache();
        self.enqueue_bulk_recompute(RecomputeScope::Ruleset(ruleset_id));
        info!(
            ruleset_id,
            created = result.created.total(),
            failed = result.failed.len(),
            "ruleset hydrated"
        );
        Ok(result)
    }
}
