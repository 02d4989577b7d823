//! Valuation coordinator
//!
//! Applies the rule engine to stored listings: single-listing
//! evaluate/recompute with denormalized-field persistence, draft-rule
//! preview, the recompute triggers for rule/catalog/override writes,
//! and the background worker that drains the bulk-recompute queue.

use crate::config::CoordinatorConfig;
use crate::context::build_context;
use crate::error::{CoordinatorError, Result};
use crate::jobs::{JobQueue, RecomputeJob, RecomputeScope};
use crate::store::{CatalogRef, Store};
use dealbrain_core::breakdown::Breakdown;
use dealbrain_core::catalog::{Cpu, Listing};
use dealbrain_core::rule::{
    ListingOverride, ListingOverrides, Rule, RuleGroup, Ruleset, ValuationEngine,
};
use lru::LruCache;
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Optional composite-score hook; derivation itself is out of core
pub type Scorer = Arc<dyn Fn(&Listing, &Breakdown) -> Option<f64> + Send + Sync>;

/// Rule id used when injecting a draft rule for preview
const PREVIEW_RULE_ID: i64 = i64::MAX;

/// Result of a deadline-bounded recompute
#[derive(Debug, Clone)]
pub struct RecomputeOutcome {
    pub breakdown: Breakdown,
    /// True when the soft deadline passed and the stored value was
    /// returned while the recompute was deferred to the background
    pub stale: bool,
}

/// A proposed, unsaved rule to preview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDraft {
    /// Target group; absent means a synthetic trailing preview group
    #[serde(default)]
    pub group_id: Option<i64>,
    pub rule: Rule,
}

/// Per-listing preview outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewResult {
    pub listing_id: i64,
    pub matched: bool,
    pub before: f64,
    pub after: f64,
    pub delta: f64,
}

/// Aggregate preview over the sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewReport {
    pub matches: usize,
    pub average_delta: f64,
    pub results: Vec<PreviewResult>,
}

/// The valuation coordinator
#[derive(Clone)]
pub struct ValuationCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<Store>,
    engine: ValuationEngine,
    config: CoordinatorConfig,
    queue: JobQueue,
    cache: Mutex<LruCache<i64, Breakdown>>,
    scorer: Option<Scorer>,
}

#[derive(Debug, Clone, Copy, Default)]
struct DerivedMetrics {
    single: Option<f64>,
    multi: Option<f64>,
    single_adjusted: Option<f64>,
    multi_adjusted: Option<f64>,
}

impl ValuationCoordinator {
    /// Create a coordinator with default configuration
    ///
    /// Must be called within a tokio runtime: the background worker is
    /// spawned here.
    pub fn new(store: Arc<Store>) -> Self {
        Self::build(store, CoordinatorConfig::default(), None)
    }

    /// Create a coordinator with the given configuration
    pub fn with_config(store: Arc<Store>, config: CoordinatorConfig) -> Self {
        Self::build(store, config, None)
    }

    /// Create a coordinator with a composite-score hook
    pub fn with_scorer(store: Arc<Store>, config: CoordinatorConfig, scorer: Scorer) -> Self {
        Self::build(store, config, Some(scorer))
    }

    fn build(store: Arc<Store>, config: CoordinatorConfig, scorer: Option<Scorer>) -> Self {
        let (queue, rx) = JobQueue::new();
        let capacity =
            NonZeroUsize::new(config.cache_capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        let inner = Arc::new(Inner {
            store,
            engine: ValuationEngine::with_config(config.engine.clone()),
            config,
            queue,
            cache: Mutex::new(LruCache::new(capacity)),
            scorer,
        });
        tokio::spawn(run_worker(inner.clone(), rx));
        Self { inner }
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<Store> {
        &self.inner.store
    }

    // ==================== Evaluation API ====================

    /// Evaluate a listing without persisting anything
    ///
    /// The only side effect is filling the breakdown cache.
    pub async fn evaluate_listing(&self, listing_id: i64) -> Result<Breakdown> {
        if let Some(cached) = self.inner.cache.lock().get(&listing_id) {
            return Ok(cached.clone());
        }

        let listing = self.inner.load_listing(listing_id)?;
        let breakdown = self.inner.evaluate(&listing)?;
        self.inner
            .cache
            .lock()
            .put(listing_id, breakdown.clone());
        Ok(breakdown)
    }

    /// Evaluate a listing and persist the denormalized outputs
    pub async fn recompute_listing(&self, listing_id: i64) -> Result<Breakdown> {
        self.inner.recompute_listing_sync(listing_id)
    }

    /// Recompute with the request-path soft deadline
    ///
    /// Past the deadline the stored breakdown is returned with
    /// `stale = true` and the recompute is deferred to the background
    /// queue.
    pub async fn recompute_listing_with_deadline(
        &self,
        listing_id: i64,
    ) -> Result<RecomputeOutcome> {
        let inner = self.inner.clone();
        let task = tokio::task::spawn_blocking(move || inner.recompute_listing_sync(listing_id));

        let deadline = Duration::from_millis(self.inner.config.request_timeout_ms);
        match tokio::time::timeout(deadline, task).await {
            Ok(joined) => {
                let breakdown = joined
                    .map_err(|e| CoordinatorError::persistence(e.to_string()))??;
                Ok(RecomputeOutcome {
                    breakdown,
                    stale: false,
                })
            }
            Err(_) => {
                warn!(listing_id, "request-path recompute deferred to background");
                self.enqueue_bulk_recompute(RecomputeScope::Listing(listing_id));
                let listing = self.inner.load_listing(listing_id)?;
                let breakdown = listing.valuation_breakdown.ok_or_else(|| {
                    CoordinatorError::persistence("no stored breakdown to fall back on")
                })?;
                Ok(RecomputeOutcome {
                    breakdown,
                    stale: true,
                })
            }
        }
    }

    /// Evaluate a proposed, unsaved rule against sample listings
    pub async fn preview_rule(
        &self,
        draft: &RuleDraft,
        sample_listing_ids: &[i64],
    ) -> Result<PreviewReport> {
        let inner = &self.inner;
        let mut results = Vec::with_capacity(sample_listing_ids.len());
        let mut matches = 0;
        let mut delta_sum = 0.0;

        for &listing_id in sample_listing_ids {
            let listing = inner.load_listing(listing_id)?;
            let assembled = build_context(&listing, &inner.store)?;
            let ruleset = inner.effective_ruleset(&listing)?;
            let overrides =
                ListingOverrides::from_iter(&inner.store.overrides_for_listing(listing_id));

            let before = inner
                .engine
                .evaluate(&assembled.context, &ruleset, &overrides)
                .adjusted_price;

            let mut modified = ruleset;
            let mut rule = draft.rule.clone();
            rule.id = PREVIEW_RULE_ID;
            rule.is_active = true;
            match draft
                .group_id
                .and_then(|gid| modified.groups.iter_mut().find(|g| g.id == gid))
            {
                Some(group) => group.rules.push(rule),
                None => {
                    let group = RuleGroup::new(PREVIEW_RULE_ID, "Preview", "preview")
                        .with_display_order(i32::MAX)
                        .with_rule(rule);
                    modified.groups.push(group);
                }
            }

            let after_breakdown = inner
                .engine
                .evaluate(&assembled.context, &modified, &overrides);
            let matched = after_breakdown
                .groups
                .iter()
                .flat_map(|g| g.rules.iter())
                .find(|r| r.rule_id == PREVIEW_RULE_ID)
                .map(|r| r.state.contributes())
                .unwrap_or(false);

            let after = after_breakdown.adjusted_price;
            let delta = after - before;
            if matched {
                matches += 1;
            }
            delta_sum += delta;
            results.push(PreviewResult {
                listing_id,
                matched,
                before,
                after,
                delta,
            });
        }

        let average_delta = if results.is_empty() {
            0.0
        } else {
            delta_sum / results.len() as f64
        };
        Ok(PreviewReport {
            matches,
            average_delta,
            results,
        })
    }

    // ==================== Admin API ====================

    /// Enqueue a background recompute over a scope
    pub fn enqueue_bulk_recompute(&self, scope: RecomputeScope) -> Arc<RecomputeJob> {
        let targets = self.inner.resolve_targets(scope);
        self.inner.queue.enqueue(scope, targets)
    }

    /// The active job for a scope, if any
    pub fn active_job(&self, scope: RecomputeScope) -> Option<Arc<RecomputeJob>> {
        self.inner.queue.get_active(scope)
    }

    // ==================== Write triggers ====================

    /// Ruleset / group / rule write: bulk recompute of affected listings
    pub fn notify_ruleset_changed(&self, ruleset_id: i64) -> Arc<RecomputeJob> {
        self.inner.cache.lock().clear();
        self.enqueue_bulk_recompute(RecomputeScope::Ruleset(ruleset_id))
    }

    /// Catalog entity write: bulk recompute of referencing listings
    pub fn notify_catalog_changed(&self, entity: CatalogRef) -> Arc<RecomputeJob> {
        self.inner.cache.lock().clear();
        self.enqueue_bulk_recompute(RecomputeScope::Catalog(entity))
    }

    /// Override write: store it and recompute the listing synchronously
    pub async fn apply_override(&self, o: ListingOverride) -> Result<Breakdown> {
        let listing_id = o.listing_id;
        self.inner.store.upsert_override(o);
        self.inner.cache.lock().pop(&listing_id);
        self.inner.recompute_listing_sync(listing_id)
    }

    /// Override removal: drop it and recompute the listing synchronously
    pub async fn clear_override(&self, listing_id: i64, rule_id: i64) -> Result<Breakdown> {
        self.inner.store.remove_override(listing_id, rule_id);
        self.inner.cache.lock().pop(&listing_id);
        self.inner.recompute_listing_sync(listing_id)
    }

    pub(crate) fn inner_store(&self) -> &Arc<Store> {
        &self.inner.store
    }

    pub(crate) fn invalidate_cache(&self) {
        self.inner.cache.lock().clear();
    }
}

impl Inner {
    fn load_listing(&self, listing_id: i64) -> Result<Listing> {
        self.store
            .get_listing(listing_id)
            .ok_or(CoordinatorError::ListingNotFound { id: listing_id })
    }

    /// The ruleset a listing evaluates under: explicit pin, else the
    /// active selection
    fn effective_ruleset(&self, listing: &Listing) -> Result<Ruleset> {
        match listing.ruleset_id {
            Some(id) => self
                .store
                .get_ruleset(id)
                .ok_or(CoordinatorError::RulesetNotFound { id }),
            None => self
                .store
                .active_ruleset()
                .ok_or(CoordinatorError::NoActiveRuleset),
        }
    }

    /// Evaluate one listing against its effective ruleset
    fn evaluate(&self, listing: &Listing) -> Result<Breakdown> {
        let assembled = build_context(listing, &self.store)?;
        let ruleset = self.effective_ruleset(listing)?;
        let overrides = ListingOverrides::from_iter(&self.store.overrides_for_listing(listing.id));

        let mut breakdown = self
            .engine
            .evaluate(&assembled.context, &ruleset, &overrides);
        breakdown.has_integrity_warning = assembled.has_integrity_warning();
        Ok(breakdown)
    }

    /// Evaluate and persist the denormalized outputs
    fn recompute_listing_sync(&self, listing_id: i64) -> Result<Breakdown> {
        let listing = self.load_listing(listing_id)?;
        let breakdown = self.evaluate(&listing)?;

        let cpu = listing.cpu_id.and_then(|id| self.store.get_cpu(id));
        let metrics = derived_metrics(listing.base_price, cpu.as_ref(), &breakdown);
        let composite_score = self
            .scorer
            .as_ref()
            .and_then(|scorer| scorer(&listing, &breakdown));

        let persisted = self.store.update_listing(listing_id, |l| {
            l.adjusted_price = Some(breakdown.adjusted_price);
            l.valuation_breakdown = Some(breakdown.clone());
            l.dollar_per_cpu_mark_single = metrics.single;
            l.dollar_per_cpu_mark_multi = metrics.multi;
            l.dollar_per_cpu_mark_single_adjusted = metrics.single_adjusted;
            l.dollar_per_cpu_mark_multi_adjusted = metrics.multi_adjusted;
            if composite_score.is_some() {
                l.composite_score = composite_score;
            }
            l.last_valuation_error = None;
        });
        if !persisted {
            return Err(CoordinatorError::ListingNotFound { id: listing_id });
        }

        self.cache.lock().pop(&listing_id);
        Ok(breakdown)
    }

    /// Resolve a scope to its listing ids, in stable ascending order
    fn resolve_targets(&self, scope: RecomputeScope) -> Vec<i64> {
        match scope {
            RecomputeScope::All => self.store.listing_ids(),
            RecomputeScope::Ruleset(id) => self.store.listing_ids_for_ruleset(id),
            RecomputeScope::Catalog(entity) => self.store.listings_referencing(entity),
            RecomputeScope::Listing(id) => vec![id],
        }
    }
}

/// The four $/CPU Mark metrics
///
/// Raw metrics divide the base price by the mark. Adjusted metrics use
/// the delta method: the effective price is the base price plus the sum
/// of negative contributions (deductions only). Every metric is null
/// unless both its inputs are positive.
fn derived_metrics(base_price: f64, cpu: Option<&Cpu>, breakdown: &Breakdown) -> DerivedMetrics {
    fn per_mark(price: f64, mark: Option<f64>) -> Option<f64> {
        match mark {
            Some(mark) if mark > 0.0 && price > 0.0 => Some(price / mark),
            _ => None,
        }
    }

    let single = cpu.and_then(|c| c.cpu_mark_single);
    let multi = cpu.and_then(|c| c.cpu_mark_multi);
    let effective_price = base_price + breakdown.total_deductions();

    DerivedMetrics {
        single: per_mark(base_price, single),
        multi: per_mark(base_price, multi),
        single_adjusted: per_mark(effective_price, single),
        multi_adjusted: per_mark(effective_price, multi),
    }
}

/// Background worker: drains the job queue one job at a time,
/// parallelizing within a batch
async fn run_worker(inner: Arc<Inner>, mut rx: mpsc::UnboundedReceiver<Arc<RecomputeJob>>) {
    while let Some(job) = rx.recv().await {
        job.mark_running();
        info!(job_id = job.id, scope = ?job.scope, "job started");

        loop {
            if job.is_cancelled() {
                break;
            }
            let batch = job.next_batch(inner.config.batch_size);
            if batch.is_empty() {
                break;
            }

            let inner = inner.clone();
            let job_ref = job.clone();
            let joined = tokio::task::spawn_blocking(move || {
                batch.par_iter().for_each(|&listing_id| {
                    match inner.recompute_listing_sync(listing_id) {
                        Ok(_) => job_ref.record_success(),
                        Err(err) => {
                            warn!(listing_id, error = %err, "background recompute failed");
                            inner.store.update_listing(listing_id, |l| {
                                l.last_valuation_error = Some(err.to_string());
                            });
                            job_ref.record_failure();
                        }
                    }
                });
            })
            .await;

            if joined.is_err() {
                error!(job_id = job.id, "recompute batch panicked; cancelling job");
                job.cancel();
            }
        }

        job.mark_finished();
        inner.queue.finish(&job);
        info!(job_id = job.id, progress = ?job.progress(), "job finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealbrain_core::catalog::ListingCondition;
    use dealbrain_core::rule::{Action, ConditionMultipliers, OverrideAction, PercentBase};

    fn seeded_store() -> Arc<Store> {
        let store = Arc::new(Store::new());
        store.upsert_cpu(Cpu::new(7, "i5-8500T").with_marks(10000.0, 2500.0).with_tdp(35.0));
        store.upsert_ruleset(
            Ruleset::new(1, "default").with_group(
                RuleGroup::new(1, "Condition", "condition").with_rule(
                    dealbrain_core::rule::Rule::new(100, "used deduction")
                        .with_condition(dealbrain_core::rule::ConditionNode::equals(
                            "listing.condition",
                            "used",
                        ))
                        .with_action(Action::percentage(-20.0, PercentBase::RunningSubtotal)),
                ),
            ),
        );
        store.upsert_listing(
            Listing::new(1, "EliteDesk", 500.0, ListingCondition::Used).with_cpu(7),
        );
        store
    }

    #[tokio::test]
    async fn test_recompute_persists_denormalized_fields() {
        let store = seeded_store();
        let coordinator = ValuationCoordinator::new(store.clone());

        let breakdown = coordinator.recompute_listing(1).await.unwrap();
        assert_eq!(breakdown.adjusted_price, 400.0);

        let listing = store.get_listing(1).unwrap();
        assert_eq!(listing.adjusted_price, Some(400.0));
        assert!(listing.valuation_breakdown.is_some());
        // 500 / 10000 and 500 / 2500
        assert_eq!(listing.dollar_per_cpu_mark_multi, Some(0.05));
        assert_eq!(listing.dollar_per_cpu_mark_single, Some(0.2));
        // Delta method: effective price 400 (one -100 deduction)
        assert_eq!(listing.dollar_per_cpu_mark_multi_adjusted, Some(0.04));
        assert_eq!(listing.dollar_per_cpu_mark_single_adjusted, Some(0.16));
        assert!(listing.last_valuation_error.is_none());
    }

    #[tokio::test]
    async fn test_metrics_null_without_cpu() {
        let store = seeded_store();
        store.upsert_listing(Listing::new(2, "no cpu", 300.0, ListingCondition::New));
        let coordinator = ValuationCoordinator::new(store.clone());

        coordinator.recompute_listing(2).await.unwrap();
        let listing = store.get_listing(2).unwrap();
        assert!(listing.dollar_per_cpu_mark_multi.is_none());
        assert!(listing.dollar_per_cpu_mark_single_adjusted.is_none());
        assert!(listing.adjusted_price.is_some());
    }

    #[tokio::test]
    async fn test_evaluate_fills_cache_without_persisting() {
        let store = seeded_store();
        let coordinator = ValuationCoordinator::new(store.clone());

        let breakdown = coordinator.evaluate_listing(1).await.unwrap();
        assert_eq!(breakdown.adjusted_price, 400.0);
        assert!(store.get_listing(1).unwrap().adjusted_price.is_none());

        // Second call hits the cache and agrees
        let again = coordinator.evaluate_listing(1).await.unwrap();
        assert_eq!(again, breakdown);
    }

    #[tokio::test]
    async fn test_integrity_warning_flagged() {
        let store = seeded_store();
        store.upsert_listing(
            Listing::new(3, "dangling cpu", 300.0, ListingCondition::Used).with_cpu(999),
        );
        let coordinator = ValuationCoordinator::new(store);

        let breakdown = coordinator.evaluate_listing(3).await.unwrap();
        assert!(breakdown.has_integrity_warning);
    }

    #[tokio::test]
    async fn test_apply_override_recomputes_synchronously() {
        let store = seeded_store();
        let coordinator = ValuationCoordinator::new(store.clone());
        coordinator.recompute_listing(1).await.unwrap();

        let breakdown = coordinator
            .apply_override(ListingOverride {
                listing_id: 1,
                rule_id: 100,
                action: OverrideAction::ReplaceWithFixed {
                    amount: -50.0,
                    condition_multipliers: Some(ConditionMultipliers::default()),
                },
            })
            .await
            .unwrap();

        assert_eq!(breakdown.adjusted_price, 450.0);
        assert_eq!(store.get_listing(1).unwrap().adjusted_price, Some(450.0));

        let restored = coordinator.clear_override(1, 100).await.unwrap();
        assert_eq!(restored.adjusted_price, 400.0);
    }

    #[tokio::test]
    async fn test_bulk_recompute_job() {
        let store = seeded_store();
        for id in 2..=5 {
            store.upsert_listing(
                Listing::new(id, "batch", 100.0 * id as f64, ListingCondition::Used).with_cpu(7),
            );
        }
        let coordinator = ValuationCoordinator::with_config(
            store.clone(),
            CoordinatorConfig {
                batch_size: 2,
                ..CoordinatorConfig::default()
            },
        );

        let job = coordinator.enqueue_bulk_recompute(RecomputeScope::All);
        job.wait().await;

        let progress = job.progress();
        assert_eq!(progress.total, 5);
        assert_eq!(progress.processed, 5);
        assert_eq!(progress.failed, 0);

        for id in 1..=5 {
            assert!(store.get_listing(id).unwrap().adjusted_price.is_some());
        }
    }

    #[tokio::test]
    async fn test_job_failure_recorded_on_listing_and_continues() {
        let store = seeded_store();
        // Pinned to a ruleset that does not exist: this one fails
        let mut broken = Listing::new(2, "broken", 100.0, ListingCondition::Used);
        broken.ruleset_id = Some(999);
        store.upsert_listing(broken);

        let coordinator = ValuationCoordinator::new(store.clone());
        let job = coordinator.enqueue_bulk_recompute(RecomputeScope::All);
        job.wait().await;

        let progress = job.progress();
        assert_eq!(progress.processed, 2);
        assert_eq!(progress.failed, 1);

        let broken = store.get_listing(2).unwrap();
        assert!(broken.last_valuation_error.as_deref().unwrap().contains("999"));
        // The healthy listing still recomputed
        assert!(store.get_listing(1).unwrap().adjusted_price.is_some());
    }

    #[tokio::test]
    async fn test_deadline_returns_stale_and_defers() {
        let store = seeded_store();
        let coordinator = ValuationCoordinator::new(store.clone());
        // Seed a stored breakdown first
        coordinator.recompute_listing(1).await.unwrap();

        let strict = ValuationCoordinator::with_config(
            store.clone(),
            CoordinatorConfig {
                request_timeout_ms: 0,
                ..CoordinatorConfig::default()
            },
        );

        let outcome = strict.recompute_listing_with_deadline(1).await.unwrap();
        assert!(outcome.stale);
        assert_eq!(outcome.breakdown.adjusted_price, 400.0);

        // The deferred background job completes the recompute; it may
        // already have drained by the time we look
        if let Some(job) = strict.active_job(RecomputeScope::Listing(1)) {
            job.wait().await;
        }
        assert_eq!(store.get_listing(1).unwrap().adjusted_price, Some(400.0));
    }

    #[tokio::test]
    async fn test_preview_rule() {
        let store = seeded_store();
        store.upsert_listing(
            Listing::new(2, "new unit", 500.0, ListingCondition::New).with_cpu(7),
        );
        let coordinator = ValuationCoordinator::new(store);

        let draft = RuleDraft {
            group_id: None,
            rule: dealbrain_core::rule::Rule::new(0, "used penalty")
                .with_condition(dealbrain_core::rule::ConditionNode::equals(
                    "listing.condition",
                    "used",
                ))
                .with_action(Action::fixed(-25.0)),
        };

        let report = coordinator.preview_rule(&draft, &[1, 2]).await.unwrap();
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.matches, 1);

        let used = &report.results[0];
        assert!(used.matched);
        assert_eq!(used.before, 400.0);
        assert_eq!(used.after, 375.0);
        assert_eq!(used.delta, -25.0);

        let new = &report.results[1];
        assert!(!new.matched);
        assert_eq!(new.delta, 0.0);

        assert_eq!(report.average_delta, -12.5);
    }

    #[tokio::test]
    async fn test_scorer_hook_persists_composite_score() {
        let store = seeded_store();
        let scorer: Scorer =
            Arc::new(|listing, breakdown| Some(breakdown.adjusted_price / listing.base_price));
        let coordinator =
            ValuationCoordinator::with_scorer(store.clone(), CoordinatorConfig::default(), scorer);

        coordinator.recompute_listing(1).await.unwrap();
        assert_eq!(store.get_listing(1).unwrap().composite_score, Some(0.8));
    }

    #[test]
    fn test_derived_metrics_delta_method() {
        use dealbrain_core::breakdown::RulesetRef;

        let cpu = Cpu::new(1, "x").with_marks(10000.0, 2000.0);
        let breakdown = Breakdown {
            ruleset: RulesetRef {
                id: 1,
                name: "x".to_string(),
            },
            base_price: 1000.0,
            adjusted_price: 900.0,
            total_delta: -100.0,
            groups: Vec::new(),
            has_integrity_warning: false,
        };

        // No rule lines: no deductions, adjusted == raw metric on base
        let metrics = derived_metrics(1000.0, Some(&cpu), &breakdown);
        assert_eq!(metrics.multi, Some(0.1));
        assert_eq!(metrics.multi_adjusted, Some(0.1));

        let metrics = derived_metrics(0.0, Some(&cpu), &breakdown);
        assert!(metrics.multi.is_none());
    }
}
