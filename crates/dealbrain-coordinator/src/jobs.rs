//! Background recompute jobs
//!
//! Enqueues describe scopes; the worker drains them one job at a time,
//! processing listings in stable id order in batches. At most one job
//! is active per scope: a second enqueue coalesces into the running
//! job's remaining set, and ids it already processed chain a follow-up
//! job after completion. Cancellation lands at batch boundaries.

use crate::store::CatalogRef;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// What a recompute job covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum RecomputeScope {
    /// Every listing
    All,
    /// Listings whose effective ruleset is this one
    Ruleset(i64),
    /// Listings referencing a catalog entity
    Catalog(CatalogRef),
    /// A single listing (deferred request-path recompute)
    Listing(i64),
}

/// Operator-visible progress counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub total: usize,
    pub processed: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
struct JobProgress {
    total: AtomicUsize,
    processed: AtomicUsize,
    failed: AtomicUsize,
}

/// Job lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Cancelled,
}

/// One background recompute job
pub struct RecomputeJob {
    pub id: u64,
    pub scope: RecomputeScope,
    progress: JobProgress,
    status: Mutex<JobStatus>,
    cancelled: AtomicBool,
    /// Listing ids not yet processed, in stable ascending order
    remaining: Mutex<BTreeSet<i64>>,
    /// Listing ids this job already processed
    done: Mutex<BTreeSet<i64>>,
    /// Ids that arrived after processing; chained into a follow-up job
    chained: Mutex<BTreeSet<i64>>,
    started_at: Mutex<Option<DateTime<Utc>>>,
}

impl RecomputeJob {
    fn new(id: u64, scope: RecomputeScope, targets: Vec<i64>) -> Self {
        let remaining: BTreeSet<i64> = targets.into_iter().collect();
        let progress = JobProgress::default();
        progress.total.store(remaining.len(), Ordering::Relaxed);
        Self {
            id,
            scope,
            progress,
            status: Mutex::new(JobStatus::Queued),
            cancelled: AtomicBool::new(false),
            remaining: Mutex::new(remaining),
            done: Mutex::new(BTreeSet::new()),
            chained: Mutex::new(BTreeSet::new()),
            started_at: Mutex::new(None),
        }
    }

    /// Current progress counters
    pub fn progress(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            total: self.progress.total.load(Ordering::Relaxed),
            processed: self.progress.processed.load(Ordering::Relaxed),
            failed: self.progress.failed.load(Ordering::Relaxed),
        }
    }

    /// Current lifecycle status
    pub fn status(&self) -> JobStatus {
        *self.status.lock()
    }

    /// When the worker picked the job up
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        *self.started_at.lock()
    }

    /// Request cancellation; honored at the next batch boundary
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Wait until the job leaves the queue/running states
    pub async fn wait(&self) {
        loop {
            match self.status() {
                JobStatus::Completed | JobStatus::Cancelled => return,
                _ => tokio::time::sleep(std::time::Duration::from_millis(5)).await,
            }
        }
    }

    pub(crate) fn mark_running(&self) {
        *self.status.lock() = JobStatus::Running;
        *self.started_at.lock() = Some(Utc::now());
    }

    pub(crate) fn mark_finished(&self) {
        *self.status.lock() = if self.is_cancelled() {
            JobStatus::Cancelled
        } else {
            JobStatus::Completed
        };
    }

    /// Take the next batch of ids, in ascending order
    pub(crate) fn next_batch(&self, batch_size: usize) -> Vec<i64> {
        let mut remaining = self.remaining.lock();
        let batch: Vec<i64> = remaining.iter().take(batch_size).copied().collect();
        let mut done = self.done.lock();
        for id in &batch {
            remaining.remove(id);
            done.insert(*id);
        }
        batch
    }

    /// Union new targets into this job
    ///
    /// Unprocessed ids join the remaining set; already-processed ids
    /// are parked for a chained follow-up job.
    pub(crate) fn merge_targets(&self, targets: impl IntoIterator<Item = i64>) {
        let mut remaining = self.remaining.lock();
        let done = self.done.lock();
        let mut chained = self.chained.lock();
        for id in targets {
            if done.contains(&id) {
                chained.insert(id);
            } else if remaining.insert(id) {
                self.progress.total.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub(crate) fn record_success(&self) {
        self.progress.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.progress.processed.fetch_add(1, Ordering::Relaxed);
        self.progress.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn take_chained(&self) -> BTreeSet<i64> {
        std::mem::take(&mut *self.chained.lock())
    }
}

/// Scope-keyed job queue
///
/// The unique active entry per scope mirrors a job-table row keyed on
/// `(scope_kind, scope_id, status='active')`.
pub struct JobQueue {
    active: Mutex<HashMap<RecomputeScope, Arc<RecomputeJob>>>,
    tx: mpsc::UnboundedSender<Arc<RecomputeJob>>,
    next_job_id: AtomicU64,
}

impl JobQueue {
    /// Create a queue and the worker's receiving end
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Arc<RecomputeJob>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                active: Mutex::new(HashMap::new()),
                tx,
                next_job_id: AtomicU64::new(1),
            },
            rx,
        )
    }

    /// Enqueue a scope with its resolved listing ids
    ///
    /// Coalesces into an already-active job for the same scope.
    pub fn enqueue(&self, scope: RecomputeScope, targets: Vec<i64>) -> Arc<RecomputeJob> {
        let mut active = self.active.lock();

        if let Some(job) = active.get(&scope) {
            if !matches!(job.status(), JobStatus::Completed | JobStatus::Cancelled) {
                info!(job_id = job.id, ?scope, "coalescing into active job");
                job.merge_targets(targets);
                return job.clone();
            }
        }

        let job = Arc::new(RecomputeJob::new(
            self.next_job_id.fetch_add(1, Ordering::Relaxed),
            scope,
            targets,
        ));
        active.insert(scope, job.clone());
        info!(job_id = job.id, ?scope, total = job.progress().total, "job enqueued");
        // The receiver only drops on shutdown; a failed send leaves the
        // job visible but never picked up
        let _ = self.tx.send(job.clone());
        job
    }

    /// The active job for a scope, if any
    pub fn get_active(&self, scope: RecomputeScope) -> Option<Arc<RecomputeJob>> {
        self.active.lock().get(&scope).cloned()
    }

    /// Retire a finished job, chaining a follow-up if targets arrived
    /// after their ids were already processed
    pub(crate) fn finish(&self, job: &Arc<RecomputeJob>) -> Option<Arc<RecomputeJob>> {
        {
            let mut active = self.active.lock();
            if let Some(current) = active.get(&job.scope) {
                if Arc::ptr_eq(current, job) {
                    active.remove(&job.scope);
                }
            }
        }

        let chained = job.take_chained();
        if chained.is_empty() || job.is_cancelled() {
            return None;
        }
        info!(job_id = job.id, count = chained.len(), "chaining follow-up job");
        Some(self.enqueue(job.scope, chained.into_iter().collect()))
    }
}
