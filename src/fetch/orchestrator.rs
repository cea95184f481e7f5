// src/fetch/orchestrator.rs
//! Bounded concurrent execution of fetch tasks.
//!
//! A batch spawns at most `max_workers` worker tasks that pull task indices
//! from a shared queue. Each worker drives one task at a time through the
//! retry policy, so no more than `max_workers` operations ever run at once.
//! The pool lives only for the duration of one [`FetchOrchestrator::run_all`]
//! call.

use super::error::FetchError;
use super::progress::{ProgressSink, ProgressTracker};
use super::retry::{retry_until_cancelled, RetryOutcome, RetryPolicy};
use super::task::{summarize, FetchOperation, FetchOutcome, FetchTask};
use super::work_queue::{OutcomeSlots, TaskQueue};
use crate::constants::{AUTO_WORKERS_MAX, AUTO_WORKERS_MIN, MAX_WORKERS_LIMIT};
use crate::error::HarvestError;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinSet;

/// What a batch does when a task fails for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// Record the failure and keep going; every task runs.
    #[default]
    CollectErrors,
    /// Stop starting new tasks and fail the whole call.
    FailFast,
}

impl fmt::Display for FailureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CollectErrors => write!(f, "collect-errors"),
            Self::FailFast => write!(f, "fail-fast"),
        }
    }
}

/// Runs batches of fetch tasks under a bounded worker pool.
#[derive(Clone)]
pub struct FetchOrchestrator {
    policy: RetryPolicy,
    max_workers: usize,
    mode: FailureMode,
    progress: Option<ProgressSink>,
}

impl FetchOrchestrator {
    /// Creates an orchestrator. `max_workers` is clamped to
    /// `1..=MAX_WORKERS_LIMIT`.
    pub fn new(policy: RetryPolicy, max_workers: usize, mode: FailureMode) -> Self {
        let clamped = max_workers.clamp(1, MAX_WORKERS_LIMIT);
        if clamped != max_workers {
            log::warn!(
                "Requested {} workers, using {} (allowed 1..={})",
                max_workers,
                clamped,
                MAX_WORKERS_LIMIT
            );
        }
        Self {
            policy,
            max_workers: clamped,
            mode,
            progress: None,
        }
    }

    /// Creates an orchestrator sized to the machine: `num_cpus` clamped to
    /// a range that suits network-bound work.
    pub fn with_default_workers(policy: RetryPolicy, mode: FailureMode) -> Self {
        Self::new(policy, default_worker_count(), mode)
    }

    /// Registers a callback invoked with `(completed, total)` each time a
    /// task reaches a terminal state.
    pub fn with_progress<F>(mut self, sink: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(sink));
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn mode(&self) -> FailureMode {
        self.mode
    }

    /// Runs every task and returns one outcome per task, in submission
    /// order. Callers should correlate by `key`, not by position.
    ///
    /// In [`FailureMode::FailFast`] the first task to fail stops queued
    /// tasks from starting; running attempts finish but are not retried,
    /// and the call returns [`HarvestError::BatchAborted`] carrying that
    /// task's error.
    pub async fn run_all<K, V>(
        &self,
        tasks: Vec<FetchTask<K, V>>,
    ) -> Result<Vec<FetchOutcome<K, V>>, HarvestError>
    where
        K: fmt::Display,
        V: Send + 'static,
    {
        self.run_all_labelled(tasks, |key| key.to_string()).await
    }

    /// [`run_all`](Self::run_all) for keys without a `Display` impl.
    /// `label` names each task in logs and in [`HarvestError::BatchAborted`].
    pub async fn run_all_labelled<K, V, L>(
        &self,
        tasks: Vec<FetchTask<K, V>>,
        label: L,
    ) -> Result<Vec<FetchOutcome<K, V>>, HarvestError>
    where
        L: Fn(&K) -> String,
        V: Send + 'static,
    {
        let total = tasks.len();
        if total == 0 {
            log::debug!("Empty batch, nothing to fetch");
            return Ok(Vec::new());
        }

        let (keys, operations): (Vec<K>, Vec<_>) =
            tasks.into_iter().map(FetchTask::into_parts).unzip();
        let labels = keys.iter().map(label).collect();
        let worker_count = self.max_workers.min(total);

        log::info!(
            "Starting batch of {} task(s) on {} worker(s) ({}, up to {} attempt(s) each)",
            total,
            worker_count,
            self.mode,
            self.policy.max_attempts()
        );

        let batch = Arc::new(Batch {
            operations,
            labels,
            queue: TaskQueue::new(total),
            slots: OutcomeSlots::new(total),
            progress: ProgressTracker::new(total, self.progress.clone()),
            abort: Mutex::new(None),
            policy: self.policy.clone(),
            mode: self.mode,
        });

        let mut join_set = JoinSet::new();
        for worker_id in 0..worker_count {
            let batch = Arc::clone(&batch);
            join_set.spawn(async move { run_worker_loop(worker_id, &batch).await });
        }

        // Wait for all workers to complete
        while let Some(result) = join_set.join_next().await {
            result?;
        }

        if let Some(abort) = batch.abort.lock().take() {
            log::error!(
                "Batch aborted by '{}' after {} of {} task(s) started: {}",
                abort.label,
                batch.queue.started(),
                total,
                abort.error
            );
            return Err(HarvestError::BatchAborted {
                key: abort.label,
                attempts: abort.attempts,
                source: abort.error,
            });
        }

        let outcomes = keys
            .into_iter()
            .zip(batch.slots.take_all())
            .enumerate()
            .map(|(index, (key, slot))| match slot {
                Some(RetryOutcome { result, attempts }) => Ok(FetchOutcome {
                    key,
                    result,
                    attempts,
                }),
                None => Err(HarvestError::InternalError {
                    message: format!(
                        "Task '{}' finished without an outcome",
                        batch.labels[index]
                    ),
                    source: None,
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        log::info!("Batch finished: {}", summarize(&outcomes));
        Ok(outcomes)
    }
}

impl fmt::Debug for FetchOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOrchestrator")
            .field("policy", &self.policy)
            .field("max_workers", &self.max_workers)
            .field("mode", &self.mode)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Runs `tasks` with a throwaway orchestrator.
pub async fn run_all<K, V>(
    tasks: Vec<FetchTask<K, V>>,
    policy: &RetryPolicy,
    max_workers: usize,
    mode: FailureMode,
) -> Result<Vec<FetchOutcome<K, V>>, HarvestError>
where
    K: fmt::Display,
    V: Send + 'static,
{
    FetchOrchestrator::new(policy.clone(), max_workers, mode)
        .run_all(tasks)
        .await
}

/// Worker count used when none is configured.
pub fn default_worker_count() -> usize {
    num_cpus::get().clamp(AUTO_WORKERS_MIN, AUTO_WORKERS_MAX)
}

/// State shared by the workers of one batch.
struct Batch<V> {
    operations: Vec<Arc<dyn FetchOperation<V>>>,
    labels: Vec<String>,
    queue: TaskQueue,
    slots: OutcomeSlots<RetryOutcome<V>>,
    progress: ProgressTracker,
    abort: Mutex<Option<AbortCause>>,
    policy: RetryPolicy,
    mode: FailureMode,
}

/// The failure that triggered a fail-fast abort.
struct AbortCause {
    label: String,
    attempts: u32,
    error: FetchError,
}

impl<V> Batch<V> {
    /// Records the first fatal failure and cancels the queue.
    fn abort_with(&self, label: &str, attempts: u32, error: &FetchError) {
        let mut abort = self.abort.lock();
        if abort.is_none() {
            *abort = Some(AbortCause {
                label: label.to_string(),
                attempts,
                error: error.clone(),
            });
        }
        self.queue.cancel();
    }
}

/// Runs the fetch loop for a single worker.
async fn run_worker_loop<V>(worker_id: usize, batch: &Batch<V>)
where
    V: Send + 'static,
{
    while let Some(index) = batch.queue.next_task() {
        let label = &batch.labels[index];
        log::debug!("Worker {} picked up '{}'", worker_id, label);

        let outcome = retry_until_cancelled(
            &batch.policy,
            batch.operations[index].as_ref(),
            batch.queue.cancellation(),
            label,
        )
        .await;

        let succeeded = outcome.result.is_ok();
        if let Err(error) = &outcome.result {
            log::warn!(
                "'{}' failed after {} attempt(s): {}",
                label,
                outcome.attempts,
                error
            );
            if batch.mode == FailureMode::FailFast {
                batch.abort_with(label, outcome.attempts, error);
            }
        }

        if !batch.slots.fill(index, outcome) {
            log::error!("Outcome for '{}' was recorded twice", label);
        }
        batch.progress.record(succeeded);
    }

    log::debug!("Worker {} exiting", worker_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ok_task(key: u32) -> FetchTask<u32, u32> {
        FetchTask::new(key, move || async move { Ok::<_, FetchError>(key * 10) })
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let outcomes = run_all(
            Vec::<FetchTask<u32, u32>>::new(),
            &RetryPolicy::immediate(1),
            4,
            FailureMode::CollectErrors,
        )
        .await
        .unwrap();
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_outcomes_follow_submission_order() {
        let tasks = (0..20).map(ok_task).collect();
        let outcomes = run_all(tasks, &RetryPolicy::immediate(1), 4, FailureMode::CollectErrors)
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 20);
        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.key, i as u32);
            assert_eq!(outcome.value(), Some(&(i as u32 * 10)));
            assert_eq!(outcome.attempts, 1);
        }
    }

    #[tokio::test]
    async fn test_collect_errors_runs_everything() {
        let mut tasks: Vec<FetchTask<u32, u32>> = (0..5).map(ok_task).collect();
        tasks.push(FetchTask::new(99, || async {
            Err::<u32, _>(FetchError::not_found("99"))
        }));

        let outcomes = run_all(tasks, &RetryPolicy::immediate(2), 2, FailureMode::CollectErrors)
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 6);
        let failed: Vec<_> = outcomes.iter().filter(|o| !o.is_success()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].key, 99);
        assert_eq!(failed[0].attempts, 1);
    }

    #[tokio::test]
    async fn test_progress_called_once_per_task() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let orchestrator =
            FetchOrchestrator::new(RetryPolicy::immediate(1), 3, FailureMode::CollectErrors)
                .with_progress(move |_, total| {
                    assert_eq!(total, 12);
                    counter.fetch_add(1, Ordering::SeqCst);
                });

        orchestrator
            .run_all((0..12).map(ok_task).collect())
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 12);
    }

    #[tokio::test]
    async fn test_labelled_run_accepts_composite_keys() {
        let tasks: Vec<FetchTask<(u32, &str), u32>> = [(7, "page"), (8, "post")]
            .into_iter()
            .map(|key| FetchTask::new(key, move || async move { Ok::<_, FetchError>(key.0) }))
            .collect();

        let orchestrator =
            FetchOrchestrator::new(RetryPolicy::immediate(1), 2, FailureMode::CollectErrors);
        let outcomes = orchestrator
            .run_all_labelled(tasks, |(id, kind)| format!("{}-{}", kind, id))
            .await
            .unwrap();

        assert_eq!(outcomes[0].key, (7, "page"));
        assert_eq!(outcomes[1].value(), Some(&8));
    }

    #[tokio::test]
    async fn test_labelled_abort_reports_label() {
        let tasks: Vec<FetchTask<(u32, u32), u32>> = vec![FetchTask::new((3, 4), || async {
            Err::<u32, _>(FetchError::permanent("denied"))
        })];

        let orchestrator =
            FetchOrchestrator::new(RetryPolicy::immediate(1), 1, FailureMode::FailFast);
        let result = orchestrator
            .run_all_labelled(tasks, |(a, b)| format!("{}/{}", a, b))
            .await;

        assert!(matches!(result, Err(HarvestError::BatchAborted { ref key, .. }) if key == "3/4"));
    }

    #[test]
    fn test_worker_count_is_clamped() {
        let policy = RetryPolicy::immediate(1);
        assert_eq!(
            FetchOrchestrator::new(policy.clone(), 0, FailureMode::FailFast).max_workers(),
            1
        );
        assert_eq!(
            FetchOrchestrator::new(policy, 1000, FailureMode::FailFast).max_workers(),
            MAX_WORKERS_LIMIT
        );
        let auto = default_worker_count();
        assert!((AUTO_WORKERS_MIN..=AUTO_WORKERS_MAX).contains(&auto));
    }
}
