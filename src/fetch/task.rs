// src/fetch/task.rs
//! Units of work handed to the orchestrator and the outcomes it records.

use super::error::FetchError;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

/// The ability to attempt one remote lookup.
///
/// The orchestrator calls `attempt` once per try, so implementations must be
/// safe to invoke repeatedly. Any closure returning a future of
/// `Result<V, FetchError>` implements this trait.
#[async_trait::async_trait]
pub trait FetchOperation<V>: Send + Sync {
    async fn attempt(&self) -> Result<V, FetchError>;
}

#[async_trait::async_trait]
impl<V, F, Fut> FetchOperation<V> for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<V, FetchError>> + Send + 'static,
    V: Send + 'static,
{
    async fn attempt(&self) -> Result<V, FetchError> {
        (self)().await
    }
}

/// One remote lookup, correlated with its outcome by `key`.
pub struct FetchTask<K, V> {
    pub key: K,
    operation: Arc<dyn FetchOperation<V>>,
}

impl<K, V> FetchTask<K, V> {
    pub fn new<O>(key: K, operation: O) -> Self
    where
        O: FetchOperation<V> + 'static,
    {
        Self {
            key,
            operation: Arc::new(operation),
        }
    }

    /// Builds a task from an operation that is already shared elsewhere.
    pub fn from_shared(key: K, operation: Arc<dyn FetchOperation<V>>) -> Self {
        Self { key, operation }
    }

    /// Splits the task into its key and its shared operation.
    pub fn into_parts(self) -> (K, Arc<dyn FetchOperation<V>>) {
        (self.key, self.operation)
    }
}

impl<K: fmt::Debug, V> fmt::Debug for FetchTask<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchTask").field("key", &self.key).finish()
    }
}

/// Lifecycle of a task inside a batch.
///
/// `Pending -> Running -> {Succeeded | Retrying -> Running | Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Retrying,
    Succeeded,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Retrying => "retrying",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        write!(f, "{}", label)
    }
}

/// Terminal record of one task.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome<K, V> {
    pub key: K,
    pub result: Result<V, FetchError>,
    /// Number of times the operation was invoked.
    pub attempts: u32,
}

impl<K, V> FetchOutcome<K, V> {
    pub fn value(&self) -> Option<&V> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.result.as_ref().err()
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn state(&self) -> TaskState {
        if self.is_success() {
            TaskState::Succeeded
        } else {
            TaskState::Failed
        }
    }
}

/// Counts of a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn is_complete_success(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} succeeded, {} failed",
            self.succeeded, self.total, self.failed
        )
    }
}

pub fn summarize<K, V>(outcomes: &[FetchOutcome<K, V>]) -> BatchSummary {
    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    BatchSummary {
        total: outcomes.len(),
        succeeded,
        failed: outcomes.len() - succeeded,
    }
}

/// Logs every failed outcome (key and error) at warn level and returns how
/// many there were. Callers decide whether partial results are acceptable.
pub fn log_failures<K: fmt::Display, V>(outcomes: &[FetchOutcome<K, V>]) -> usize {
    let mut failed = 0;
    for outcome in outcomes {
        if let Err(error) = &outcome.result {
            failed += 1;
            log::warn!(
                "Fetch for '{}' failed after {} attempt(s): {}",
                outcome.key,
                outcome.attempts,
                error
            );
        }
    }
    failed
}

/// Keeps the successful values, dropping failures.
pub fn into_values<K, V>(outcomes: Vec<FetchOutcome<K, V>>) -> Vec<V> {
    outcomes
        .into_iter()
        .filter_map(|outcome| outcome.result.ok())
        .collect()
}

/// Removes duplicates by an explicit identity, keeping the first occurrence
/// and the original order.
pub fn dedup_by_key<T, I, F>(items: impl IntoIterator<Item = T>, identity: F) -> Vec<T>
where
    I: Eq + Hash,
    F: Fn(&T) -> I,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(identity(item)))
        .collect()
}
