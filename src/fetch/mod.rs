// src/fetch/mod.rs
//! Concurrent remote lookups with bounded parallelism and retry.
//!
//! Callers wrap each lookup in a [`FetchTask`], pick a [`RetryPolicy`] and
//! hand the batch to a [`FetchOrchestrator`]. Expensive lookups shared by
//! several tasks go through a caller-owned [`RequestCache`].

pub mod cache;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod progress;
pub mod retry;
pub mod task;
mod work_queue;

pub use cache::{CacheStats, RequestCache};
pub use error::{FetchError, FetchErrorClass};
pub use http::{classify_reqwest_error, classify_status, HttpFetcher};
pub use orchestrator::{default_worker_count, run_all, FailureMode, FetchOrchestrator};
pub use progress::{ProgressSink, ProgressSnapshot, ProgressTracker};
pub use retry::{retry_with_policy, RetryOutcome, RetryPolicy, RetryPredicate};
pub use task::{
    dedup_by_key, into_values, log_failures, summarize, BatchSummary, FetchOperation,
    FetchOutcome, FetchTask, TaskState,
};
