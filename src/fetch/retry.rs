// src/fetch/retry.rs
//! Retry with exponential backoff and jitter.
//!
//! A [`RetryPolicy`] is plain data: how many attempts, how long to wait, and
//! which errors are worth another try. The loop that applies it lives here
//! too, so every call site configures a policy instead of writing its own
//! sleep-and-retry loop.

use super::error::FetchError;
use super::task::{FetchOperation, TaskState};
use super::work_queue::Cancellation;
use crate::constants::{DEFAULT_BASE_DELAY_SECONDS, DEFAULT_JITTER_SECONDS, DEFAULT_MAX_ATTEMPTS};
use crate::error::HarvestError;
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Decides whether a failed attempt may be retried.
pub type RetryPredicate = Arc<dyn Fn(&FetchError) -> bool + Send + Sync>;

/// How a task retries transient failures.
///
/// The wait after attempt `n` (counted from 1) is
/// `base_delay_seconds^n + uniform(jitter)` seconds, optionally capped.
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay_seconds: f64,
    jitter: (f64, f64),
    max_delay: Option<Duration>,
    retryable: RetryPredicate,
}

impl RetryPolicy {
    /// Creates a policy that retries transient errors.
    pub fn new(
        max_attempts: u32,
        base_delay_seconds: f64,
        jitter: (f64, f64),
    ) -> Result<Self, HarvestError> {
        if max_attempts == 0 {
            return Err(HarvestError::InvalidConfiguration(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if !base_delay_seconds.is_finite() || base_delay_seconds < 0.0 {
            return Err(HarvestError::InvalidConfiguration(format!(
                "base delay must be a non-negative number of seconds, got {}",
                base_delay_seconds
            )));
        }
        let (low, high) = jitter;
        if !low.is_finite() || !high.is_finite() || low < 0.0 || high < low {
            return Err(HarvestError::InvalidConfiguration(format!(
                "jitter range must satisfy 0 <= min <= max, got ({}, {})",
                low, high
            )));
        }

        Ok(Self {
            max_attempts,
            base_delay_seconds,
            jitter,
            max_delay: None,
            retryable: Arc::new(FetchError::is_retryable),
        })
    }

    /// A policy that never waits; handy for tests and local sources.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_seconds: 0.0,
            jitter: (0.0, 0.0),
            max_delay: None,
            retryable: Arc::new(FetchError::is_retryable),
        }
    }

    /// Replaces the retryable-error predicate.
    pub fn with_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&FetchError) -> bool + Send + Sync + 'static,
    {
        self.retryable = Arc::new(predicate);
        self
    }

    /// Caps every backoff wait.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    // --- Presets for the scraping stages ---

    /// Logging in and reading the category listing: slow page, few attempts.
    pub fn category_listing() -> Self {
        Self::preset(3, 2.5, (2.0, 4.0))
    }

    /// Opening one category page to collect its file links.
    pub fn category_page() -> Self {
        Self::preset(5, 2.5, (4.0, 6.0))
    }

    /// Resolving a related-post link to a post id.
    pub fn post_link() -> Self {
        Self::preset(3, 2.0, (0.0, 0.0))
    }

    /// Downloading and validating a file.
    pub fn download() -> Self {
        Self::preset(5, 2.0, (0.0, 1.0))
    }

    fn preset(max_attempts: u32, base_delay_seconds: f64, jitter: (f64, f64)) -> Self {
        Self {
            max_attempts,
            base_delay_seconds,
            jitter,
            max_delay: None,
            retryable: Arc::new(FetchError::is_retryable),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay_seconds(&self) -> f64 {
        self.base_delay_seconds
    }

    pub fn jitter(&self) -> (f64, f64) {
        self.jitter
    }

    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay
    }

    /// Whether the predicate accepts this error, ignoring the attempt count.
    pub fn is_retryable(&self, error: &FetchError) -> bool {
        (self.retryable)(error)
    }

    /// Whether a task that just failed its `attempt`-th try gets another.
    pub fn should_retry(&self, error: &FetchError, attempt: u32) -> bool {
        attempt < self.max_attempts && self.is_retryable(error)
    }

    /// The wait after the `attempt`-th failure, without jitter.
    pub fn base_backoff(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        self.cap(seconds(self.base_delay_seconds.powi(exponent)))
    }

    /// The wait after the `attempt`-th failure, with jitter drawn fresh.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let (low, high) = self.jitter;
        let jitter = if high > low {
            rand::rng().random_range(low..=high)
        } else {
            low
        };
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        self.cap(seconds(self.base_delay_seconds.powi(exponent) + jitter))
    }

    fn cap(&self, delay: Duration) -> Duration {
        match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::preset(
            DEFAULT_MAX_ATTEMPTS,
            DEFAULT_BASE_DELAY_SECONDS,
            DEFAULT_JITTER_SECONDS,
        )
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay_seconds", &self.base_delay_seconds)
            .field("jitter", &self.jitter)
            .field("max_delay", &self.max_delay)
            .finish_non_exhaustive()
    }
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
}

/// Result of driving one operation through a policy.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOutcome<T> {
    pub result: Result<T, FetchError>,
    pub attempts: u32,
}

/// Runs an operation until it succeeds, fails permanently, or runs out of
/// attempts.
pub async fn retry_with_policy<T, O>(policy: &RetryPolicy, operation: &O) -> RetryOutcome<T>
where
    O: FetchOperation<T> + ?Sized,
{
    let never_cancelled = Cancellation::new();
    retry_until_cancelled(policy, operation, &never_cancelled, "operation").await
}

/// The per-task state machine used by the orchestrator.
///
/// Once `cancellation` fires the task stops with its last error. This holds
/// both before a backoff starts and while one is in progress, so a
/// cancelled task never makes another attempt.
pub(crate) async fn retry_until_cancelled<T, O>(
    policy: &RetryPolicy,
    operation: &O,
    cancellation: &Cancellation,
    label: &str,
) -> RetryOutcome<T>
where
    O: FetchOperation<T> + ?Sized,
{
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        log::debug!("{}: {} (attempt {})", label, TaskState::Running, attempt);

        let error = match operation.attempt().await {
            Ok(value) => {
                log::debug!("{}: {} after {} attempt(s)", label, TaskState::Succeeded, attempt);
                return RetryOutcome {
                    result: Ok(value),
                    attempts: attempt,
                };
            }
            Err(error) => error,
        };

        if !policy.is_retryable(&error) {
            log::debug!("{}: {} with non-retryable error: {}", label, TaskState::Failed, error);
            return RetryOutcome {
                result: Err(error),
                attempts: attempt,
            };
        }

        if attempt >= policy.max_attempts() {
            log::warn!("{}: giving up after {} attempts: {}", label, attempt, error);
            return RetryOutcome {
                result: Err(FetchError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(error),
                }),
                attempts: attempt,
            };
        }

        if cancellation.is_cancelled() {
            log::debug!("{}: batch cancelled, not retrying", label);
            return RetryOutcome {
                result: Err(error),
                attempts: attempt,
            };
        }

        let delay = policy.backoff_delay(attempt);
        log::warn!(
            "{}: attempt {}/{} failed ({}), {} for {:?}",
            label,
            attempt,
            policy.max_attempts(),
            error,
            TaskState::Retrying,
            delay
        );
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancellation.cancelled() => {
                log::debug!("{}: batch cancelled during backoff, not retrying", label);
                return RetryOutcome {
                    result: Err(error),
                    attempts: attempt,
                };
            }
        }
    }
}
