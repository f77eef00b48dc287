//! Retry logic: bounded attempts with exponential backoff.
//!
//! - [`RetryConfig`]: attempt budget and backoff schedule
//! - [`RetryPolicy`]: a config plus a predicate deciding which errors are
//!   worth another attempt, applied around any async call
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> domain_replicator::Result<()> {
//! use domain_replicator::resilience::{RetryConfig, RetryPolicy};
//!
//! let policy = RetryPolicy::new(RetryConfig::default());
//! let value = policy
//!     .retry("fetch", || async { Ok::<_, domain_replicator::ReplicationError>(42) })
//!     .await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

use crate::clock::TimeSource;
use crate::error::{ReplicationError, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first call.
    pub max_attempts: usize,

    /// Delay before the second attempt.
    pub initial_delay: Duration,

    /// Ceiling for exponential backoff.
    pub max_delay: Duration,

    /// Backoff multiplier (e.g., 2.0 = double delay each retry).
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
        }
    }
}

impl RetryConfig {
    /// Single attempt, never sleeps.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_factor: 1.0,
        }
    }

    /// Fast-fail retry for tests.
    pub fn testing() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            backoff_factor: 2.0,
        }
    }

    /// Calculate delay after a given failed attempt (1-indexed).
    ///
    /// ```text
    /// Attempt  Delay (default config)
    /// -------  -----
    /// 1        50ms
    /// 2        100ms
    /// 3        200ms
    /// ...
    /// 6+       1s (cap)
    /// ```
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return self.initial_delay;
        }

        let exponent = (attempt - 1).min(i32::MAX as usize) as i32;
        let multiplier = self.backoff_factor.powi(exponent);
        let delay_secs = self.initial_delay.as_secs_f64() * multiplier;
        if !delay_secs.is_finite() || delay_secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        std::cmp::min(Duration::from_secs_f64(delay_secs), self.max_delay)
    }
}

/// Decides whether an error deserves another attempt.
pub type RetryPredicate = Arc<dyn Fn(&ReplicationError) -> bool + Send + Sync>;

/// Retry policy: (attempt budget, backoff schedule, retryable predicate).
///
/// Non-retryable errors are returned immediately. Retryable errors are
/// retried until `max_attempts` is exhausted, after which the last error
/// is returned.
///
/// Backoff sleeps on tokio time unless a [`TimeSource`] is attached with
/// [`with_time_source`](Self::with_time_source).
#[derive(Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    is_retryable: RetryPredicate,
    time_source: Option<Arc<dyn TimeSource>>,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("config", &self.config)
            .field("custom_clock", &self.time_source.is_some())
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    /// Policy retrying whatever [`ReplicationError::is_retryable`] accepts.
    pub fn new(config: RetryConfig) -> Self {
        Self::with_predicate(config, |e: &ReplicationError| e.is_retryable())
    }

    /// Policy with a custom retryable predicate.
    pub fn with_predicate<P>(config: RetryConfig, predicate: P) -> Self
    where
        P: Fn(&ReplicationError) -> bool + Send + Sync + 'static,
    {
        Self {
            config,
            is_retryable: Arc::new(predicate),
            time_source: None,
        }
    }

    /// Sleep between attempts on `time_source` instead of tokio time.
    pub fn with_time_source(mut self, time_source: Arc<dyn TimeSource>) -> Self {
        self.time_source = Some(time_source);
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Whether the predicate classifies `err` as transient.
    pub fn is_retryable(&self, err: &ReplicationError) -> bool {
        (self.is_retryable)(err)
    }

    /// Run `f` until it succeeds, fails permanently, or attempts run out.
    pub async fn retry<F, Fut, T>(&self, operation: &str, mut f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match f().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempts = attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if attempt < max_attempts && self.is_retryable(&e) => {
                    let delay = self.config.delay_for_attempt(attempt);
                    warn!(
                        operation,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retryable error, backing off"
                    );
                    crate::metrics::record_retry(operation, e.kind());
                    if !delay.is_zero() {
                        match &self.time_source {
                            Some(clock) => clock.sleep(delay).await,
                            None => tokio::time::sleep(delay).await,
                        }
                    }
                }
                Err(e) => {
                    if attempt > 1 {
                        warn!(operation, attempts = attempt, error = %e, "Retries exhausted");
                    }
                    return Err(e);
                }
            }
        }
    }
}
