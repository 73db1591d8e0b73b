//! `ExecuteDecision`: retry orchestration for the Decision Model layer
//! (§4.6).
//!
//! Adapted from this crate's own exponential-backoff retry policy, but
//! narrowed to retry on exactly one condition: an `AppendConditionFailed`
//! raised by a concurrent writer invalidating the decision the caller just
//! built. Every other error — business rule violations, I/O failures,
//! configuration errors — propagates on the first attempt.
//!
//! # Example
//!
//! ```
//! use dcb_runtime::execute_decision::{execute_decision, RetryPolicy};
//! use dcb_core::store::{EventStore, EventStoreError};
//! # use dcb_core::event::NewEvent;
//! # use dcb_core::tag::Tag;
//! # use serde_json::json;
//!
//! # async fn run(store: &dyn EventStore) -> Result<(), Box<dyn std::error::Error>> {
//! let outcome = execute_decision(RetryPolicy::default(), None, || async {
//!     store
//!         .append(
//!             vec![NewEvent::new("StudentRegistered.v1", json!({}))],
//!             None,
//!         )
//!         .await
//! })
//! .await?;
//! assert_eq!(outcome, ());
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, RuntimeError};
use dcb_core::store::EventStoreError;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;

/// Retry policy for `ExecuteDecision` (§4.6): `max_retries=3`,
/// `initial_delay_ms=50`, exponential backoff with a 2x multiplier capped at
/// `max_delay`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first.
    pub max_retries: usize,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Cap on backoff delay.
    pub max_delay: Duration,
    /// Multiplier applied to the delay on each subsequent retry.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry numbered `attempt` (0-indexed; `attempt=0` is
    /// the first retry, i.e. the delay after the initial failure).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return self.initial_delay;
        }
        let delay_ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);
        let delay = Duration::from_millis(delay_ms as u64);
        if delay > self.max_delay {
            self.max_delay
        } else {
            delay
        }
    }
}

/// A signal an in-flight `execute_decision` call checks before each attempt
/// and during backoff (§5: "Cancellation tokens MUST be honored before each
/// attempt and during any backoff").
pub type CancellationToken = watch::Receiver<bool>;

fn is_cancelled(token: Option<&CancellationToken>) -> bool {
    token.is_some_and(|token| *token.borrow())
}

/// Run `operation` under `policy`, retrying only on
/// `EventStoreError::AppendConditionFailed` (§4.6).
///
/// `operation` typically builds a decision model, derives a new event and
/// its `AppendCondition`, and appends — all inside the closure, so each
/// retry re-reads the current state rather than replaying a stale decision.
///
/// # Errors
///
/// - [`RuntimeError::Cancelled`] if `cancellation` is signalled before an
///   attempt or during backoff.
/// - [`RuntimeError::RetriesExhausted`] if every attempt fails with
///   `AppendConditionFailed`.
/// - [`RuntimeError::Store`] immediately, without retrying, for any other
///   `EventStoreError`.
pub async fn execute_decision<F, Fut, T>(
    policy: RetryPolicy,
    mut cancellation: Option<CancellationToken>,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, EventStoreError>>,
{
    let mut attempt = 0usize;

    loop {
        if is_cancelled(cancellation.as_ref()) {
            return Err(RuntimeError::Cancelled);
        }

        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    metrics::counter!("dcb_decision_retry_successes_total").increment(1);
                    tracing::info!(attempt, "decision succeeded after retry");
                }
                return Ok(value);
            }
            Err(EventStoreError::AppendConditionFailed) => {
                metrics::counter!("dcb_decision_retry_attempts_total").increment(1);
                if attempt >= policy.max_retries {
                    metrics::counter!("dcb_decision_retry_exhausted_total").increment(1);
                    tracing::warn!(
                        attempts = attempt + 1,
                        "decision retries exhausted on append condition failure"
                    );
                    return Err(RuntimeError::RetriesExhausted {
                        attempts: attempt + 1,
                    });
                }

                let delay = policy.delay_for_attempt(attempt);
                tracing::debug!(
                    attempt,
                    delay_ms = delay.as_millis(),
                    "append condition failed, retrying decision"
                );

                if let Some(token) = cancellation.as_mut() {
                    tokio::select! {
                        () = sleep(delay) => {}
                        result = token.changed() => {
                            if result.is_err() || *token.borrow() {
                                return Err(RuntimeError::Cancelled);
                            }
                        }
                    }
                } else {
                    sleep(delay).await;
                }
                attempt += 1;
            }
            Err(other) => return Err(RuntimeError::Store(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn delay_for_attempt_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(300),
            multiplier: 2.0,
        };
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(50));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn succeeds_on_first_try_without_retrying() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let result = execute_decision(RetryPolicy::default(), None, || {
            let c = Arc::clone(&counter_clone);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<_, EventStoreError>(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_only_on_append_condition_failed() {
        let policy = RetryPolicy {
            max_retries: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            multiplier: 2.0,
        };
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let result = execute_decision(policy, None, || {
            let c = Arc::clone(&counter_clone);
            async move {
                let attempt = c.fetch_add(1, Ordering::SeqCst);
                if attempt < 2 {
                    Err(EventStoreError::AppendConditionFailed)
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_propagates_immediately() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let result = execute_decision(RetryPolicy::default(), None, || {
            let c = Arc::clone(&counter_clone);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(EventStoreError::PositionNotFound(9))
            }
        })
        .await;

        assert!(matches!(result, Err(RuntimeError::Store(EventStoreError::PositionNotFound(9)))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausting_retries_reports_attempt_count() {
        let policy = RetryPolicy {
            max_retries: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            multiplier: 2.0,
        };
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let result = execute_decision(policy, None, || {
            let c = Arc::clone(&counter_clone);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(EventStoreError::AppendConditionFailed)
            }
        })
        .await;

        assert!(matches!(
            result,
            Err(RuntimeError::RetriesExhausted { attempts: 3 })
        ));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancellation_before_first_attempt_short_circuits() {
        let (tx, rx) = watch::channel(true);
        let _ = tx;
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let result = execute_decision(RetryPolicy::default(), Some(rx), || {
            let c = Arc::clone(&counter_clone);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<_, EventStoreError>(())
            }
        })
        .await;

        assert!(matches!(result, Err(RuntimeError::Cancelled)));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
