//! Retry logic with exponential backoff for transient service failures.
//!
//! Execution and monitoring talk to chain infrastructure that fails
//! transiently (RPC hiccups, mempool congestion). Those stages wrap their
//! service calls in [`retry_with_backoff`]; everything before the wallet
//! signs is cheap to re-run wholesale and is not retried piecemeal.
//!
//! # Example
//!
//! ```ignore
//! use chainflow_runtime::retry::{RetryPolicy, retry_with_backoff};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::builder()
//!     .max_retries(5)
//!     .initial_delay(Duration::from_millis(100))
//!     .max_delay(Duration::from_secs(10))
//!     .multiplier(2.0)
//!     .build();
//!
//! let receipt = retry_with_backoff(&policy, &cancel, || async {
//!     executor.execute(&norm, mode, wallet, route).await
//! }).await;
//! ```

use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Retry policy configuration for exponential backoff.
///
/// # Default Values
///
/// - `max_retries`: 3
/// - `initial_delay`: 250ms
/// - `max_delay`: 8 seconds
/// - `multiplier`: 2.0 (delay doubles each retry)
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the initial try.
    pub max_retries: usize,
    /// Initial delay before first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries (cap for exponential backoff).
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(8),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Create a new policy builder.
    #[must_use]
    pub const fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder {
            max_retries: None,
            initial_delay: None,
            max_delay: None,
            multiplier: None,
        }
    }

    /// Policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self { max_retries: 0, ..Self::default() }
    }

    /// Base delay for a given attempt number (0-indexed), before jitter.
    ///
    /// `delay = min(initial_delay * multiplier^attempt, max_delay)`
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return self.initial_delay.min(self.max_delay);
        }

        // Attempt counts stay tiny; the casts cannot overflow in practice.
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let delay_ms =
            self.initial_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let delay = Duration::from_millis(delay_ms as u64);

        delay.min(self.max_delay)
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder {
    max_retries: Option<usize>,
    initial_delay: Option<Duration>,
    max_delay: Option<Duration>,
    multiplier: Option<f64>,
}

impl RetryPolicyBuilder {
    /// Set maximum number of retries.
    #[must_use]
    pub const fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Set initial delay before first retry.
    #[must_use]
    pub const fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Set maximum delay (cap for exponential backoff).
    #[must_use]
    pub const fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Set multiplier for exponential backoff.
    #[must_use]
    pub const fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    /// Build the [`RetryPolicy`], filling unset fields from the defaults.
    #[must_use]
    pub fn build(self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        RetryPolicy {
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            initial_delay: self.initial_delay.unwrap_or(defaults.initial_delay),
            max_delay: self.max_delay.unwrap_or(defaults.max_delay),
            multiplier: self.multiplier.unwrap_or(defaults.multiplier),
        }
    }
}

/// Outcome of a retried operation.
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    /// Operation eventually succeeded.
    Ok(T),
    /// All attempts exhausted; the last error.
    Exhausted(E),
    /// Cancelled while waiting between attempts.
    Cancelled,
}

/// Retry an async operation with exponential backoff and jitter.
///
/// Jitter multiplies each delay by a random factor in `0.5..=1.0` to spread
/// out retries. Cancellation is observed between attempts only; an in-flight
/// call runs to completion (its result is then discarded by the caller's
/// staleness check).
pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
) -> RetryOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        if cancel.is_cancelled() {
            return RetryOutcome::Cancelled;
        }

        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempt, "operation succeeded after retry");
                    metrics::counter!("retry.recovered").increment(1);
                }
                return RetryOutcome::Ok(result);
            },
            Err(err) => {
                if attempt >= policy.max_retries {
                    tracing::warn!(
                        attempt,
                        max_retries = policy.max_retries,
                        error = %err,
                        "retries exhausted"
                    );
                    metrics::counter!("retry.exhausted").increment(1);
                    return RetryOutcome::Exhausted(err);
                }

                let base = policy.delay_for_attempt(attempt);
                let jitter = {
                    use rand::Rng;
                    rand::thread_rng().gen_range(0.5..=1.0)
                };
                let delay = base.mul_f64(jitter);

                tracing::debug!(attempt, ?delay, error = %err, "retrying after backoff");
                metrics::counter!("retry.attempt").increment(1);

                tokio::select! {
                    () = cancel.cancelled() => return RetryOutcome::Cancelled,
                    () = sleep(delay) => {},
                }
                attempt += 1;
            },
        }
    }
}

/// Child token that fires when the parent is cancelled or the deadline
/// elapses, whichever comes first.
///
/// Used by the monitor stage to bound polling without detaching from the
/// stage's own cancellation.
#[must_use]
pub fn deadline_token(parent: &CancellationToken, after: Duration) -> CancellationToken {
    let child = parent.child_token();
    let timer = child.clone();
    tokio::spawn(async move {
        tokio::select! {
            () = timer.cancelled() => {},
            () = sleep(after) => timer.cancel(),
        }
    });
    child
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn delay_grows_exponentially_and_caps() {
        let policy = RetryPolicy::builder()
            .initial_delay(Duration::from_millis(100))
            .max_delay(Duration::from_millis(350))
            .multiplier(2.0)
            .build();

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(350));
        assert_eq!(policy.delay_for_attempt(10), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let policy = RetryPolicy::builder()
            .max_retries(5)
            .initial_delay(Duration::from_millis(1))
            .build();
        let calls = AtomicUsize::new(0);

        let outcome = retry_with_backoff(&policy, &CancellationToken::new(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 { Err("transient".to_string()) } else { Ok(n) }
            }
        })
        .await;

        assert!(matches!(outcome, RetryOutcome::Ok(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_and_returns_last_error() {
        let policy = RetryPolicy::builder()
            .max_retries(2)
            .initial_delay(Duration::from_millis(1))
            .build();
        let calls = AtomicUsize::new(0);

        let outcome = retry_with_backoff(&policy, &CancellationToken::new(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>("still down".to_string()) }
        })
        .await;

        assert!(matches!(outcome, RetryOutcome::Exhausted(ref e) if e == "still down"));
        // Initial try plus two retries.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_first_attempt() {
        let token = CancellationToken::new();
        token.cancel();

        let outcome = retry_with_backoff(&RetryPolicy::default(), &token, || async {
            Ok::<_, String>(1)
        })
        .await;

        assert!(matches!(outcome, RetryOutcome::Cancelled));
    }

    #[tokio::test]
    async fn cancellation_during_backoff_is_observed() {
        let policy = RetryPolicy::builder()
            .max_retries(5)
            .initial_delay(Duration::from_secs(30))
            .build();
        let token = CancellationToken::new();
        let child = token.clone();

        let handle = tokio::spawn(async move {
            retry_with_backoff(&policy, &child, || async {
                Err::<(), _>("down".to_string())
            })
            .await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
        let outcome = handle.await.unwrap();
        assert!(matches!(outcome, RetryOutcome::Cancelled));
    }

    #[test]
    fn none_policy_never_retries() {
        assert_eq!(RetryPolicy::none().max_retries, 0);
    }

    #[tokio::test]
    async fn deadline_token_fires_on_timeout() {
        let parent = CancellationToken::new();
        let token = deadline_token(&parent, Duration::from_millis(10));
        tokio::time::timeout(Duration::from_secs(1), token.cancelled()).await.unwrap();
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn deadline_token_follows_parent_cancellation() {
        let parent = CancellationToken::new();
        let token = deadline_token(&parent, Duration::from_secs(60));
        parent.cancel();
        tokio::time::timeout(Duration::from_secs(1), token.cancelled()).await.unwrap();
    }
}
