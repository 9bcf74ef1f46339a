//! Bounded retries with exponential backoff.
//!
//! [`execute`] drives an attempt closure until it succeeds, fails terminally,
//! or the attempt budget of a [`RetryPolicy`] runs out. Only the final
//! classification reaches the caller; intermediate failures are logged and,
//! through [`execute_traced`], recorded as [`AttemptOutcome`]s.

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use tokio::time::{sleep, Instant};

use crate::{AttemptFailure, BoatsError, ClientOptions, Result};

/// Default status predicate: every 5xx is retryable.
pub fn default_retryable_status(status: StatusCode) -> bool {
    status.is_server_error()
}

/// Attempt budget and backoff schedule.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Wait before the second attempt.
    pub base_delay: Duration,
    /// Growth factor between consecutive waits.
    pub backoff_multiplier: f64,
    /// Decides whether a non-success status is worth another attempt.
    pub retryable_status: fn(StatusCode) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&ClientOptions::default())
    }
}

impl From<&ClientOptions> for RetryPolicy {
    fn from(options: &ClientOptions) -> Self {
        Self {
            max_attempts: options.max_attempts,
            base_delay: Duration::from_millis(options.retry_backoff_ms),
            backoff_multiplier: options.backoff_multiplier,
            retryable_status: default_retryable_status,
        }
    }
}

impl RetryPolicy {
    /// Effective attempt budget, never below one.
    pub fn attempt_budget(&self) -> u32 {
        self.max_attempts.max(1)
    }

    fn multiplier(&self) -> f64 {
        if self.backoff_multiplier.is_nan() || self.backoff_multiplier < 1.0 {
            1.0
        } else {
            self.backoff_multiplier
        }
    }

    /// Wait inserted after failed attempt `attempt` (1-based):
    /// `base_delay * backoff_multiplier^(attempt - 1)`, saturating.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base_delay.as_secs_f64() * self.multiplier().powi(exp);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Sum of all waits spent before giving up after `attempts` failures.
    pub fn total_backoff(&self, attempts: u32) -> Duration {
        (1..attempts).fold(Duration::ZERO, |total, attempt| {
            total.saturating_add(self.delay_after(attempt))
        })
    }

    pub fn is_retryable_status(&self, status: StatusCode) -> bool {
        (self.retryable_status)(status)
    }
}

/// Failure of one attempt, as classified by the caller of [`execute`].
#[derive(Debug)]
pub enum AttemptError {
    /// Transient; another attempt may succeed.
    Retryable(AttemptFailure),
    /// Final; surfaced without further attempts.
    Terminal(BoatsError),
}

/// What happened during one attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutcomeKind {
    Success,
    RetryableFailure(AttemptFailure),
    TerminalFailure(String),
}

/// Record of a single attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttemptOutcome {
    /// 1-based attempt index.
    pub attempt: u32,
    /// Time spent in the attempt itself, backoff excluded.
    pub elapsed: Duration,
    pub kind: OutcomeKind,
}

/// Final result together with the per-attempt history.
#[derive(Debug)]
pub struct Traced<T> {
    pub result: Result<T>,
    pub attempts: Vec<AttemptOutcome>,
}

impl<T> Traced<T> {
    pub fn attempt_count(&self) -> u32 {
        self.attempts.len() as u32
    }
}

/// Runs `operation` under `policy` and returns only the final result.
pub async fn execute<T, F, Fut>(policy: &RetryPolicy, operation: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, AttemptError>>,
{
    execute_traced(policy, operation).await.result
}

/// Runs `operation` under `policy`, recording every attempt.
///
/// `operation` receives the 1-based attempt index. Backoff waits are
/// non-blocking and happen only between attempts, never after the last one.
pub async fn execute_traced<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Traced<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, AttemptError>>,
{
    let budget = policy.attempt_budget();
    let mut attempts = Vec::with_capacity(budget.min(16) as usize);
    let mut attempt = 1u32;

    loop {
        let started = Instant::now();
        let result = operation(attempt).await;
        let elapsed = started.elapsed();

        match result {
            Ok(value) => {
                attempts.push(AttemptOutcome {
                    attempt,
                    elapsed,
                    kind: OutcomeKind::Success,
                });
                return Traced {
                    result: Ok(value),
                    attempts,
                };
            }
            Err(AttemptError::Terminal(err)) => {
                attempts.push(AttemptOutcome {
                    attempt,
                    elapsed,
                    kind: OutcomeKind::TerminalFailure(err.to_string()),
                });
                return Traced {
                    result: Err(err),
                    attempts,
                };
            }
            Err(AttemptError::Retryable(failure)) => {
                attempts.push(AttemptOutcome {
                    attempt,
                    elapsed,
                    kind: OutcomeKind::RetryableFailure(failure.clone()),
                });

                if attempt >= budget {
                    tracing::warn!(attempts = attempt, %failure, "boats upstream unavailable");
                    return Traced {
                        result: Err(BoatsError::UpstreamUnavailable {
                            attempts: attempt,
                            last_failure: failure,
                        }),
                        attempts,
                    };
                }

                let delay = policy.delay_after(attempt);
                tracing::debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    %failure,
                    "retrying boats request"
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::StatusCode;
    use tokio::time::Instant;

    use super::{
        default_retryable_status, execute, execute_traced, AttemptError, OutcomeKind, RetryPolicy,
    };
    use crate::{AttemptFailure, BoatsError};

    fn policy(max_attempts: u32, base_ms: u64, multiplier: f64) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(base_ms),
            backoff_multiplier: multiplier,
            retryable_status: default_retryable_status,
        }
    }

    fn server_error() -> AttemptError {
        AttemptError::Retryable(AttemptFailure::Status {
            status: 500,
            body: "boom".to_owned(),
        })
    }

    #[test]
    fn delay_grows_exponentially() {
        let policy = policy(4, 300, 2.0);
        assert_eq!(policy.delay_after(1), Duration::from_millis(300));
        assert_eq!(policy.delay_after(2), Duration::from_millis(600));
        assert_eq!(policy.delay_after(3), Duration::from_millis(1200));
        assert_eq!(policy.total_backoff(4), Duration::from_millis(2100));
        assert_eq!(policy.total_backoff(1), Duration::ZERO);
    }

    #[test]
    fn out_of_range_settings_are_clamped() {
        let policy = policy(0, 100, 0.5);
        assert_eq!(policy.attempt_budget(), 1);
        assert_eq!(policy.delay_after(5), Duration::from_millis(100));
    }

    #[test]
    fn huge_backoff_saturates() {
        let policy = policy(u32::MAX, 1_000, 10.0);
        assert_eq!(policy.delay_after(500), Duration::MAX);
        assert_eq!(policy.total_backoff(600), Duration::MAX);
    }

    #[test]
    fn default_predicate_retries_only_server_errors() {
        assert!(default_retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(default_retryable_status(StatusCode::GATEWAY_TIMEOUT));
        assert!(!default_retryable_status(StatusCode::NOT_FOUND));
        assert!(!default_retryable_status(StatusCode::BAD_REQUEST));
        assert!(!default_retryable_status(StatusCode::TOO_MANY_REQUESTS));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_budget_minus_one_failures() {
        for max_attempts in 1..=5u32 {
            let policy = policy(max_attempts, 100, 2.0);
            let mut failures_left = max_attempts - 1;

            let traced = execute_traced(&policy, |_| {
                let fail = failures_left > 0;
                failures_left = failures_left.saturating_sub(1);
                async move {
                    if fail {
                        Err(server_error())
                    } else {
                        Ok("River Queen")
                    }
                }
            })
            .await;

            assert_eq!(traced.attempt_count(), max_attempts);
            assert_eq!(
                traced.attempts.last().map(|outcome| &outcome.kind),
                Some(&OutcomeKind::Success)
            );
            assert_eq!(traced.result.expect("must succeed"), "River Queen");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn exhausting_budget_reports_unavailable_after_full_backoff() {
        let policy = policy(4, 100, 2.0);
        let started = Instant::now();

        let traced = execute_traced(&policy, |_| async {
            Err::<(), _>(AttemptError::Retryable(AttemptFailure::Timeout))
        })
        .await;

        let elapsed = started.elapsed();
        assert_eq!(traced.attempt_count(), 4);
        assert!(elapsed >= policy.total_backoff(4));
        assert!(elapsed < policy.total_backoff(4) + Duration::from_millis(50));

        match traced.result {
            Err(BoatsError::UpstreamUnavailable {
                attempts,
                last_failure,
            }) => {
                assert_eq!(attempts, 4);
                assert_eq!(last_failure, AttemptFailure::Timeout);
            }
            other => panic!("expected upstream unavailable, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_failure_stops_immediately() {
        let policy = policy(5, 1_000, 2.0);
        let started = Instant::now();
        let mut calls = 0;

        let result = execute(&policy, |_| {
            calls += 1;
            async {
                Err::<(), _>(AttemptError::Terminal(BoatsError::NotFound {
                    id: "42".to_owned(),
                }))
            }
        })
        .await;

        assert_eq!(calls, 1);
        assert!(started.elapsed() < Duration::from_millis(1));
        assert!(matches!(result, Err(BoatsError::NotFound { id }) if id == "42"));
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_indices_are_sequential() {
        let policy = policy(3, 10, 1.0);
        let mut seen = Vec::new();

        let _ = execute(&policy, |attempt| {
            seen.push(attempt);
            async { Err::<(), _>(server_error()) }
        })
        .await;

        assert_eq!(seen, vec![1, 2, 3]);
    }
}
