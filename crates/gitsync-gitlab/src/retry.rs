//! Linear backoff retry logic for GitLab calls.

use crate::error::{GitlabError, GitlabResult};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Retry policy configuration.
///
/// Attempts are counted per call: a policy with `max_attempts = 3` runs the
/// call at most three times, sleeping `backoff * n` after the n-th failure.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Base delay, multiplied by the number of failures so far.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(5000),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// A policy that never sleeps between attempts.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Whether another attempt is allowed after `failures` failed attempts.
    #[must_use]
    pub fn should_retry(&self, failures: u32, error: &GitlabError) -> bool {
        failures < self.attempts() && error.is_retryable()
    }

    /// Delay to wait after the given number of failed attempts.
    ///
    /// A `Retry-After` hint from a rate-limited response wins when it is
    /// longer than the linear delay.
    #[must_use]
    pub fn delay_for(&self, failures: u32, error: &GitlabError) -> Duration {
        let linear = self.backoff.saturating_mul(failures);
        match error {
            GitlabError::RateLimited {
                retry_after_secs: Some(secs),
            } => linear.max(Duration::from_secs(*secs)),
            _ => linear,
        }
    }

    /// Execute an async operation with retry.
    ///
    /// Non-retryable errors are returned as-is on the first failure. Once all
    /// attempts are spent the last error is wrapped in
    /// [`GitlabError::MaxRetriesExceeded`].
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, f: F) -> GitlabResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = GitlabResult<T>>,
    {
        self.run(operation_name, f, |_| None).await
    }

    /// Execute a write with retry.
    ///
    /// A write whose response was lost may still have been applied. When an
    /// attempt fails after a transient failure of an earlier one,
    /// `already_applied` tells whether the error only reports that earlier
    /// write (e.g. 409 on a second add); the write then counts as done.
    pub async fn execute_write<F, Fut, A>(
        &self,
        operation_name: &str,
        already_applied: A,
        f: F,
    ) -> GitlabResult<()>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = GitlabResult<()>>,
        A: Fn(&GitlabError) -> bool,
    {
        self.run(operation_name, f, |error| already_applied(error).then_some(()))
            .await
    }

    async fn run<F, Fut, T, R>(&self, operation_name: &str, mut f: F, recover: R) -> GitlabResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = GitlabResult<T>>,
        R: Fn(&GitlabError) -> Option<T>,
    {
        let max = self.attempts();
        let mut failures: u32 = 0;
        loop {
            match f().await {
                Ok(value) => {
                    if failures > 0 {
                        debug!(
                            operation = operation_name,
                            attempt = failures + 1,
                            "Operation succeeded after retries"
                        );
                    }
                    return Ok(value);
                }
                Err(error) => {
                    // Every earlier attempt failed with a retryable error.
                    if failures > 0 {
                        if let Some(value) = recover(&error) {
                            info!(
                                operation = operation_name,
                                attempt = failures + 1,
                                error = %error,
                                "Write was applied by an earlier attempt"
                            );
                            return Ok(value);
                        }
                    }
                    failures += 1;
                    if !error.is_retryable() {
                        return Err(error);
                    }
                    if !self.should_retry(failures, &error) {
                        warn!(
                            operation = operation_name,
                            attempt = failures,
                            max_attempts = max,
                            error = %error,
                            "Attempt failed, giving up"
                        );
                        return Err(GitlabError::MaxRetriesExceeded {
                            attempts: failures,
                            message: format!(
                                "{operation_name} failed after {failures} attempt(s): {error}"
                            ),
                        });
                    }

                    let delay = self.delay_for(failures, &error);
                    warn!(
                        operation = operation_name,
                        attempt = failures,
                        max_attempts = max,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn server_error() -> GitlabError {
        GitlabError::Api {
            status: 503,
            detail: "service unavailable".into(),
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff, Duration::from_millis(5000));
    }

    #[test]
    fn test_should_retry_counts_total_attempts() {
        let policy = RetryPolicy::immediate(3);
        assert!(policy.should_retry(1, &server_error()));
        assert!(policy.should_retry(2, &server_error()));
        assert!(!policy.should_retry(3, &server_error()));
    }

    #[test]
    fn test_should_not_retry_permanent_error() {
        let policy = RetryPolicy::immediate(3);
        assert!(!policy.should_retry(1, &GitlabError::NotFound("user".into())));
    }

    #[test]
    fn test_delay_is_linear() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        assert_eq!(policy.delay_for(1, &server_error()), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2, &server_error()), Duration::from_millis(200));
        assert_eq!(policy.delay_for(4, &server_error()), Duration::from_millis(400));
    }

    #[test]
    fn test_delay_honours_retry_after() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        let error = GitlabError::RateLimited {
            retry_after_secs: Some(7),
        };
        assert_eq!(policy.delay_for(1, &error), Duration::from_secs(7));
    }

    #[tokio::test]
    async fn test_execute_succeeds_first_try() {
        let policy = RetryPolicy::immediate(3);
        let result = policy
            .execute("test_op", || async { Ok::<_, GitlabError>(42) })
            .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_execute_succeeds_after_retries() {
        let policy = RetryPolicy::immediate(3);
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = policy
            .execute("test_op", move || {
                let counter = counter_clone.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(server_error())
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
    async fn test_execute_gives_up_after_max_attempts() {
        let policy = RetryPolicy::immediate(3);
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: GitlabResult<()> = policy
            .execute("list_groups", move || {
                let counter = counter_clone.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(server_error())
                }
            })
            .await;

        match result {
            Err(GitlabError::MaxRetriesExceeded { attempts, message }) => {
                assert_eq!(attempts, 3);
                assert!(message.starts_with("list_groups failed after 3 attempt(s)"));
            }
            other => panic!("Expected MaxRetriesExceeded, got: {other:?}"),
        }
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_execute_permanent_error_fails_immediately() {
        let policy = RetryPolicy::immediate(3);
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: GitlabResult<()> = policy
            .execute("test_op", move || {
                let counter = counter_clone.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(GitlabError::Unauthorized("bad token".into()))
                }
            })
            .await;

        assert!(matches!(result, Err(GitlabError::Unauthorized(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let policy = RetryPolicy::immediate(0);
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: GitlabResult<()> = policy
            .execute("test_op", move || {
                let counter = counter_clone.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(server_error())
                }
            })
            .await;

        assert!(matches!(
            result,
            Err(GitlabError::MaxRetriesExceeded { attempts: 1, .. })
        ));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_sleeps_between_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_secs(5));
        let started = tokio::time::Instant::now();

        let _: GitlabResult<()> = policy
            .execute("test_op", || async { Err(server_error()) })
            .await;

        // 5s after the first failure, 10s after the second.
        assert!(started.elapsed() >= Duration::from_secs(15));
    }

    fn conflict() -> GitlabError {
        GitlabError::Api {
            status: 409,
            detail: "Member already exists".into(),
        }
    }

    #[tokio::test]
    async fn test_write_lost_then_conflict_counts_as_done() {
        let policy = RetryPolicy::immediate(3);
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = policy
            .execute_write("add_member", GitlabError::is_conflict, move || {
                let counter = counter_clone.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(server_error())
                    } else {
                        Err(conflict())
                    }
                }
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_write_conflict_on_first_attempt_is_an_error() {
        let policy = RetryPolicy::immediate(3);

        let result = policy
            .execute_write("add_member", GitlabError::is_conflict, || async {
                Err(conflict())
            })
            .await;

        assert!(matches!(result, Err(GitlabError::Api { status: 409, .. })));
    }

    #[tokio::test]
    async fn test_write_unrelated_error_after_retry_is_returned() {
        let policy = RetryPolicy::immediate(3);
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = policy
            .execute_write("remove_member", GitlabError::is_not_found, move || {
                let counter = counter_clone.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(server_error())
                    } else {
                        Err(GitlabError::Unauthorized("403 Forbidden".into()))
                    }
                }
            })
            .await;

        assert!(matches!(result, Err(GitlabError::Unauthorized(_))));
    }
}
