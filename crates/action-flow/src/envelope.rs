//! The retry envelope: exactly two attempts separated by a fixed cool-down.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::types::AttemptFailure;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryEnvelope {
    cool_down: Duration,
}

impl Default for RetryEnvelope {
    fn default() -> Self {
        Self::new(Duration::from_millis(1200))
    }
}

impl RetryEnvelope {
    /// Total attempts per operation.
    pub const ATTEMPTS: u32 = 2;

    pub fn new(cool_down: Duration) -> Self {
        Self { cool_down }
    }

    pub fn cool_down(&self) -> Duration {
        self.cool_down
    }

    /// Runs `operation` up to [`Self::ATTEMPTS`] times. The final failure is
    /// logged and returned, never raised past the caller.
    pub async fn attempt_report<T, E, F, Fut>(
        &self,
        description: &str,
        mut operation: F,
    ) -> Result<T, AttemptFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => {
                    info!(description, attempt, "step succeeded");
                    return Ok(value);
                }
                Err(err) => {
                    let cause = err.to_string();
                    warn!(description, attempt, cause = %cause, "step failed");
                    if attempt >= Self::ATTEMPTS {
                        return Err(AttemptFailure {
                            description: description.to_string(),
                            attempts: attempt,
                            cause,
                        });
                    }
                    sleep(self.cool_down).await;
                    attempt += 1;
                }
            }
        }
    }

    /// `Some(result)` on success, `None` once both attempts failed.
    pub async fn attempt<T, E, F, Fut>(&self, description: &str, operation: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.attempt_report(description, operation).await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    fn instant() -> RetryEnvelope {
        RetryEnvelope::new(Duration::ZERO)
    }

    #[tokio::test]
    async fn failing_once_then_succeeding_returns_value() {
        let calls = AtomicU32::new(0);
        let result = instant()
            .attempt("open case", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err("suggestion not yet rendered")
                    } else {
                        Ok("0001234-56.2024")
                    }
                }
            })
            .await;
        assert_eq!(result, Some("0001234-56.2024"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failing_twice_gives_up_without_third_try() {
        let calls = AtomicU32::new(0);
        let result: Option<()> = instant()
            .attempt("select Comarca", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("panel never opened") }
            })
            .await;
        assert!(result.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unit_operations_report_success() {
        let result = instant()
            .attempt("click edit", || async { Ok::<(), String>(()) })
            .await;
        assert_eq!(result, Some(()));
    }

    #[tokio::test]
    async fn failure_report_carries_description_and_cause() {
        let failure = instant()
            .attempt_report("save", || async { Err::<(), _>("button detached") })
            .await
            .expect_err("fails");
        assert_eq!(failure.description, "save");
        assert_eq!(failure.attempts, 2);
        assert_eq!(failure.cause, "button detached");
        assert_eq!(
            failure.to_string(),
            "save failed after 2 attempt(s): button detached"
        );
    }

    #[tokio::test]
    async fn cool_down_separates_attempts() {
        let envelope = RetryEnvelope::new(Duration::from_millis(30));
        let started = Instant::now();
        let _ = envelope
            .attempt("slow", || async { Err::<(), _>("nope") })
            .await;
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn default_cool_down() {
        assert_eq!(RetryEnvelope::default().cool_down(), Duration::from_millis(1200));
    }
}
