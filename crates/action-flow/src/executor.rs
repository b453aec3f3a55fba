//! Step execution: every step goes through the retry envelope, then its
//! failure strategy decides whether the row survives.

use std::fmt::Display;
use std::future::Future;
use tracing::{debug, warn};

use crate::envelope::RetryEnvelope;
use crate::errors::FlowError;
use crate::types::{FailureStrategy, StepOutcome};

#[derive(Debug, Clone, Copy, Default)]
pub struct StepExecutor {
    envelope: RetryEnvelope,
}

impl StepExecutor {
    pub fn new(envelope: RetryEnvelope) -> Self {
        Self { envelope }
    }

    pub fn envelope(&self) -> &RetryEnvelope {
        &self.envelope
    }

    /// Runs `operation` under the envelope.
    ///
    /// `Abort` turns the final failure into `FlowError::StepFailed`; `Continue`
    /// returns it as [`StepOutcome::Tolerated`] so the caller can record it.
    pub async fn run<T, E, F, Fut>(
        &self,
        step: &str,
        strategy: FailureStrategy,
        operation: F,
    ) -> Result<StepOutcome<T>, FlowError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        debug!(step, strategy = ?strategy, "running step");
        match self.envelope.attempt_report(step, operation).await {
            Ok(value) => Ok(StepOutcome::Completed(value)),
            Err(failure) => match strategy {
                FailureStrategy::Abort => {
                    warn!(step, cause = %failure.cause, "row-level step failed");
                    Err(failure.into())
                }
                FailureStrategy::Continue => {
                    warn!(step, cause = %failure.cause, "field-level step failed, continuing");
                    Ok(StepOutcome::Tolerated(failure))
                }
            },
        }
    }

    /// Row-level step: the value, or the error that ends the row.
    pub async fn require<T, E, F, Fut>(&self, step: &str, operation: F) -> Result<T, FlowError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        match self.run(step, FailureStrategy::Abort, operation).await? {
            StepOutcome::Completed(value) => Ok(value),
            StepOutcome::Tolerated(failure) => Err(failure.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn executor() -> StepExecutor {
        StepExecutor::new(RetryEnvelope::new(Duration::ZERO))
    }

    #[tokio::test]
    async fn abort_surfaces_step_failure() {
        let err = executor()
            .require("Salvar", || async { Err::<(), _>("save button not found") })
            .await
            .expect_err("row-level");
        assert_eq!(
            err,
            FlowError::StepFailed {
                step_id: "Salvar".into(),
                reason: "save button not found".into(),
            }
        );
    }

    #[tokio::test]
    async fn continue_tolerates_failure() {
        let calls = AtomicU32::new(0);
        let outcome = executor()
            .run("Vara", FailureStrategy::Continue, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>("no panel") }
            })
            .await
            .expect("field-level never errors");
        assert_eq!(outcome.failure().map(|f| f.attempts), Some(2));
        assert!(outcome.completed().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn completed_value_passes_through() {
        let outcome = executor()
            .run("Fase", FailureStrategy::Continue, || async {
                Ok::<_, String>("Conhecimento")
            })
            .await
            .expect("ok");
        assert_eq!(outcome, StepOutcome::Completed("Conhecimento"));
    }

    #[test]
    fn sync_callers_can_block_on_steps() {
        let value = tokio_test::block_on(
            executor().require("Editar", || async { Ok::<_, String>(7) }),
        )
        .expect("ok");
        assert_eq!(value, 7);
    }
}
