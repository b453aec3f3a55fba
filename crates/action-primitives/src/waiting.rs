//! Wait tiers and the polling loop every bounded wait runs on.

use crate::{errors::ActionError, types::WaitTier};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Interval between condition checks.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Timeouts backing each [`WaitTier`], in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitTiers {
    pub short_ms: u64,
    pub medium_ms: u64,
    pub long_ms: u64,
}

impl Default for WaitTiers {
    fn default() -> Self {
        Self {
            short_ms: 8_000,
            medium_ms: 20_000,
            long_ms: 40_000,
        }
    }
}

impl WaitTiers {
    pub fn duration(&self, tier: WaitTier) -> Duration {
        Duration::from_millis(match tier {
            WaitTier::Short => self.short_ms,
            WaitTier::Medium => self.medium_ms,
            WaitTier::Long => self.long_ms,
        })
    }
}

/// Runs `check` until it yields `Some`, an error, or `timeout` elapses.
///
/// The check always runs at least once, so a zero timeout still observes the
/// current state.
pub async fn poll_until<T, F, Fut>(timeout: Duration, mut check: F) -> Result<Option<T>, ActionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, ActionError>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = check().await? {
            return Ok(Some(value));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        sleep(POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn default_tiers() {
        let tiers = WaitTiers::default();
        assert_eq!(tiers.duration(WaitTier::Short), Duration::from_secs(8));
        assert_eq!(tiers.duration(WaitTier::Medium), Duration::from_secs(20));
        assert_eq!(tiers.duration(WaitTier::Long), Duration::from_secs(40));
    }

    #[tokio::test]
    async fn poll_returns_once_condition_holds() {
        let calls = AtomicU32::new(0);
        let outcome = poll_until(Duration::from_secs(2), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, ActionError>((n >= 2).then_some(n)) }
        })
        .await
        .expect("poll");
        assert_eq!(outcome, Some(2));
    }

    #[tokio::test]
    async fn zero_timeout_checks_once() {
        let calls = AtomicU32::new(0);
        let outcome = poll_until(Duration::ZERO, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<Option<()>, ActionError>(None) }
        })
        .await
        .expect("poll");
        assert!(outcome.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
