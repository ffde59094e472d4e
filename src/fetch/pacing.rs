//! Delay primitives for request politeness and browser settling.
//!
//! All waiting in the pipeline goes through a [`Sleeper`] so tests can
//! record delays instead of sleeping, and so a run can be aborted between
//! articles via the cancellation token.

use crate::config::{PolitenessConfig, delay_from_secs};
use crate::error::Cancelled;
use rand::{Rng, rng};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A cancellable wait.
pub trait Sleeper {
    async fn sleep(&self, duration: Duration) -> Result<(), Cancelled>;

    fn is_cancelled(&self) -> bool;
}

/// Real-time sleeper that returns early when the token is cancelled.
#[derive(Debug, Clone, Default)]
pub struct TokioSleeper {
    cancel: CancellationToken,
}

impl TokioSleeper {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }
}

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Randomized pause taken before every page request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolitenessPolicy {
    min: Duration,
    max: Duration,
}

impl PolitenessPolicy {
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Draw a delay uniformly from `[min, max]`.
    pub fn draw(&self) -> Duration {
        let lo = self.min.as_millis() as u64;
        let hi = self.max.as_millis() as u64;
        Duration::from_millis(rng().random_range(lo..=hi))
    }

    pub async fn pause<S: Sleeper>(&self, sleeper: &S) -> Result<(), Cancelled> {
        let delay = self.draw();
        debug!(?delay, "Politeness delay");
        sleeper.sleep(delay).await
    }
}

impl From<PolitenessConfig> for PolitenessPolicy {
    fn from(config: PolitenessConfig) -> Self {
        Self::new(
            delay_from_secs(config.min_delay_secs),
            delay_from_secs(config.max_delay_secs),
        )
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingSleeper;
    use super::*;

    #[test]
    fn test_draw_stays_within_bounds() {
        let policy = PolitenessPolicy::new(Duration::from_millis(200), Duration::from_millis(500));
        for _ in 0..200 {
            let d = policy.draw();
            assert!(d >= Duration::from_millis(200) && d <= Duration::from_millis(500));
        }
    }

    #[test]
    fn test_fixed_policy_when_bounds_equal() {
        let policy = PolitenessPolicy::new(Duration::from_secs(1), Duration::from_secs(1));
        assert_eq!(policy.draw(), Duration::from_secs(1));
    }

    #[test]
    fn test_inverted_bounds_are_swapped() {
        let policy = PolitenessPolicy::new(Duration::from_secs(5), Duration::from_secs(2));
        let d = policy.draw();
        assert!(d >= Duration::from_secs(2) && d <= Duration::from_secs(5));
    }

    #[test]
    fn test_from_config() {
        let policy = PolitenessPolicy::from(PolitenessConfig {
            min_delay_secs: 0.5,
            max_delay_secs: 0.5,
        });
        assert_eq!(policy.draw(), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_pause_goes_through_sleeper() {
        let sleeper = RecordingSleeper::new();
        let policy = PolitenessPolicy::new(Duration::from_millis(10), Duration::from_millis(20));
        policy.pause(&sleeper).await.unwrap();
        assert_eq!(sleeper.waits().len(), 1);
    }

    #[tokio::test]
    async fn test_tokio_sleeper_returns_early_on_cancel() {
        let token = CancellationToken::new();
        let sleeper = TokioSleeper::new(token.clone());
        token.cancel();
        let result = sleeper.sleep(Duration::from_secs(3600)).await;
        assert_eq!(result, Err(Cancelled));
        assert!(sleeper.is_cancelled());
    }

    #[tokio::test]
    async fn test_tokio_sleeper_completes_short_wait() {
        let sleeper = TokioSleeper::default();
        assert!(sleeper.sleep(Duration::from_millis(1)).await.is_ok());
    }
}
