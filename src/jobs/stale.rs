//! # One-shot staleness signal.
//!
//! [`StaleSignal`] is produced by the upstream collaborator that discovered a job.
//! It fires when that collaborator no longer trusts its cached data about the job.
//! The limiter only observes it.
//!
//! ## Rules
//! - Once fired, a signal never un-fires.
//! - Firing is idempotent.
//! - Clones share state: firing any clone fires all of them.
//! - A timed signal's timer stops once the last clone is dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::{CancellationToken, DropGuard};

/// One-shot notification that a job's data is too old to act on.
#[derive(Clone, Debug, Default)]
pub struct StaleSignal {
    token: CancellationToken,
    // Stops the `after` timer once the last clone is dropped.
    _timer: Option<Arc<DropGuard>>,
}

impl StaleSignal {
    /// Creates a signal that fires only when [`fire`](Self::fire) is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a signal that fires automatically after `deadline`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn after(deadline: Duration) -> Self {
        let token = CancellationToken::new();
        let stop = CancellationToken::new();
        let (fire, stopped) = (token.clone(), stop.clone());
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(deadline) => fire.cancel(),
                _ = fire.cancelled() => {}
                _ = stopped.cancelled() => {}
            }
        });
        Self {
            token,
            _timer: Some(Arc::new(stop.drop_guard())),
        }
    }

    /// Marks the job as stale.
    pub fn fire(&self) {
        self.token.cancel();
    }

    /// True once the signal has fired.
    #[inline]
    pub fn is_stale(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves when the signal fires (immediately if it already has).
    pub async fn fired(&self) {
        self.token.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fire_is_sticky_and_shared() {
        let signal = StaleSignal::new();
        let observer = signal.clone();
        assert!(!observer.is_stale());

        signal.fire();
        signal.fire();
        assert!(observer.is_stale());
    }

    #[tokio::test(start_paused = true)]
    async fn fires_after_deadline() {
        let signal = StaleSignal::after(Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(9)).await;
        assert!(!signal.is_stale());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(signal.is_stale());
        signal.fired().await;
    }

    #[tokio::test(start_paused = true)]
    async fn timer_ends_with_last_clone() {
        let metrics = tokio::runtime::Handle::current().metrics();
        let baseline = metrics.num_alive_tasks();

        let signal = StaleSignal::after(Duration::from_secs(3600));
        let held = signal.clone();
        assert_eq!(metrics.num_alive_tasks(), baseline + 1);

        drop(signal);
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert_eq!(metrics.num_alive_tasks(), baseline + 1);
        assert!(!held.is_stale());

        drop(held);
        for _ in 0..8 {
            if metrics.num_alive_tasks() == baseline {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(metrics.num_alive_tasks(), baseline);
    }
}
