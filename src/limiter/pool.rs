//! # TokenPool: bounded counting semaphore.
//!
//! Fixed-capacity pool of anonymous tokens shared by the admission path and the
//! reconciler. Built on [`tokio::sync::Semaphore`] with permits that are
//! *forgotten* on acquisition: a token stays consumed until someone calls
//! [`TokenPool::try_release`], possibly from a different task than the one that took it.
//!
//! ## Operations
//! ```text
//! acquire(ctx, stale) ── blocks ──► Acquired { waited } | Canceled | Stale
//! try_acquire()       ── never blocks ──► bool
//! try_release()       ── never blocks ──► bool (false when nothing is claimed)
//! available()         ── live count, read on demand
//! ```
//!
//! ## Invariants
//! - `0 <= available() <= capacity()` at all times.
//! - Losing the acquisition race never consumes a token: the semaphore's acquire
//!   future takes the permit only when it completes, and a dropped future takes nothing.
//! - `available() + in_use() <= capacity()`, with equality whenever no waiter holds a
//!   permit it has not claimed yet.
//! - A return only ever gives back a token that was actually taken: `try_release` checks
//!   the count of claimed tokens, not the semaphore, because a permit handed to a waiter
//!   that then loses the race goes back to the semaphore on its own.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;

use crate::context::Context;
use crate::error::ConfigError;
use crate::jobs::StaleSignal;

/// Outcome of a blocking [`TokenPool::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    /// A token was taken.
    Acquired {
        /// Time spent waiting.
        waited: Duration,
    },
    /// The context was cancelled first; no token was taken.
    Canceled,
    /// The staleness signal fired first; no token was taken.
    Stale,
}

/// Bounded pool of interchangeable capacity tokens.
#[derive(Debug)]
pub struct TokenPool {
    capacity: usize,
    tokens: Semaphore,
    /// Tokens claimed by a completed acquisition and not yet returned.
    consumed: Mutex<usize>,
}

impl TokenPool {
    /// Creates a pool with all `capacity` tokens available.
    ///
    /// A zero capacity is a configuration error: the limiter could never admit anything.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::MaxInFlight { got: capacity });
        }
        Ok(Self {
            capacity,
            tokens: Semaphore::new(capacity),
            consumed: Mutex::new(0),
        })
    }

    /// Configured capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tokens currently available.
    #[inline]
    pub fn available(&self) -> usize {
        self.tokens.available_permits()
    }

    /// Tokens currently claimed and not yet returned.
    pub fn in_use(&self) -> usize {
        *self.consumed()
    }

    fn consumed(&self) -> MutexGuard<'_, usize> {
        self.consumed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Waits for a token, the context's cancellation, or the staleness signal,
    /// whichever comes first.
    ///
    /// ### Tie-break
    /// When several are ready at the same poll, cancellation wins over staleness,
    /// and both win over a free token.
    pub async fn acquire(&self, ctx: &Context, stale: &StaleSignal) -> Acquisition {
        let start = Instant::now();
        tokio::select! {
            biased;
            _ = ctx.cancelled() => Acquisition::Canceled,
            _ = stale.fired() => Acquisition::Stale,
            res = self.tokens.acquire() => match res {
                Ok(permit) => {
                    let mut consumed = self.consumed();
                    permit.forget();
                    *consumed += 1;
                    Acquisition::Acquired { waited: start.elapsed() }
                }
                // The pool never closes its semaphore.
                Err(_closed) => Acquisition::Canceled,
            },
        }
    }

    /// Takes a token if one is available. Never blocks.
    pub fn try_acquire(&self) -> bool {
        match self.tokens.try_acquire() {
            Ok(permit) => {
                let mut consumed = self.consumed();
                permit.forget();
                *consumed += 1;
                true
            }
            Err(_) => false,
        }
    }

    /// Returns one token unless none is claimed. Never blocks on waiters.
    ///
    /// Returns whether a token was actually added back.
    pub fn try_release(&self) -> bool {
        let mut consumed = self.consumed();
        if *consumed == 0 {
            return false;
        }
        *consumed -= 1;
        self.tokens.add_permits(1);
        true
    }
}
