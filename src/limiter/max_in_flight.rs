//! # MaxInFlight: concurrency-limited admission.
//!
//! [`MaxInFlight`] is a [`JobHandler`] that gates the rest of the chain behind a
//! [`TokenPool`]. A job either wins a token and is forwarded, or gives up because
//! the caller's context was cancelled or its data went stale.
//!
//! ```text
//! handle(ctx, job)
//!   ├─ acquire(ctx, job.stale) ──► Canceled ──► Err(Canceled { cause })
//!   │                          ──► Stale    ──► Err(StaleJob)
//!   │                          ──► Acquired
//!   └─ next.handle(ctx, job)   ──► Ok       ──► token stays consumed
//!                              ──► Err(e)   ──► try_release, Err(e)
//! ```
//!
//! A token taken for a job that was forwarded successfully is not returned here:
//! it comes back through the [`Reconciler`] once the job's cluster resource finishes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::pool::{Acquisition, TokenPool};
use crate::context::{Context, DEFAULT_CAUSE};
use crate::error::{HandlerError, SyncError};
use crate::events::{Bus, Event, EventKind};
use crate::handlers::{HandlerRef, JobHandler};
use crate::jobs::Job;
use crate::reconciler::{EventFeed, Reconciler};

/// Admission limiter. Build with [`LimiterBuilder`](crate::LimiterBuilder).
pub struct MaxInFlight {
    pool: Arc<TokenPool>,
    next: HandlerRef,
    bus: Bus,
    sync_timeout: Option<Duration>,
}

impl MaxInFlight {
    pub(crate) fn new(
        pool: Arc<TokenPool>,
        next: HandlerRef,
        bus: Bus,
        sync_timeout: Option<Duration>,
    ) -> Self {
        Self {
            pool,
            next,
            bus,
            sync_timeout,
        }
    }

    /// Configured capacity.
    pub fn max_in_flight(&self) -> usize {
        self.pool.capacity()
    }

    /// Live available-token count.
    pub fn tokens_available(&self) -> usize {
        self.pool.available()
    }

    /// Shared handle to the pool, e.g. for [`Metrics::watch_pool`](crate::Metrics::watch_pool).
    pub fn pool(&self) -> Arc<TokenPool> {
        Arc::clone(&self.pool)
    }

    /// Event bus this limiter publishes on.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Returns a reconciler bound to this limiter's pool.
    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(Arc::clone(&self.pool), self.bus.clone(), self.sync_timeout)
    }

    /// Registers an event feed and waits for its bootstrap replay.
    ///
    /// Shorthand for `self.reconciler().register(ctx, feed)`.
    ///
    /// # Errors
    /// See [`Reconciler::register`].
    pub async fn register_feed<F>(&self, ctx: &Context, feed: &F) -> Result<(), SyncError>
    where
        F: EventFeed + ?Sized,
    {
        self.reconciler().register(ctx, feed).await
    }
}

impl std::fmt::Debug for MaxInFlight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaxInFlight")
            .field("max_in_flight", &self.pool.capacity())
            .field("tokens_available", &self.pool.available())
            .field("next", &self.next.name())
            .finish()
    }
}

#[async_trait]
impl JobHandler for MaxInFlight {
    fn name(&self) -> &str {
        "max_in_flight"
    }

    #[tracing::instrument(level = "debug", skip_all, fields(uuid = %job.uuid()))]
    async fn handle(&self, ctx: &Context, job: Job) -> Result<(), HandlerError> {
        let uuid = job.uuid_arc();

        let waited = match self.pool.acquire(ctx, job.stale()).await {
            Acquisition::Acquired { waited } => waited,
            Acquisition::Canceled => {
                let cause = ctx.cause().unwrap_or_else(|| Arc::from(DEFAULT_CAUSE));
                self.bus.publish(
                    Event::new(EventKind::WaitCanceled)
                        .with_job(uuid)
                        .with_reason(Arc::clone(&cause)),
                );
                return Err(HandlerError::Canceled { cause });
            }
            Acquisition::Stale => {
                self.bus.publish(Event::new(EventKind::JobStale).with_job(uuid));
                return Err(HandlerError::StaleJob);
            }
        };

        let available = self.pool.available();
        debug!(available_tokens = available, "token acquired");
        self.bus.publish(
            Event::new(EventKind::TokenAcquired)
                .with_job(Arc::clone(&uuid))
                .with_wait(waited)
                .with_available(available),
        );

        debug!(handler = self.next.name(), "passing job to next handler");
        if let Err(err) = self.next.handle(ctx, job).await {
            let returned = self.pool.try_release();
            let available = self.pool.available();
            debug!(
                handler = self.next.name(),
                error = %err,
                returned,
                available_tokens = available,
                "next handler failed"
            );
            self.bus.publish(
                Event::new(EventKind::TokenReturned)
                    .with_job(uuid)
                    .with_reason(err.to_string())
                    .with_available(available),
            );
            return Err(err);
        }
        Ok(())
    }
}
