//! # inflight
//!
//! **inflight** is a concurrency-limited admission controller for job dispatchers.
//!
//! It sits in a chain of job handlers between "a job was discovered" and "a job was
//! scheduled into the cluster", and lets at most `max_in_flight` jobs be running at
//! once. Capacity is a pool of tokens: admitting a job takes one, and the token only
//! comes back when the cluster reports the job finished (or when scheduling it failed).
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   upstream (job discovery)                       cluster event feed
//!            │ handle(ctx, job)                            │ replay ─ Synced ─ live
//!            ▼                                             ▼
//! ┌──────────────────────────┐               ┌──────────────────────────┐
//! │       MaxInFlight        │               │        Reconciler        │
//! │  acquire ⟂ ctx ⟂ stale   │               │ initial add  → take      │
//! │  next.handle(ctx, job)   │               │ finish/delete → return   │
//! │  on error → return token │               │ unrecognized → ignore    │
//! └───────┬───────────┬──────┘               └─────┬──────────────┬─────┘
//!         │           │          ┌──────────┐      │              │
//!         │           └─────────►│TokenPool │◄─────┘              │
//!         ▼                      └──────────┘                     │
//!   next handler                                                  │
//!   (scheduler)                                                   │
//!         publish(Event)                       publish(Event)     │
//!   ──────────────┬────────────────────────────────────┬──────────┘
//!                 ▼                                    ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                      (capacity: Config::bus_capacity)             │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │    fan-out listener    │
//!                       │  (in LimiterBuilder)   │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                          ┌────────┼────────┐
//!                          ▼        ▼        ▼
//!                      LogWriter  Metrics  custom
//! ```
//!
//! ### Admission
//! ```text
//! MaxInFlight::handle(ctx, job)
//!   ├─► race: ctx cancelled │ job.stale fired │ token free   (first one wins)
//!   │     ├─ ctx    ─► publish WaitCanceled ─► Err(Canceled { cause })
//!   │     ├─ stale  ─► publish JobStale     ─► Err(StaleJob)
//!   │     └─ token  ─► publish TokenAcquired
//!   └─► next.handle(ctx, job)
//!         ├─ Ok     ─► token stays consumed (Reconciler returns it later)
//!         └─ Err(e) ─► try_release, publish TokenReturned ─► Err(e)
//! ```
//!
//! ## Features
//! | Area              | Description                                               | Key types / traits                        |
//! |-------------------|-----------------------------------------------------------|-------------------------------------------|
//! | **Admission**     | Limit jobs in flight; propagate cancel/stale/downstream.  | [`MaxInFlight`], [`TokenPool`]            |
//! | **Reconciliation**| Keep the count in step with the cluster.                  | [`Reconciler`], [`EventFeed`], [`MemoryFeed`] |
//! | **Handler chain** | Compose handlers statically.                              | [`JobHandler`], [`HandlerFn`], [`HandlerRef`] |
//! | **Subscriber API**| Observe admission and reconciliation events.              | [`Subscribe`], [`Event`]                  |
//! | **Errors**        | Typed errors with stable labels.                          | [`HandlerError`], [`ConfigError`], [`SyncError`] |
//! | **Configuration** | Centralize settings.                                      | [`Config`]                                |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], a `tracing`-backed subscriber.
//! - `metrics` (default): exports [`Metrics`], a Prometheus-backed subscriber.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use inflight::{
//!     Config, Context, HandlerError, HandlerFn, HandlerRef, Job, JobHandler, JobResource,
//!     LimiterBuilder, MemoryFeed, StaleSignal,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scheduler: HandlerRef = HandlerFn::arc("scheduler", |_ctx: Context, job: Job| async move {
//!         if job.uuid().is_empty() {
//!             return Err(HandlerError::fail("missing uuid"));
//!         }
//!         Ok(())
//!     });
//!     let limiter = LimiterBuilder::new(Config::with_max_in_flight(3)).build(scheduler)?;
//!
//!     // One job is already running in the cluster.
//!     let cluster = MemoryFeed::with_resources([JobResource::running("uid-0", "job-0")]);
//!     let ctx = Context::new();
//!     limiter.register_feed(&ctx, &cluster).await?;
//!     assert_eq!(limiter.tokens_available(), 2);
//!
//!     limiter.handle(&ctx, Job::new("job-1", StaleSignal::new())).await?;
//!     assert_eq!(limiter.tokens_available(), 1);
//!
//!     ctx.cancel();
//!     Ok(())
//! }
//! ```

mod config;
mod context;
mod error;
mod events;
mod handlers;
mod jobs;
mod limiter;
mod reconciler;
mod subscribers;

// ---- Public re-exports ----

pub use config::{Config, DEFAULT_MAX_IN_FLIGHT};
pub use context::{Context, DEFAULT_CAUSE};
pub use error::{ConfigError, HandlerError, SyncError};
pub use events::{Bus, Event, EventKind, NotificationKind};
pub use handlers::{HandlerFn, HandlerRef, JobHandler};
pub use jobs::{Job, Payload, StaleSignal};
pub use limiter::{Acquisition, LimiterBuilder, MaxInFlight, TokenPool};
pub use reconciler::{
    ConditionKind, EventFeed, FeedItem, FeedStream, JobCondition, JobResource, JobStatus,
    MemoryFeed, Reconciler, ResourceEvent,
};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: `tracing`-backed logging subscriber.
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;

// Optional: Prometheus metrics subscriber.
#[cfg(feature = "metrics")]
pub use subscribers::{DEFAULT_NAMESPACE, Metrics, MetricsError, MetricsResult};
