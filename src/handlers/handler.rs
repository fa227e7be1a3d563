//! # Job handler contract.
//!
//! A [`JobHandler`] either rejects/blocks a job or forwards it to the next handler.
//! Handlers compose by wrapping: the [`MaxInFlight`](crate::MaxInFlight) limiter holds
//! the next link as a [`HandlerRef`] decided at construction, and the terminal link
//! performs the actual scheduling.
//!
//! ```text
//! upstream ──► MaxInFlight ──► Scheduler (terminal)
//!               handle()        handle()
//! ```
//!
//! # Example
//! ```
//! use async_trait::async_trait;
//! use inflight::{Context, HandlerError, Job, JobHandler};
//!
//! struct Scheduler;
//!
//! #[async_trait]
//! impl JobHandler for Scheduler {
//!     fn name(&self) -> &str { "scheduler" }
//!
//!     async fn handle(&self, ctx: &Context, job: Job) -> Result<(), HandlerError> {
//!         if ctx.is_cancelled() {
//!             return Err(HandlerError::fail("not scheduling: shutting down"));
//!         }
//!         let _ = job.uuid(); // create the cluster resource...
//!         Ok(())
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::HandlerError;
use crate::jobs::Job;

/// # One link of the job handler chain.
///
/// Implementations must be safe to call concurrently from many tasks.
#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
    /// Returns a stable, human-readable handler name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Handles one job.
    ///
    /// Errors are propagated unchanged by wrapping handlers.
    async fn handle(&self, ctx: &Context, job: Job) -> Result<(), HandlerError>;
}

/// Shared handle to a handler (`Arc<dyn JobHandler>`).
pub type HandlerRef = Arc<dyn JobHandler>;
