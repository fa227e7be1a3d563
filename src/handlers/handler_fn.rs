//! # Function-backed handler (`HandlerFn`)
//!
//! [`HandlerFn`] wraps a closure `F: Fn(Context, Job) -> Fut`, producing a fresh
//! future per job. Shared state goes in an explicit `Arc<...>` captured by the closure.
//!
//! ## Example
//! ```rust
//! use inflight::{Context, HandlerError, HandlerFn, HandlerRef, Job};
//!
//! let scheduler: HandlerRef = HandlerFn::arc("scheduler", |_ctx: Context, job: Job| async move {
//!     if job.uuid().is_empty() {
//!         return Err(HandlerError::fail("missing uuid"));
//!     }
//!     Ok(())
//! });
//!
//! assert_eq!(scheduler.name(), "scheduler");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::HandlerError;
use crate::handlers::handler::JobHandler;
use crate::jobs::Job;

/// Function-backed handler implementation.
#[derive(Debug)]
pub struct HandlerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> HandlerFn<F> {
    /// Creates a new function-backed handler.
    ///
    /// Prefer [`HandlerFn::arc`] when you immediately need a [`HandlerRef`](crate::HandlerRef).
    pub fn new<Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(Context, Job) -> Fut,
        Fut: Future<Output = Result<(), HandlerError>>,
    {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc<Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self>
    where
        F: Fn(Context, Job) -> Fut,
        Fut: Future<Output = Result<(), HandlerError>>,
    {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> JobHandler for HandlerFn<F>
where
    F: Fn(Context, Job) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, ctx: &Context, job: Job) -> Result<(), HandlerError> {
        (self.f)(ctx.clone(), job).await
    }
}
