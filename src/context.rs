//! # Cancellation context with a recorded cause.
//!
//! [`Context`] wraps a [`CancellationToken`] and remembers *why* it was cancelled.
//! Handlers receive a `&Context` and the admission limiter returns the cause
//! as [`HandlerError::Canceled`](crate::HandlerError::Canceled) instead of masking it.
//!
//! ## Rules
//! - The first recorded cause wins; later `cancel_with_cause` calls are ignored.
//! - A child without its own cause reports its parent's cause.
//! - A cancelled context with no cause anywhere reports [`DEFAULT_CAUSE`].
//!
//! ## Example
//! ```rust
//! use inflight::Context;
//!
//! let root = Context::new();
//! let child = root.child();
//!
//! root.cancel_with_cause("shutting down");
//! assert!(child.is_cancelled());
//! assert_eq!(child.cause().as_deref(), Some("shutting down"));
//! ```

use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

/// Cause reported when a context was cancelled without an explicit reason.
pub const DEFAULT_CAUSE: &str = "context canceled";

/// Cancellation context passed down the handler chain.
///
/// Cheap to clone: clones share the same token and cause.
#[derive(Clone, Debug, Default)]
pub struct Context {
    token: CancellationToken,
    cause: Arc<OnceLock<Arc<str>>>,
    parent: Option<Arc<Context>>,
}

impl Context {
    /// Creates a new root context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing token (e.g. a runtime shutdown token).
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            ..Self::default()
        }
    }

    /// Derives a child context: cancelled with its parent, never the other way round.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            cause: Arc::default(),
            parent: Some(Arc::new(self.clone())),
        }
    }

    /// Returns the underlying token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancels without a specific cause.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Records `cause` (unless already cancelled) and cancels.
    pub fn cancel_with_cause(&self, cause: impl Into<Arc<str>>) {
        if !self.token.is_cancelled() {
            let _ = self.cause.set(cause.into());
        }
        self.token.cancel();
    }

    /// True once this context (or an ancestor) has been cancelled.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves when the context is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Returns the cancellation cause, or `None` while the context is live.
    pub fn cause(&self) -> Option<Arc<str>> {
        if !self.token.is_cancelled() {
            return None;
        }
        if let Some(cause) = self.cause.get() {
            return Some(Arc::clone(cause));
        }
        let inherited = self.parent.as_ref().and_then(|p| p.cause());
        Some(inherited.unwrap_or_else(|| Arc::from(DEFAULT_CAUSE)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_context_has_no_cause() {
        let ctx = Context::new();
        assert!(!ctx.is_cancelled());
        assert_eq!(ctx.cause(), None);
    }

    #[test]
    fn plain_cancel_reports_default_cause() {
        let ctx = Context::new();
        ctx.cancel();
        assert_eq!(ctx.cause().as_deref(), Some(DEFAULT_CAUSE));
    }

    #[test]
    fn first_cause_wins() {
        let ctx = Context::new();
        ctx.cancel_with_cause("first");
        ctx.cancel_with_cause("second");
        assert_eq!(ctx.cause().as_deref(), Some("first"));
    }

    #[test]
    fn child_inherits_parent_cause() {
        let root = Context::new();
        let child = root.child();
        root.cancel_with_cause("deadline exceeded");
        assert_eq!(child.cause().as_deref(), Some("deadline exceeded"));
    }

    #[test]
    fn child_cancel_does_not_reach_parent() {
        let root = Context::new();
        let child = root.child();
        child.cancel_with_cause("job done");
        assert!(!root.is_cancelled());
        assert_eq!(child.cause().as_deref(), Some("job done"));
    }

    #[tokio::test]
    async fn cancelled_resolves() {
        let ctx = Context::new();
        let waiter = ctx.clone();
        let h = tokio::spawn(async move { waiter.cancelled().await });
        ctx.cancel();
        h.await.unwrap();
    }
}
