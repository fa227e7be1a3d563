//! # Observability sink contract.
//!
//! The limiter and the reconciler never call a metrics or logging backend directly.
//! They publish [`Event`]s; every [`Subscribe`] implementation registered with
//! [`LimiterBuilder::with_subscribers`](crate::LimiterBuilder::with_subscribers)
//! receives them on its own worker task.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use async_trait::async_trait;
//! use inflight::{Event, EventKind, Subscribe};
//!
//! #[derive(Default)]
//! struct StaleCounter(AtomicU64);
//!
//! #[async_trait]
//! impl Subscribe for StaleCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::JobStale {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "stale-counter" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Receives limiter events off the admission path.
///
/// Implementations should not block the executor and should not panic; a panic
/// costs the event being handled and is logged.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event. Calls for one subscriber never overlap and follow publish order.
    async fn on_event(&self, event: &Event);

    /// Name used in diagnostics. Defaults to the type name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Events buffered for this subscriber before new ones are dropped (min 1).
    fn queue_capacity(&self) -> usize {
        1024
    }
}
