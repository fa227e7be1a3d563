//! # Admission and reconciliation events.
//!
//! Every [`EventKind`] falls into one of three groups:
//! - **Admission events**: outcome of a `MaxInFlight::handle` wait
//! - **Reconciliation events**: cluster resource notifications seen by the reconciler
//! - **Configuration events**: emitted once when the limiter is built
//!
//! The [`Event`] struct carries additional metadata such as timestamps, job id,
//! resource id, the live available-token count, and wait latency.
//!
//! ## Ordering
//! `seq` is process-wide and strictly increasing, so events from the limiter and
//! the reconciler can be merged back into publish order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use inflight::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TokenAcquired)
//!     .with_job("0190a1b2")
//!     .with_wait(Duration::from_millis(250))
//!     .with_available(3);
//!
//! assert_eq!(ev.kind, EventKind::TokenAcquired);
//! assert_eq!(ev.job.as_deref(), Some("0190a1b2"));
//! assert_eq!(ev.available, Some(3));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of limiter events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Configuration ===
    /// Limiter built with a fixed capacity.
    ///
    /// Sets:
    /// - `capacity`: configured `max_in_flight`
    /// - `available`: tokens available (== capacity)
    CapacityConfigured,

    // === Admission ===
    /// A job won a token and is being forwarded.
    ///
    /// Sets:
    /// - `job`: job uuid
    /// - `wait`: time spent waiting for the token
    /// - `available`: tokens left after acquisition
    TokenAcquired,

    /// The next handler failed; the job's token went back to the pool.
    ///
    /// Sets:
    /// - `job`: job uuid
    /// - `reason`: downstream error message
    /// - `available`: tokens available after the return
    TokenReturned,

    /// The job's data went stale before a token was available.
    ///
    /// Sets:
    /// - `job`: job uuid
    JobStale,

    /// The caller's context was cancelled before a token was available.
    ///
    /// Sets:
    /// - `job`: job uuid
    /// - `reason`: cancellation cause
    WaitCanceled,

    // === Reconciliation ===
    /// Resource-added notification.
    ///
    /// Sets:
    /// - `resource`: resource uid
    /// - `initial_list`: whether the event belongs to the bootstrap replay
    /// - `available`: tokens available after handling
    ResourceAdded,

    /// Resource-updated notification.
    ///
    /// Sets:
    /// - `resource`: resource uid
    /// - `available`: tokens available after handling
    ResourceUpdated,

    /// Resource-deleted notification.
    ///
    /// Sets:
    /// - `resource`: resource uid
    /// - `available`: tokens available after handling
    ResourceDeleted,

    /// Notification that could not be interpreted and was ignored.
    ///
    /// Sets:
    /// - `reason`: description supplied by the feed
    /// - `notification`: which lifecycle callback delivered it
    ResourceIgnored,

    /// The feed finished its bootstrap replay.
    ///
    /// Sets:
    /// - `reason`: feed name
    /// - `available`: tokens available once replay is accounted for
    FeedSynced,
}

/// Lifecycle callback a cluster notification arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Add,
    Update,
    Delete,
}

impl NotificationKind {
    pub fn as_label(self) -> &'static str {
        match self {
            NotificationKind::Add => "add",
            NotificationKind::Update => "update",
            NotificationKind::Delete => "delete",
        }
    }
}

/// Limiter event with optional metadata.
///
/// Which optional fields are filled in depends on [`EventKind`]; see each variant.
#[derive(Clone, Debug)]
pub struct Event {
    /// Process-wide publish order.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Job uuid, for admission events.
    pub job: Option<Arc<str>>,
    /// Cluster resource uid, for reconciliation events.
    pub resource: Option<Arc<str>>,
    /// Human-readable reason (errors, cancellation causes, feed names).
    pub reason: Option<Arc<str>>,
    /// Live available-token count sampled when the event was built.
    pub available: Option<usize>,
    /// Configured pool capacity.
    pub capacity: Option<usize>,
    /// Token wait latency.
    pub wait: Option<Duration>,
    /// Whether a resource-added event belongs to the bootstrap replay.
    pub initial_list: Option<bool>,
    /// Callback an ignored notification arrived through.
    pub notification: Option<NotificationKind>,
}

impl Event {
    /// Stamps a new event with the next `seq` and the current time.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            job: None,
            resource: None,
            reason: None,
            available: None,
            capacity: None,
            wait: None,
            initial_list: None,
            notification: None,
        }
    }

    /// Attaches a job uuid.
    #[inline]
    pub fn with_job(mut self, job: impl Into<Arc<str>>) -> Self {
        self.job = Some(job.into());
        self
    }

    /// Attaches a resource uid.
    #[inline]
    pub fn with_resource(mut self, resource: impl Into<Arc<str>>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Attaches an error message, cancellation cause, or feed name.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches the available-token count.
    #[inline]
    pub fn with_available(mut self, n: usize) -> Self {
        self.available = Some(n);
        self
    }

    /// Attaches the configured capacity.
    #[inline]
    pub fn with_capacity(mut self, n: usize) -> Self {
        self.capacity = Some(n);
        self
    }

    /// Attaches the token wait latency.
    #[inline]
    pub fn with_wait(mut self, d: Duration) -> Self {
        self.wait = Some(d);
        self
    }

    /// Marks whether a resource-added event is part of the bootstrap replay.
    #[inline]
    pub fn with_initial_list(mut self, initial_list: bool) -> Self {
        self.initial_list = Some(initial_list);
        self
    }

    /// Records which lifecycle callback delivered an ignored notification.
    #[inline]
    pub fn with_notification(mut self, kind: NotificationKind) -> Self {
        self.notification = Some(kind);
        self
    }

    #[inline]
    pub fn is_admission(&self) -> bool {
        matches!(
            self.kind,
            EventKind::TokenAcquired
                | EventKind::TokenReturned
                | EventKind::JobStale
                | EventKind::WaitCanceled
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::ResourceAdded);
        let b = Event::new(EventKind::ResourceUpdated);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn admission_classification() {
        assert!(Event::new(EventKind::JobStale).is_admission());
        assert!(!Event::new(EventKind::FeedSynced).is_admission());
    }
}
