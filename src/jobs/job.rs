//! # Job: a unit of work the chain may admit.
//!
//! A [`Job`] bundles the job identifier, its [`StaleSignal`], and an opaque payload
//! for downstream handlers. The limiter never looks inside the payload and never
//! persists jobs: a job is dropped once the chain returns.
//!
//! ## Example
//! ```rust
//! use inflight::{Job, StaleSignal};
//!
//! struct Command { script: String }
//!
//! let job = Job::new("0190a1b2", StaleSignal::new())
//!     .with_payload(Command { script: "make test".into() });
//!
//! assert_eq!(job.uuid(), "0190a1b2");
//! assert_eq!(job.payload::<Command>().map(|c| c.script.as_str()), Some("make test"));
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::stale::StaleSignal;

/// Opaque, shareable job payload.
pub type Payload = Arc<dyn Any + Send + Sync>;

/// A discovered job travelling down the handler chain.
#[derive(Clone)]
pub struct Job {
    uuid: Arc<str>,
    stale: StaleSignal,
    payload: Option<Payload>,
}

impl Job {
    /// Creates a job with no payload.
    pub fn new(uuid: impl Into<Arc<str>>, stale: StaleSignal) -> Self {
        Self {
            uuid: uuid.into(),
            stale,
            payload: None,
        }
    }

    /// Attaches a payload for downstream handlers.
    pub fn with_payload<T: Any + Send + Sync>(mut self, payload: T) -> Self {
        self.payload = Some(Arc::new(payload));
        self
    }

    /// Returns the job identifier.
    #[inline]
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// Returns a shared handle to the identifier (for events outliving the job).
    #[inline]
    pub(crate) fn uuid_arc(&self) -> Arc<str> {
        Arc::clone(&self.uuid)
    }

    /// Returns the staleness signal.
    #[inline]
    pub fn stale(&self) -> &StaleSignal {
        &self.stale
    }

    /// Returns the payload if it has type `T`.
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.as_deref().and_then(|p| p.downcast_ref::<T>())
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("uuid", &self.uuid)
            .field("stale", &self.stale.is_stale())
            .field("payload", &self.payload.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_downcast_checks_type() {
        let job = Job::new("a", StaleSignal::new()).with_payload(42u32);
        assert_eq!(job.payload::<u32>(), Some(&42));
        assert_eq!(job.payload::<String>(), None);
    }

    #[test]
    fn clones_share_staleness() {
        let job = Job::new("a", StaleSignal::new());
        let copy = job.clone();
        job.stale().fire();
        assert!(copy.stale().is_stale());
    }
}
