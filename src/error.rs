//! Error types used by the admission limiter, the handler chain and the reconciler.
//!
//! This module defines three error enums:
//!
//! - [`HandlerError`] - the single error type flowing through the job handler chain.
//! - [`ConfigError`] - invalid configuration, raised once at construction.
//! - [`SyncError`] - failure to drain an event feed's bootstrap replay.
//!
//! All of them provide `as_label` (stable snake_case label for logs/metrics).

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// # Errors returned by a [`JobHandler`](crate::JobHandler).
///
/// Every link of the chain returns this type, so the limiter propagates
/// downstream failures unchanged. Callers can tell apart:
/// - "cancelled by caller" ([`HandlerError::Canceled`]),
/// - "gave up waiting" ([`HandlerError::StaleJob`]),
/// - "downstream failure" ([`HandlerError::Fail`]).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The caller's context was cancelled while the job waited for capacity.
    #[error("{cause}")]
    Canceled {
        /// Cancellation cause recorded on the [`Context`](crate::Context).
        cause: Arc<str>,
    },

    /// The job's data became too stale to trust while waiting for capacity.
    #[error("job information is stale")]
    StaleJob,

    /// A downstream handler could not process the job.
    #[error("handler failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },
}

impl HandlerError {
    /// Builds a [`HandlerError::Fail`] from any displayable error.
    pub fn fail(error: impl std::fmt::Display) -> Self {
        HandlerError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use inflight::HandlerError;
    ///
    /// assert_eq!(HandlerError::StaleJob.as_label(), "job_stale");
    /// assert_eq!(HandlerError::fail("boom").as_label(), "handler_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Canceled { .. } => "wait_canceled",
            HandlerError::StaleJob => "job_stale",
            HandlerError::Fail { .. } => "handler_failed",
        }
    }

    /// True for [`HandlerError::StaleJob`].
    #[inline]
    pub fn is_stale(&self) -> bool {
        matches!(self, HandlerError::StaleJob)
    }

    /// True for [`HandlerError::Canceled`].
    #[inline]
    pub fn is_canceled(&self) -> bool {
        matches!(self, HandlerError::Canceled { .. })
    }
}

/// # Invalid configuration.
///
/// Raised by [`Config::validate`](crate::Config::validate) and by
/// [`TokenPool::new`](crate::TokenPool::new). The limiter refuses to start
/// rather than run with undefined capacity.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// `max_in_flight` must allow at least one job.
    #[error("max_in_flight must be at least 1 (got {got})")]
    MaxInFlight {
        /// The rejected value.
        got: usize,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::MaxInFlight { .. } => "config_max_in_flight",
        }
    }
}

/// # Event feed synchronization failure.
///
/// Returned by [`Reconciler::register`](crate::Reconciler::register) when the
/// bootstrap replay cannot be drained. This is fatal to startup: the owning
/// process should exit rather than admit work with unknown capacity.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The feed could not start a watch.
    #[error("feed {feed:?} failed to start watch: {error}")]
    Watch {
        /// Feed name.
        feed: String,
        /// The underlying error message.
        error: String,
    },

    /// The feed stream ended before signalling that replay was complete.
    #[error("feed {feed:?} closed before cache sync")]
    FeedClosed {
        /// Feed name.
        feed: String,
    },

    /// The caller's context was cancelled while waiting for sync.
    #[error("cache sync canceled: {cause}")]
    Canceled {
        /// Cancellation cause recorded on the [`Context`](crate::Context).
        cause: Arc<str>,
    },

    /// `Config::sync_timeout` elapsed before replay completed.
    #[error("cache sync timed out after {timeout:?}")]
    Timeout {
        /// The configured deadline.
        timeout: Duration,
    },
}

impl SyncError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SyncError::Watch { .. } => "sync_watch_failed",
            SyncError::FeedClosed { .. } => "sync_feed_closed",
            SyncError::Canceled { .. } => "sync_canceled",
            SyncError::Timeout { .. } => "sync_timeout",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canceled_displays_cause_verbatim() {
        let err = HandlerError::Canceled {
            cause: Arc::from("controller shutting down"),
        };
        assert_eq!(err.to_string(), "controller shutting down");
        assert!(err.is_canceled());
        assert!(!err.is_stale());
    }

    #[test]
    fn labels_are_distinct() {
        let labels = [
            HandlerError::Canceled { cause: Arc::from("x") }.as_label(),
            HandlerError::StaleJob.as_label(),
            HandlerError::fail("x").as_label(),
        ];
        assert_eq!(labels, ["wait_canceled", "job_stale", "handler_failed"]);
    }

    #[test]
    fn config_error_message_names_value() {
        let err = ConfigError::MaxInFlight { got: 0 };
        assert_eq!(err.to_string(), "max_in_flight must be at least 1 (got 0)");
    }
}
