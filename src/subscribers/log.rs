//! # Structured logging subscriber.
//!
//! [`LogWriter`] renders every limiter event through `tracing`, one record per event,
//! with the event's metadata as structured fields.
//!
//! ## Output (with `tracing_subscriber::fmt`)
//! ```text
//! INFO  capacity configured max_in_flight=25 available=25
//! DEBUG token acquired job=0190a1b2 available=24 wait_ms=0
//! WARN  token returned after downstream failure job=0190a1b2 available=25 reason="..."
//! INFO  job stale before a token was available job=0190a1b2
//! DEBUG resource added resource=uid-7 initial_list=false available=24
//! INFO  event feed synced feed=memory available=23
//! ```
//!
//! ## Example
//! ```no_run
//! # use std::sync::Arc;
//! # use inflight::{Config, HandlerFn, LimiterBuilder, LogWriter};
//! # async fn demo() -> Result<(), inflight::ConfigError> {
//! let next = HandlerFn::arc("scheduler", |_ctx, _job| async { Ok(()) });
//! let limiter = LimiterBuilder::new(Config::default())
//!     .with_subscribers(vec![Arc::new(LogWriter)])
//!     .build(next)?;
//! # let _ = limiter; Ok(()) }
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind, NotificationKind};
use crate::subscribers::Subscribe;

/// Logging subscriber backed by `tracing`.
///
/// Enabled via the `logging` feature. Routine admission traffic logs at `debug`;
/// outcomes an operator usually wants to see (stale jobs, downstream failures,
/// feed sync) log at `info` or `warn`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let job = e.job.as_deref().unwrap_or("-");
        let resource = e.resource.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::CapacityConfigured => {
                tracing::info!(
                    max_in_flight = e.capacity,
                    available = e.available,
                    "capacity configured"
                );
            }
            EventKind::TokenAcquired => {
                let wait_ms = e.wait.map(|d| d.as_millis() as u64);
                tracing::debug!(job, available = e.available, wait_ms, "token acquired");
            }
            EventKind::TokenReturned => {
                tracing::warn!(
                    job,
                    available = e.available,
                    reason,
                    "token returned after downstream failure"
                );
            }
            EventKind::JobStale => {
                tracing::info!(job, "job stale before a token was available");
            }
            EventKind::WaitCanceled => {
                tracing::info!(job, reason, "token wait canceled");
            }
            EventKind::ResourceAdded => {
                tracing::debug!(
                    resource,
                    initial_list = e.initial_list,
                    available = e.available,
                    "resource added"
                );
            }
            EventKind::ResourceUpdated => {
                tracing::debug!(resource, available = e.available, "resource updated");
            }
            EventKind::ResourceDeleted => {
                tracing::debug!(resource, available = e.available, "resource deleted");
            }
            EventKind::ResourceIgnored => {
                tracing::debug!(
                    notification = e.notification.map(NotificationKind::as_label),
                    reason,
                    "ignoring unrecognized resource notification"
                );
            }
            EventKind::FeedSynced => {
                tracing::info!(feed = reason, available = e.available, "event feed synced");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
