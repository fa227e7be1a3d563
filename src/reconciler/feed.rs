//! # Replay-then-live event feed.
//!
//! An [`EventFeed`] delivers the current cluster state as a bootstrap replay
//! (`Added { initial_list: true }` for every pre-existing resource), then a single
//! [`FeedItem::Synced`] barrier, then live notifications.
//!
//! ```text
//! watch() ──► Added(initial) … Added(initial) ── Synced ── Added/Updated/Deleted …
//!             └──────── bootstrap replay ───────┘          └──── live ────┘
//! ```
//!
//! Notifications for one resource arrive in the order they happened. The stream
//! ends when the feed shuts down or the watch context is cancelled.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::event::ResourceEvent;
use crate::context::Context;
use crate::error::SyncError;

/// One item of a feed stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedItem {
    Event(ResourceEvent),
    /// Bootstrap replay is complete.
    Synced,
}

/// Receiving side of a watch.
pub type FeedStream = mpsc::UnboundedReceiver<FeedItem>;

/// Source of cluster lifecycle notifications.
#[async_trait]
pub trait EventFeed: Send + Sync + 'static {
    /// Feed name used in logs and errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Starts a watch.
    ///
    /// Implementations stop delivering once `ctx` is cancelled.
    async fn watch(&self, ctx: &Context) -> Result<FeedStream, SyncError>;
}
