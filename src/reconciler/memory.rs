//! # In-memory event feed.
//!
//! [`MemoryFeed`] keeps a cluster-state snapshot in memory and turns mutations into
//! feed notifications. A new watch receives the snapshot as a bootstrap replay,
//! then [`FeedItem::Synced`], then live events; replay and registration happen
//! under one lock, so no mutation can slip between them.
//!
//! ## Example
//! ```rust
//! use inflight::{JobResource, MemoryFeed};
//!
//! let feed = MemoryFeed::with_resources([
//!     JobResource::running("uid-1", "job-1"),
//!     JobResource::completed("uid-2", "job-2"),
//! ]);
//! feed.apply(JobResource::running("uid-1", "job-1").complete());
//! feed.delete("uid-2");
//! assert_eq!(feed.len(), 1);
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::event::ResourceEvent;
use super::feed::{EventFeed, FeedItem, FeedStream};
use super::resource::JobResource;
use crate::context::Context;
use crate::error::SyncError;

struct Watcher {
    ctx: Context,
    tx: mpsc::UnboundedSender<FeedItem>,
}

#[derive(Default)]
struct State {
    resources: BTreeMap<Arc<str>, JobResource>,
    watchers: Vec<Watcher>,
}

impl State {
    fn broadcast(&mut self, ev: ResourceEvent) {
        self.watchers.retain(|w| {
            !w.ctx.is_cancelled() && w.tx.send(FeedItem::Event(ev.clone())).is_ok()
        });
    }
}

/// Cluster-state store that doubles as an [`EventFeed`].
#[derive(Default)]
pub struct MemoryFeed {
    state: Mutex<State>,
}

impl MemoryFeed {
    /// Creates an empty feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a feed whose snapshot already holds `resources`.
    pub fn with_resources(resources: impl IntoIterator<Item = JobResource>) -> Self {
        let feed = Self::new();
        {
            let mut st = feed.lock();
            for r in resources {
                st.resources.insert(r.uid_arc(), r);
            }
        }
        feed
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates or replaces a resource, notifying watchers with `Added` or `Updated`.
    pub fn apply(&self, resource: JobResource) {
        let mut st = self.lock();
        let ev = match st.resources.insert(resource.uid_arc(), resource.clone()) {
            Some(prev) => ResourceEvent::Updated {
                prev,
                curr: resource,
            },
            None => ResourceEvent::Added {
                resource,
                initial_list: false,
            },
        };
        st.broadcast(ev);
    }

    /// Removes a resource, notifying watchers with its last known state.
    ///
    /// Returns `None` (and notifies nobody) if the uid is unknown.
    pub fn delete(&self, uid: &str) -> Option<JobResource> {
        let mut st = self.lock();
        let last_known = st.resources.remove(uid)?;
        st.broadcast(ResourceEvent::Deleted {
            last_known: last_known.clone(),
        });
        Some(last_known)
    }

    /// Sends a raw notification to watchers without touching the snapshot.
    pub fn inject(&self, ev: ResourceEvent) {
        self.lock().broadcast(ev);
    }

    /// Returns a resource from the snapshot.
    pub fn get(&self, uid: &str) -> Option<JobResource> {
        self.lock().resources.get(uid).cloned()
    }

    /// Number of resources in the snapshot.
    pub fn len(&self) -> usize {
        self.lock().resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().resources.is_empty()
    }
}

#[async_trait]
impl EventFeed for MemoryFeed {
    fn name(&self) -> &str {
        "memory"
    }

    async fn watch(&self, ctx: &Context) -> Result<FeedStream, SyncError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut st = self.lock();
        for resource in st.resources.values() {
            let ev = ResourceEvent::Added {
                resource: resource.clone(),
                initial_list: true,
            };
            // The receiver is still in our hands.
            let _ = tx.send(FeedItem::Event(ev));
        }
        let _ = tx.send(FeedItem::Synced);
        st.watchers.push(Watcher {
            ctx: ctx.clone(),
            tx,
        });
        Ok(rx)
    }
}
