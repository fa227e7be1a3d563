//! # Reconciler: cluster state → token pool.
//!
//! The [`Reconciler`] keeps the token count honest with respect to jobs that are
//! actually running in the cluster. It is the only component that returns tokens
//! for jobs that were admitted successfully.
//!
//! ## Rules
//! ```text
//! Added   (initial_list, not finished)   → try_acquire   (counts a pre-existing job)
//! Added   (live)                         → nothing       (already paid for by MaxInFlight)
//! Updated (not finished → finished)      → try_release
//! Deleted (last known not finished)      → try_release
//! Unrecognized                           → ignored (still counted as its callback)
//! ```
//! Every adjustment is a non-blocking try-variant: a bootstrap replay that finds
//! more running jobs than capacity simply leaves the pool empty, and a return on
//! a full pool is a no-op.
//!
//! ## Registration
//! [`Reconciler::register`] starts a watch, spawns a listener that applies the
//! rules above, and returns only once the bootstrap replay has been fully applied.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::event::ResourceEvent;
use super::feed::{EventFeed, FeedItem, FeedStream};
use crate::context::{Context, DEFAULT_CAUSE};
use crate::error::SyncError;
use crate::events::{Bus, Event, EventKind};
use crate::limiter::TokenPool;

/// Adjusts a [`TokenPool`] from cluster lifecycle notifications.
///
/// Cheap to clone; clones share the pool and the bus.
#[derive(Clone, Debug)]
pub struct Reconciler {
    pool: Arc<TokenPool>,
    bus: Bus,
    sync_timeout: Option<Duration>,
}

impl Reconciler {
    /// Creates a reconciler over `pool`, publishing on `bus`.
    ///
    /// `sync_timeout` bounds [`register`](Self::register); `None` waits for the feed.
    pub fn new(pool: Arc<TokenPool>, bus: Bus, sync_timeout: Option<Duration>) -> Self {
        Self {
            pool,
            bus,
            sync_timeout,
        }
    }

    /// Applies one notification to the pool.
    pub fn on_event(&self, ev: ResourceEvent) {
        match ev {
            ResourceEvent::Added {
                resource,
                initial_list,
            } => {
                if initial_list && !resource.is_finished() {
                    let took = self.pool.try_acquire();
                    debug!(
                        uid = resource.uid(),
                        took,
                        available_tokens = self.pool.available(),
                        "counted pre-existing running job"
                    );
                }
                self.bus.publish(
                    Event::new(EventKind::ResourceAdded)
                        .with_resource(resource.uid_arc())
                        .with_initial_list(initial_list)
                        .with_available(self.pool.available()),
                );
            }
            ResourceEvent::Updated { prev, curr } => {
                if !prev.is_finished() && curr.is_finished() {
                    let returned = self.pool.try_release();
                    debug!(
                        uid = curr.uid(),
                        returned,
                        available_tokens = self.pool.available(),
                        "job finished, returned token"
                    );
                }
                self.bus.publish(
                    Event::new(EventKind::ResourceUpdated)
                        .with_resource(curr.uid_arc())
                        .with_available(self.pool.available()),
                );
            }
            ResourceEvent::Deleted { last_known } => {
                if !last_known.is_finished() {
                    let returned = self.pool.try_release();
                    debug!(
                        uid = last_known.uid(),
                        returned,
                        available_tokens = self.pool.available(),
                        "unfinished job deleted, returned token"
                    );
                }
                self.bus.publish(
                    Event::new(EventKind::ResourceDeleted)
                        .with_resource(last_known.uid_arc())
                        .with_available(self.pool.available()),
                );
            }
            ResourceEvent::Unrecognized { kind, reason } => {
                debug!(
                    notification = kind.as_label(),
                    reason = %reason,
                    "ignoring unrecognized notification"
                );
                self.bus.publish(
                    Event::new(EventKind::ResourceIgnored)
                        .with_notification(kind)
                        .with_reason(reason),
                );
            }
        }
    }

    /// Subscribes to `feed` and waits until its bootstrap replay has been applied.
    ///
    /// The watch runs until `ctx` is cancelled or the feed ends. On error the watch
    /// is torn down; the caller should treat the error as fatal to startup.
    ///
    /// # Errors
    /// - [`SyncError::Watch`] if the feed could not start
    /// - [`SyncError::FeedClosed`] if the stream ended before `Synced`
    /// - [`SyncError::Canceled`] if `ctx` was cancelled first
    /// - [`SyncError::Timeout`] if the configured sync timeout elapsed
    pub async fn register<F>(&self, ctx: &Context, feed: &F) -> Result<(), SyncError>
    where
        F: EventFeed + ?Sized,
    {
        let name = feed.name().to_owned();
        let watch_ctx = ctx.child();
        let stream = feed.watch(&watch_ctx).await?;

        let (synced_tx, synced_rx) = oneshot::channel();
        tokio::spawn(
            self.clone()
                .listen(watch_ctx.clone(), stream, synced_tx, name.clone()),
        );

        let synced = async {
            let res = match self.sync_timeout {
                Some(timeout) => match tokio::time::timeout(timeout, synced_rx).await {
                    Ok(res) => res,
                    Err(_elapsed) => return Err(SyncError::Timeout { timeout }),
                },
                None => synced_rx.await,
            };
            res.map_err(|_| SyncError::FeedClosed { feed: name.clone() })
        };

        let res = tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(SyncError::Canceled {
                cause: ctx.cause().unwrap_or_else(|| Arc::from(DEFAULT_CAUSE)),
            }),
            res = synced => res,
        };

        match res {
            Ok(()) => {
                info!(
                    feed = %name,
                    available_tokens = self.pool.available(),
                    "event feed synced"
                );
                Ok(())
            }
            Err(err) => {
                watch_ctx.cancel();
                warn!(feed = %name, error = %err, "failed to sync event feed");
                Err(err)
            }
        }
    }

    async fn listen(
        self,
        ctx: Context,
        mut stream: FeedStream,
        synced: oneshot::Sender<()>,
        feed: String,
    ) {
        let mut synced = Some(synced);
        loop {
            let item = tokio::select! {
                biased;
                _ = ctx.cancelled() => break,
                item = stream.recv() => item,
            };
            match item {
                Some(FeedItem::Event(ev)) => self.on_event(ev),
                Some(FeedItem::Synced) => {
                    if let Some(tx) = synced.take() {
                        self.bus.publish(
                            Event::new(EventKind::FeedSynced)
                                .with_reason(feed.as_str())
                                .with_available(self.pool.available()),
                        );
                        let _ = tx.send(());
                    }
                }
                None => break,
            }
        }
        debug!(feed = %feed, "event feed watch ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NotificationKind;
    use crate::reconciler::{JobResource, MemoryFeed};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::{broadcast, mpsc};

    fn reconciler(capacity: usize) -> (Reconciler, Arc<TokenPool>, Bus) {
        let pool = Arc::new(TokenPool::new(capacity).unwrap());
        let bus = Bus::new(64);
        (Reconciler::new(Arc::clone(&pool), bus.clone(), None), pool, bus)
    }

    async fn wait_for(rx: &mut broadcast::Receiver<Event>, kind: EventKind) -> Event {
        loop {
            let ev = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .expect("event not published in time")
                .unwrap();
            if ev.kind == kind {
                return ev;
            }
        }
    }

    #[test]
    fn bootstrap_counts_only_unfinished_resources() {
        let (r, pool, _bus) = reconciler(5);
        r.on_event(ResourceEvent::Added {
            resource: JobResource::running("a", "job-a"),
            initial_list: true,
        });
        r.on_event(ResourceEvent::Added {
            resource: JobResource::completed("b", "job-b"),
            initial_list: true,
        });
        assert_eq!(pool.available(), 4);
    }

    #[test]
    fn bootstrap_beyond_capacity_leaves_pool_empty() {
        let (r, pool, _bus) = reconciler(2);
        for uid in ["a", "b", "c"] {
            r.on_event(ResourceEvent::Added {
                resource: JobResource::running(uid, uid),
                initial_list: true,
            });
        }
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn live_add_never_changes_count() {
        let (r, pool, _bus) = reconciler(3);
        assert!(pool.try_acquire());
        r.on_event(ResourceEvent::Added {
            resource: JobResource::running("a", "job-a"),
            initial_list: false,
        });
        r.on_event(ResourceEvent::Added {
            resource: JobResource::completed("b", "job-b"),
            initial_list: false,
        });
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn only_finishing_transition_releases() {
        let (r, pool, _bus) = reconciler(3);
        assert!(pool.try_acquire());
        let running = JobResource::running("a", "job-a");
        let done = running.clone().complete();

        r.on_event(ResourceEvent::Updated {
            prev: running.clone(),
            curr: running.clone(),
        });
        assert_eq!(pool.available(), 2);

        r.on_event(ResourceEvent::Updated {
            prev: running,
            curr: done.clone(),
        });
        assert_eq!(pool.available(), 3);

        // finished → finished is not a transition.
        assert!(pool.try_acquire());
        r.on_event(ResourceEvent::Updated {
            prev: done.clone(),
            curr: done,
        });
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn delete_releases_only_unfinished() {
        let (r, pool, _bus) = reconciler(3);
        assert!(pool.try_acquire());
        assert!(pool.try_acquire());

        r.on_event(ResourceEvent::Deleted {
            last_known: JobResource::completed("a", "job-a"),
        });
        assert_eq!(pool.available(), 1);

        r.on_event(ResourceEvent::Deleted {
            last_known: JobResource::running("b", "job-b"),
        });
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn release_on_full_pool_is_silent() {
        let (r, pool, _bus) = reconciler(1);
        r.on_event(ResourceEvent::Deleted {
            last_known: JobResource::running("a", "job-a"),
        });
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test]
    async fn unrecognized_is_ignored_but_reported() {
        let (r, pool, bus) = reconciler(2);
        let mut rx = bus.subscribe();
        r.on_event(ResourceEvent::Unrecognized {
            kind: NotificationKind::Update,
            reason: "object is a Pod, not a Job".into(),
        });
        assert_eq!(pool.available(), 2);

        let ev = wait_for(&mut rx, EventKind::ResourceIgnored).await;
        assert_eq!(ev.reason.as_deref(), Some("object is a Pod, not a Job"));
        assert_eq!(ev.notification, Some(NotificationKind::Update));
    }

    #[tokio::test]
    async fn register_applies_replay_before_returning() {
        let feed = MemoryFeed::with_resources([
            JobResource::running("a", "job-a"),
            JobResource::running("b", "job-b"),
            JobResource::running("c", "job-c"),
            JobResource::completed("d", "job-d"),
        ]);
        let (r, pool, bus) = reconciler(5);
        let mut rx = bus.subscribe();
        let ctx = Context::new();

        r.register(&ctx, &feed).await.unwrap();
        assert_eq!(pool.available(), 2);
        assert_eq!(wait_for(&mut rx, EventKind::FeedSynced).await.available, Some(2));

        feed.apply(JobResource::running("a", "job-a").complete());
        wait_for(&mut rx, EventKind::ResourceUpdated).await;
        assert_eq!(pool.available(), 3);

        // Already finished: no second return.
        feed.delete("a");
        wait_for(&mut rx, EventKind::ResourceDeleted).await;
        assert_eq!(pool.available(), 3);

        ctx.cancel();
    }

    struct ClosingFeed;

    #[async_trait]
    impl EventFeed for ClosingFeed {
        async fn watch(&self, _ctx: &Context) -> Result<FeedStream, SyncError> {
            let (_tx, rx) = mpsc::unbounded_channel();
            Ok(rx)
        }
    }

    #[derive(Default)]
    struct HangingFeed(Mutex<Vec<mpsc::UnboundedSender<FeedItem>>>);

    #[async_trait]
    impl EventFeed for HangingFeed {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn watch(&self, _ctx: &Context) -> Result<FeedStream, SyncError> {
            let (tx, rx) = mpsc::unbounded_channel();
            self.0.lock().unwrap().push(tx);
            Ok(rx)
        }
    }

    struct BrokenFeed;

    #[async_trait]
    impl EventFeed for BrokenFeed {
        async fn watch(&self, _ctx: &Context) -> Result<FeedStream, SyncError> {
            Err(SyncError::Watch {
                feed: "broken".into(),
                error: "connection refused".into(),
            })
        }
    }

    #[tokio::test]
    async fn feed_closing_before_sync_is_an_error() {
        let (r, _pool, _bus) = reconciler(1);
        let err = r.register(&Context::new(), &ClosingFeed).await.unwrap_err();
        assert_eq!(err.as_label(), "sync_feed_closed");
    }

    #[tokio::test]
    async fn watch_failure_is_propagated() {
        let (r, _pool, _bus) = reconciler(1);
        let err = r.register(&Context::new(), &BrokenFeed).await.unwrap_err();
        assert!(matches!(err, SyncError::Watch { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_feed_times_out() {
        let pool = Arc::new(TokenPool::new(1).unwrap());
        let r = Reconciler::new(pool, Bus::new(8), Some(Duration::from_secs(30)));
        let err = r
            .register(&Context::new(), &HangingFeed::default())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SyncError::Timeout {
                timeout: Duration::from_secs(30)
            }
        );
    }

    #[tokio::test]
    async fn cancelled_context_reports_cause() {
        let (r, _pool, _bus) = reconciler(1);
        let ctx = Context::new();
        ctx.cancel_with_cause("controller shutting down");
        let err = r.register(&ctx, &HangingFeed::default()).await.unwrap_err();
        assert_eq!(
            err,
            SyncError::Canceled {
                cause: Arc::from("controller shutting down")
            }
        );
    }
}
