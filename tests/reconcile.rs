//! Reconciliation through the public API, observed via subscribers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use inflight::{
    Config, Context, Event, EventKind, HandlerFn, JobResource, LimiterBuilder, MaxInFlight,
    MemoryFeed, NotificationKind, ResourceEvent, Subscribe, SyncError,
};

#[derive(Default)]
struct Recorder(Mutex<Vec<Event>>);

impl Recorder {
    fn kinds(&self) -> Vec<EventKind> {
        self.0.lock().unwrap().iter().map(|e| e.kind).collect()
    }

    async fn wait_for(&self, kind: EventKind, count: usize) {
        tokio::time::timeout(Duration::from_secs(1), async {
            while self.kinds().iter().filter(|k| **k == kind).count() < count {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("event not observed in time");
    }
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, ev: &Event) {
        self.0.lock().unwrap().push(ev.clone());
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

fn limiter(capacity: usize, subs: Vec<Arc<dyn Subscribe>>) -> MaxInFlight {
    LimiterBuilder::new(Config::with_max_in_flight(capacity))
        .with_subscribers(subs)
        .build(HandlerFn::arc("noop", |_ctx, _job| async { Ok(()) }))
        .unwrap()
}

#[tokio::test]
async fn restart_recounts_running_jobs() {
    let rec = Arc::new(Recorder::default());
    let limiter = limiter(5, vec![rec.clone()]);

    let cluster = MemoryFeed::with_resources([
        JobResource::running("a", "job-a"),
        JobResource::running("b", "job-b"),
        JobResource::running("c", "job-c"),
        JobResource::completed("d", "job-d"),
    ]);
    let ctx = Context::new();
    limiter.register_feed(&ctx, &cluster).await.unwrap();
    assert_eq!(limiter.tokens_available(), 2);

    cluster.apply(JobResource::running("a", "job-a").complete());
    rec.wait_for(EventKind::ResourceUpdated, 1).await;
    assert_eq!(limiter.tokens_available(), 3);

    // A finished resource going away does not return its token twice.
    cluster.delete("a");
    rec.wait_for(EventKind::ResourceDeleted, 1).await;
    assert_eq!(limiter.tokens_available(), 3);

    // A live add is already paid for.
    cluster.apply(JobResource::running("e", "job-e"));
    // Neither is something the feed could not interpret.
    cluster.inject(ResourceEvent::Unrecognized {
        kind: NotificationKind::Add,
        reason: "not a job".into(),
    });
    rec.wait_for(EventKind::ResourceIgnored, 1).await;
    assert_eq!(limiter.tokens_available(), 3);

    let kinds = rec.kinds();
    assert_eq!(kinds.first(), Some(&EventKind::CapacityConfigured));
    assert_eq!(
        kinds
            .iter()
            .filter(|k| **k == EventKind::ResourceAdded)
            .count(),
        5
    );
    assert!(kinds.contains(&EventKind::FeedSynced));

    ctx.cancel();
}

#[tokio::test]
async fn unsynced_feed_is_fatal_within_timeout() {
    let mut cfg = Config::with_max_in_flight(1);
    cfg.sync_timeout = Duration::from_millis(50);
    let limiter = LimiterBuilder::new(cfg)
        .build(HandlerFn::arc("noop", |_ctx, _job| async { Ok(()) }))
        .unwrap();

    struct Silent(Mutex<Vec<tokio::sync::mpsc::UnboundedSender<inflight::FeedItem>>>);

    #[async_trait]
    impl inflight::EventFeed for Silent {
        async fn watch(&self, _ctx: &Context) -> Result<inflight::FeedStream, SyncError> {
            let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
            self.0.lock().unwrap().push(tx);
            Ok(rx)
        }
    }

    let err = limiter
        .register_feed(&Context::new(), &Silent(Mutex::default()))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Timeout { .. }));
}

#[cfg(feature = "metrics")]
#[tokio::test]
async fn metrics_follow_the_pool() {
    use inflight::Metrics;

    let metrics = Arc::new(Metrics::new("buildkite_agent_stack_k8s").unwrap());
    let rec = Arc::new(Recorder::default());
    let limiter = limiter(4, vec![metrics.clone(), rec.clone()]);
    metrics.watch_pool(limiter.pool()).unwrap();

    let cluster = MemoryFeed::with_resources([JobResource::running("a", "job-a")]);
    let ctx = Context::new();
    limiter.register_feed(&ctx, &cluster).await.unwrap();
    cluster.delete("a");
    cluster.inject(ResourceEvent::Unrecognized {
        kind: NotificationKind::Update,
        reason: "object is a Pod, not a Job".into(),
    });
    rec.wait_for(EventKind::ResourceIgnored, 1).await;
    // Both subscribers see the same event stream; give the metrics worker a moment.
    tokio::time::sleep(Duration::from_millis(20)).await;

    let text = metrics.encode_text().unwrap();
    assert!(text.contains("buildkite_agent_stack_k8s_limiter_max_in_flight 4"));
    assert!(text.contains("buildkite_agent_stack_k8s_limiter_tokens_available 4"));
    assert!(text.contains("buildkite_agent_stack_k8s_limiter_onadd_events_total 1"));
    assert!(text.contains("buildkite_agent_stack_k8s_limiter_onupdate_events_total 1"));
    assert!(text.contains("buildkite_agent_stack_k8s_limiter_ondelete_events_total 1"));

    ctx.cancel();
}
