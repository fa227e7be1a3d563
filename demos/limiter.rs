//! # Example: Admission Limiter
//!
//! Six jobs compete for two tokens. One job fails to schedule and hands its token
//! straight back; the others hold theirs until the simulated cluster reports them
//! finished.
//!
//! ```text
//! cargo run --example limiter
//! RUST_LOG=inflight=debug cargo run --example limiter
//! ```

use std::{sync::Arc, time::Duration};

use inflight::{
    Config, Context, HandlerError, HandlerFn, HandlerRef, Job, JobHandler, JobResource,
    LimiterBuilder, LogWriter, MemoryFeed, StaleSignal, Subscribe,
};
use tracing_subscriber::EnvFilter;

/// Terminal handler: "creates" the job in the cluster.
fn make_scheduler(cluster: Arc<MemoryFeed>) -> HandlerRef {
    HandlerFn::arc("scheduler", move |_ctx: Context, job: Job| {
        let cluster = Arc::clone(&cluster);
        async move {
            if job.uuid() == "job-3" {
                return Err(HandlerError::fail("image pull secret missing"));
            }
            println!("[scheduler] created {}", job.uuid());
            cluster.apply(JobResource::running(job.uuid(), job.uuid()));
            Ok(())
        }
    })
}

/// Simulated cluster: every running job completes after `work`.
fn spawn_cluster(cluster: Arc<MemoryFeed>, ctx: Context, work: Duration) {
    tokio::spawn(async move {
        while !ctx.is_cancelled() {
            tokio::time::sleep(work).await;
            for uid in ["job-0", "job-1", "job-2", "job-4", "job-5"] {
                if let Some(r) = cluster.get(uid).filter(|r| !r.is_finished()) {
                    println!("[cluster] {uid} finished");
                    cluster.apply(r.complete());
                    break;
                }
            }
        }
    });
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("inflight=info")),
        )
        .init();

    let cluster = Arc::new(MemoryFeed::new());
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
    let limiter = Arc::new(
        LimiterBuilder::new(Config::with_max_in_flight(2))
            .with_subscribers(subs)
            .build(make_scheduler(Arc::clone(&cluster)))?,
    );

    let ctx = Context::new();
    limiter.register_feed(&ctx, cluster.as_ref()).await?;
    spawn_cluster(Arc::clone(&cluster), ctx.clone(), Duration::from_millis(300));

    let mut handles = Vec::new();
    for i in 0..6 {
        let limiter = Arc::clone(&limiter);
        let ctx = ctx.clone();
        handles.push(tokio::spawn(async move {
            let job = Job::new(format!("job-{i}"), StaleSignal::after(Duration::from_secs(5)));
            let res = limiter.handle(&ctx, job).await;
            println!("[upstream] job-{i}: {res:?}");
        }));
    }
    for h in handles {
        h.await?;
    }

    tokio::time::sleep(Duration::from_millis(700)).await;
    println!("[demo] tokens available: {}", limiter.tokens_available());
    ctx.cancel_with_cause("demo finished");
    Ok(())
}
