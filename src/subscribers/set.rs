//! # Subscriber fan-out.
//!
//! [`SubscriberSet`] hands every limiter event to each registered sink through a
//! private bounded queue drained by a dedicated worker task. The admission path
//! only ever pays for a `try_send` per sink.
//!
//! ```text
//! bus ──► listener ──► emit(ev) ─┬─► queue ─► worker ─► LogWriter::on_event
//!                                ├─► queue ─► worker ─► Metrics::on_event
//!                                └─► queue ─► worker ─► custom::on_event
//! ```
//!
//! A sink that falls behind loses events (logged at `warn`), a sink that panics
//! loses only the event it panicked on (logged at `error`). Neither affects the
//! other sinks or the limiter. Each sink sees events in publish order.

use std::any::Any;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::events::{Bus, Event};
use crate::subscribers::Subscribe;

/// Queue feeding one subscriber's worker.
struct Sink {
    name: &'static str,
    queue: mpsc::Sender<Arc<Event>>,
}

/// Set of subscribers, each behind its own queue and worker.
pub struct SubscriberSet {
    sinks: Vec<Sink>,
    workers: Vec<JoinHandle<()>>,
}

impl SubscriberSet {
    /// Starts one worker per subscriber.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        let (sinks, workers) = subs.into_iter().map(spawn_worker).unzip();
        Self { sinks, workers }
    }

    /// Queues `event` for every subscriber without waiting.
    pub fn emit(&self, event: &Event) {
        let shared = Arc::new(event.clone());
        for sink in &self.sinks {
            let dropped = match sink.queue.try_send(Arc::clone(&shared)) {
                Ok(()) => continue,
                Err(TrySendError::Full(_)) => "queue full",
                Err(TrySendError::Closed(_)) => "worker gone",
            };
            tracing::warn!(
                subscriber = sink.name,
                kind = ?event.kind,
                seq = event.seq,
                dropped,
                "subscriber missed an event"
            );
        }
    }

    /// Relays everything published on `bus` into this set until the last bus
    /// handle is dropped, then drains and stops the workers.
    pub(crate) fn spawn_listener(self, bus: &Bus) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => self.emit(&ev),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "subscriber listener fell behind the bus");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            self.shutdown().await;
        })
    }

    /// Closes every queue and waits for the workers to finish what was queued.
    pub async fn shutdown(self) {
        drop(self.sinks);
        for worker in self.workers {
            let _ = worker.await;
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }
}

fn spawn_worker(sub: Arc<dyn Subscribe>) -> (Sink, JoinHandle<()>) {
    let name = sub.name();
    let (queue, mut inbox) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
    let worker = tokio::spawn(async move {
        while let Some(ev) = inbox.recv().await {
            let delivery = std::panic::AssertUnwindSafe(sub.on_event(&ev)).catch_unwind();
            if let Err(payload) = delivery.await {
                tracing::error!(
                    subscriber = name,
                    seq = ev.seq,
                    panic = %panic_message(&*payload),
                    "subscriber panicked"
                );
            }
        }
    });
    (Sink { name, queue }, worker)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
