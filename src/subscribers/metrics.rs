//! # Prometheus metrics subscriber.
//!
//! [`Metrics`] owns a Prometheus [`Registry`] and turns limiter events into
//! counters and histograms. The available-token gauge is not event-driven: it is
//! sampled from the live pool at scrape time via [`Metrics::watch_pool`].
//!
//! | Metric | Type | Source |
//! |--------|------|--------|
//! | `<ns>_limiter_max_in_flight` | Gauge | `CapacityConfigured` |
//! | `<ns>_limiter_tokens_available` | Gauge | pool, read on scrape |
//! | `<ns>_limiter_token_wait_duration_seconds` | Histogram | `TokenAcquired` |
//! | `<ns>_limiter_onadd_events_total` | Counter | `ResourceAdded`, ignored adds |
//! | `<ns>_limiter_onupdate_events_total` | Counter | `ResourceUpdated`, ignored updates |
//! | `<ns>_limiter_ondelete_events_total` | Counter | `ResourceDeleted`, ignored deletes |
//! | `<ns>_limiter_stale_jobs_total` | Counter | `JobStale` |
//! | `<ns>_limiter_canceled_waits_total` | Counter | `WaitCanceled` |
//! | `<ns>_limiter_handler_errors_total` | Counter | `TokenReturned` |
//!
//! ## Example
//! ```no_run
//! # use std::sync::Arc;
//! # use inflight::{Config, HandlerFn, LimiterBuilder, Metrics};
//! # fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = Arc::new(Metrics::new("buildkite")?);
//! let next = HandlerFn::arc("scheduler", |_ctx, _job| async { Ok(()) });
//! let limiter = LimiterBuilder::new(Config::default())
//!     .with_subscribers(vec![metrics.clone()])
//!     .build(next)?;
//! metrics.watch_pool(limiter.pool())?;
//!
//! let body = metrics.encode_text()?;
//! # let _ = body; Ok(()) }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry, TextEncoder,
};
use thiserror::Error;

use crate::events::{Event, EventKind, NotificationKind};
use crate::limiter::TokenPool;
use crate::subscribers::Subscribe;

/// Namespace used by [`Metrics::default_registry`].
pub const DEFAULT_NAMESPACE: &str = "inflight";

const SUBSYSTEM: &str = "limiter";

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Failed to register a metric with Prometheus.
    #[error("failed to register metric: {0}")]
    Registration(#[from] prometheus::Error),

    /// Failed to encode metrics output.
    #[error("failed to encode metrics: {0}")]
    Encoding(String),
}

/// Result type for metrics operations.
pub type MetricsResult<T> = Result<T, MetricsError>;

/// Limiter metrics, fed by events.
///
/// All metrics use interior mutability; the struct is `Clone`, `Send`, and `Sync`.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    namespace: String,
    max_in_flight: IntGauge,
    token_wait_duration: Histogram,
    onadd_events: IntCounter,
    onupdate_events: IntCounter,
    ondelete_events: IntCounter,
    stale_jobs: IntCounter,
    canceled_waits: IntCounter,
    handler_errors: IntCounter,
}

impl Metrics {
    /// Creates metrics under `namespace` in a fresh registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the namespace is not a valid metric name prefix.
    pub fn new(namespace: &str) -> MetricsResult<Self> {
        Self::with_registry(namespace, Registry::new())
    }

    /// Creates metrics under [`DEFAULT_NAMESPACE`] in a fresh registry.
    ///
    /// # Errors
    ///
    /// See [`Metrics::new`].
    pub fn default_registry() -> MetricsResult<Self> {
        Self::new(DEFAULT_NAMESPACE)
    }

    /// Creates metrics under `namespace` and registers them with `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error if any metric fails to register (e.g. duplicate name).
    pub fn with_registry(namespace: &str, registry: Registry) -> MetricsResult<Self> {
        let opts = |name: &str, help: &str| {
            Opts::new(name, help)
                .namespace(namespace)
                .subsystem(SUBSYSTEM)
        };

        let max_in_flight = IntGauge::with_opts(opts(
            "max_in_flight",
            "Configured limit on number of jobs simultaneously in flight",
        ))?;
        registry.register(Box::new(max_in_flight.clone()))?;

        let token_wait_duration = Histogram::with_opts(
            HistogramOpts::new(
                "token_wait_duration_seconds",
                "Time spent waiting for a limiter token to become available",
            )
            .namespace(namespace)
            .subsystem(SUBSYSTEM)
            .buckets(prometheus::exponential_buckets(0.001, 4.0, 10)?),
        )?;
        registry.register(Box::new(token_wait_duration.clone()))?;

        let counter = |name: &str, help: &str| -> MetricsResult<IntCounter> {
            let c = IntCounter::with_opts(opts(name, help))?;
            registry.register(Box::new(c.clone()))?;
            Ok(c)
        };
        let onadd_events = counter(
            "onadd_events_total",
            "Count of resource-added notifications handled by the limiter",
        )?;
        let onupdate_events = counter(
            "onupdate_events_total",
            "Count of resource-updated notifications handled by the limiter",
        )?;
        let ondelete_events = counter(
            "ondelete_events_total",
            "Count of resource-deleted notifications handled by the limiter",
        )?;
        let stale_jobs = counter(
            "stale_jobs_total",
            "Count of jobs that went stale while waiting for a token",
        )?;
        let canceled_waits = counter(
            "canceled_waits_total",
            "Count of token waits abandoned because the context was cancelled",
        )?;
        let handler_errors = counter(
            "handler_errors_total",
            "Count of jobs whose token was returned after the next handler failed",
        )?;

        Ok(Self {
            registry,
            namespace: namespace.to_owned(),
            max_in_flight,
            token_wait_duration,
            onadd_events,
            onupdate_events,
            ondelete_events,
            stale_jobs,
            canceled_waits,
            handler_errors,
        })
    }

    /// Registers `<ns>_limiter_tokens_available`, read from `pool` on every scrape.
    ///
    /// # Errors
    ///
    /// Returns an error if a pool gauge is already registered.
    pub fn watch_pool(&self, pool: Arc<TokenPool>) -> MetricsResult<()> {
        let gauge = IntGauge::with_opts(
            Opts::new(
                "tokens_available",
                "Limiter tokens currently available",
            )
            .namespace(self.namespace.as_str())
            .subsystem(SUBSYSTEM),
        )?;
        self.registry
            .register(Box::new(PoolGauge { gauge, pool }))?;
        Ok(())
    }

    /// Returns the underlying Prometheus registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn encode_text(&self) -> MetricsResult<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| MetricsError::Encoding(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| MetricsError::Encoding(e.to_string()))
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Subscribe for Metrics {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::CapacityConfigured => {
                if let Some(cap) = e.capacity {
                    self.max_in_flight.set(i64::try_from(cap).unwrap_or(i64::MAX));
                }
            }
            EventKind::TokenAcquired => {
                if let Some(wait) = e.wait {
                    self.token_wait_duration.observe(wait.as_secs_f64());
                }
            }
            EventKind::TokenReturned => self.handler_errors.inc(),
            EventKind::JobStale => self.stale_jobs.inc(),
            EventKind::WaitCanceled => self.canceled_waits.inc(),
            EventKind::ResourceAdded => self.onadd_events.inc(),
            EventKind::ResourceUpdated => self.onupdate_events.inc(),
            EventKind::ResourceDeleted => self.ondelete_events.inc(),
            EventKind::ResourceIgnored => match e.notification {
                Some(NotificationKind::Add) => self.onadd_events.inc(),
                Some(NotificationKind::Update) => self.onupdate_events.inc(),
                Some(NotificationKind::Delete) => self.ondelete_events.inc(),
                None => {}
            },
            EventKind::FeedSynced => {}
        }
    }

    fn name(&self) -> &'static str {
        "metrics"
    }
}

/// Gauge whose value is sampled from the pool when collected.
struct PoolGauge {
    gauge: IntGauge,
    pool: Arc<TokenPool>,
}

impl Collector for PoolGauge {
    fn desc(&self) -> Vec<&Desc> {
        self.gauge.desc()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.gauge
            .set(i64::try_from(self.pool.available()).unwrap_or(i64::MAX));
        self.gauge.collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::proto::MetricType;
    use std::time::Duration;

    fn sample(metrics: &Metrics, name: &str) -> Option<f64> {
        metrics
            .registry()
            .gather()
            .into_iter()
            .find(|mf| mf.get_name() == name)
            .and_then(|mf| {
                let m = mf.get_metric().first()?;
                Some(match mf.get_field_type() {
                    MetricType::COUNTER => m.get_counter().get_value(),
                    _ => m.get_gauge().get_value(),
                })
            })
    }

    #[tokio::test]
    async fn events_drive_counters() {
        let metrics = Metrics::new("test").unwrap();

        metrics
            .on_event(&Event::new(EventKind::CapacityConfigured).with_capacity(5))
            .await;
        metrics.on_event(&Event::new(EventKind::ResourceAdded)).await;
        metrics.on_event(&Event::new(EventKind::ResourceAdded)).await;
        metrics.on_event(&Event::new(EventKind::ResourceUpdated)).await;
        metrics.on_event(&Event::new(EventKind::ResourceDeleted)).await;
        metrics.on_event(&Event::new(EventKind::FeedSynced)).await;
        metrics.on_event(&Event::new(EventKind::JobStale)).await;
        metrics.on_event(&Event::new(EventKind::TokenReturned)).await;
        metrics.on_event(&Event::new(EventKind::WaitCanceled)).await;

        assert_eq!(sample(&metrics, "test_limiter_max_in_flight"), Some(5.0));
        assert_eq!(sample(&metrics, "test_limiter_onadd_events_total"), Some(2.0));
        assert_eq!(sample(&metrics, "test_limiter_onupdate_events_total"), Some(1.0));
        assert_eq!(sample(&metrics, "test_limiter_ondelete_events_total"), Some(1.0));
        assert_eq!(sample(&metrics, "test_limiter_stale_jobs_total"), Some(1.0));
        assert_eq!(sample(&metrics, "test_limiter_handler_errors_total"), Some(1.0));
        assert_eq!(sample(&metrics, "test_limiter_canceled_waits_total"), Some(1.0));
    }

    #[tokio::test]
    async fn ignored_notifications_count_toward_their_callback() {
        let metrics = Metrics::new("test").unwrap();
        let ignored = |kind| Event::new(EventKind::ResourceIgnored).with_notification(kind);

        metrics.on_event(&ignored(NotificationKind::Add)).await;
        metrics.on_event(&ignored(NotificationKind::Add)).await;
        metrics.on_event(&ignored(NotificationKind::Delete)).await;
        metrics.on_event(&Event::new(EventKind::ResourceIgnored)).await;

        assert_eq!(sample(&metrics, "test_limiter_onadd_events_total"), Some(2.0));
        assert_eq!(sample(&metrics, "test_limiter_onupdate_events_total"), Some(0.0));
        assert_eq!(sample(&metrics, "test_limiter_ondelete_events_total"), Some(1.0));
    }

    #[tokio::test]
    async fn wait_histogram_observes_acquisitions() {
        let metrics = Metrics::new("test").unwrap();
        metrics
            .on_event(
                &Event::new(EventKind::TokenAcquired).with_wait(Duration::from_millis(20)),
            )
            .await;

        let text = metrics.encode_text().unwrap();
        assert!(text.contains("test_limiter_token_wait_duration_seconds_count 1"));
    }

    #[test]
    fn tokens_available_is_read_live() {
        let metrics = Metrics::new("test").unwrap();
        let pool = Arc::new(TokenPool::new(3).unwrap());
        metrics.watch_pool(Arc::clone(&pool)).unwrap();

        assert_eq!(sample(&metrics, "test_limiter_tokens_available"), Some(3.0));
        assert!(pool.try_acquire());
        assert_eq!(sample(&metrics, "test_limiter_tokens_available"), Some(2.0));

        // A second pool gauge would collide.
        assert!(metrics.watch_pool(pool).is_err());
    }

    #[test]
    fn invalid_namespace_is_rejected() {
        assert!(matches!(
            Metrics::new("not a namespace"),
            Err(MetricsError::Registration(_))
        ));
    }
}
