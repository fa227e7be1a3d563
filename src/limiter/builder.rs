//! # LimiterBuilder: wiring for [`MaxInFlight`].
//!
//! Validates the [`Config`], creates the event [`Bus`] and the [`TokenPool`],
//! starts the subscriber fan-out, and fixes the next handler of the chain.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use inflight::{Config, Context, HandlerError, HandlerFn, Job, LimiterBuilder};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let scheduler = HandlerFn::arc("scheduler", |_ctx: Context, _job: Job| async { Ok(()) });
//! let limiter = LimiterBuilder::new(Config::with_max_in_flight(10)).build(scheduler)?;
//!
//! assert_eq!(limiter.max_in_flight(), 10);
//! assert_eq!(limiter.tokens_available(), 10);
//! # Ok(()) }
//! ```

use std::sync::Arc;

use super::max_in_flight::MaxInFlight;
use super::pool::TokenPool;
use crate::config::Config;
use crate::error::ConfigError;
use crate::events::{Bus, Event, EventKind};
use crate::handlers::HandlerRef;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for [`MaxInFlight`].
pub struct LimiterBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl LimiterBuilder {
    /// Creates a builder with no subscribers.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets the observability sinks.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the limiter in front of `next`.
    ///
    /// With subscribers configured this must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the configuration is invalid; nothing is started then.
    pub fn build(self, next: HandlerRef) -> Result<MaxInFlight, ConfigError> {
        self.cfg.validate()?;
        let pool = Arc::new(TokenPool::new(self.cfg.max_in_flight)?);
        let bus = Bus::new(self.cfg.bus_capacity_clamped());

        if !self.subscribers.is_empty() {
            // Subscribes before the first publish below.
            let _listener = SubscriberSet::new(self.subscribers).spawn_listener(&bus);
        }

        bus.publish(
            Event::new(EventKind::CapacityConfigured)
                .with_capacity(pool.capacity())
                .with_available(pool.available()),
        );

        Ok(MaxInFlight::new(pool, next, bus, self.cfg.sync_deadline()))
    }
}
