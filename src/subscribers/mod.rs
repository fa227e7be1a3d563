//! # Event subscribers for the admission limiter.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out,
//! and built-in implementations fed by events published on the [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   MaxInFlight / Reconciler ── publish(Event) ──► Bus ──► fan-out listener
//!                                                              │
//!                                                              ▼
//!                                                        SubscriberSet
//!                                                   ┌──────────┼──────────┐
//!                                                   ▼          ▼          ▼
//!                                               LogWriter   Metrics    Custom
//! ```
//!
//! ## Built-ins
//! - [`LogWriter`] (feature `logging`): renders events through `tracing`
//! - [`Metrics`] (feature `metrics`): Prometheus counters, histogram, and a live pool gauge

#[cfg(feature = "logging")]
mod log;
#[cfg(feature = "metrics")]
mod metrics;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
#[cfg(feature = "metrics")]
pub use metrics::{DEFAULT_NAMESPACE, Metrics, MetricsError, MetricsResult};
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
