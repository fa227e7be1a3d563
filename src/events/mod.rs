//! Limiter events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the admission limiter and the reconciler.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `LimiterBuilder` (capacity), `MaxInFlight` (admission outcomes),
//!   `Reconciler` (resource notifications, feed sync).
//! - **Consumer**: the fan-out listener spawned by `LimiterBuilder::build`, which
//!   forwards every event to the `SubscriberSet`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind, NotificationKind};
