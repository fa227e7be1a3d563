//! # Admission limiting.
//!
//! - [`TokenPool`] - bounded counting semaphore shared with the reconciler
//! - [`MaxInFlight`] - the limiting [`JobHandler`](crate::JobHandler)
//! - [`LimiterBuilder`] - validates config and wires pool, bus and subscribers

mod builder;
mod max_in_flight;
mod pool;

pub use builder::LimiterBuilder;
pub use max_in_flight::MaxInFlight;
pub use pool::{Acquisition, TokenPool};
