//! # Jobs and their staleness signals.
//!
//! - [`Job`] - identifier + staleness signal + opaque payload
//! - [`StaleSignal`] - one-shot "data too old" notification owned by upstream

mod job;
mod stale;

pub use job::{Job, Payload};
pub use stale::StaleSignal;
