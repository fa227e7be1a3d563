//! # Job handler chain.
//!
//! - [`JobHandler`] - async handler contract, one link of the chain
//! - [`HandlerFn`] - closure-backed handler
//! - [`HandlerRef`] - shared reference to a handler (`Arc<dyn JobHandler>`)

mod handler;
mod handler_fn;

pub use handler::{HandlerRef, JobHandler};
pub use handler_fn::HandlerFn;
