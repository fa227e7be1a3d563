//! # Cluster state reconciliation.
//!
//! - [`Reconciler`] - applies lifecycle notifications to the token pool
//! - [`EventFeed`] - replay-then-live notification source, [`FeedItem`], [`FeedStream`]
//! - [`MemoryFeed`] - in-memory feed backed by a cluster-state snapshot
//! - [`ResourceEvent`] - typed notification, with an explicit unrecognized case
//! - [`JobResource`], [`JobStatus`] - the cluster's view of a job

mod core;
mod event;
mod feed;
mod memory;
mod resource;

pub use self::core::Reconciler;
pub use event::ResourceEvent;
pub use feed::{EventFeed, FeedItem, FeedStream};
pub use memory::MemoryFeed;
pub use resource::{ConditionKind, JobCondition, JobResource, JobStatus};
