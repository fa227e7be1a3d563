use super::resource::JobResource;
use crate::events::NotificationKind;

/// A cluster lifecycle notification, as delivered by an [`EventFeed`](super::EventFeed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceEvent {
    /// A resource appeared. `initial_list` marks the bootstrap replay of pre-existing state.
    Added {
        resource: JobResource,
        initial_list: bool,
    },
    /// A resource changed.
    Updated { prev: JobResource, curr: JobResource },
    /// A resource was removed; `last_known` is its final observed state.
    Deleted { last_known: JobResource },
    /// The feed saw something it could not interpret as a job resource. `kind` is
    /// the callback it arrived through; it still counts as that notification.
    Unrecognized {
        kind: NotificationKind,
        reason: String,
    },
}

impl ResourceEvent {
    /// Uid of the resource concerned, if any.
    pub fn uid(&self) -> Option<&str> {
        match self {
            ResourceEvent::Added { resource, .. } => Some(resource.uid()),
            ResourceEvent::Updated { curr, .. } => Some(curr.uid()),
            ResourceEvent::Deleted { last_known } => Some(last_known.uid()),
            ResourceEvent::Unrecognized { .. } => None,
        }
    }
}
