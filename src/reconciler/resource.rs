//! # Cluster job resources.
//!
//! [`JobResource`] is the reconciler's view of one job running in the cluster.
//! Only its status matters to capacity accounting: a resource is *finished* once
//! it carries a true `Complete` or `Failed` condition, and finished resources
//! never hold a token.

use std::sync::Arc;

/// Kind of a job status condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    /// The job ran to completion.
    Complete,
    /// The job failed terminally.
    Failed,
    /// The job is suspended; not terminal.
    Suspended,
}

/// One status condition of a job resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobCondition {
    pub kind: ConditionKind,
    pub status: bool,
}

/// Observed status of a job resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobStatus {
    /// Pods currently running.
    pub active: u32,
    /// Pods that succeeded.
    pub succeeded: u32,
    /// Pods that failed.
    pub failed: u32,
    pub conditions: Vec<JobCondition>,
}

impl JobStatus {
    /// True when a `Complete` or `Failed` condition is set to true.
    pub fn is_finished(&self) -> bool {
        self.conditions.iter().any(|c| {
            c.status && matches!(c.kind, ConditionKind::Complete | ConditionKind::Failed)
        })
    }

    /// Returns a copy with `kind` set to `status`, replacing an existing condition of that kind.
    pub fn with_condition(mut self, kind: ConditionKind, status: bool) -> Self {
        match self.conditions.iter_mut().find(|c| c.kind == kind) {
            Some(c) => c.status = status,
            None => self.conditions.push(JobCondition { kind, status }),
        }
        self
    }
}

/// A job resource as reported by the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResource {
    uid: Arc<str>,
    name: Arc<str>,
    pub status: JobStatus,
}

impl JobResource {
    /// A freshly created resource: one active pod, no conditions.
    pub fn running(uid: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            status: JobStatus {
                active: 1,
                ..JobStatus::default()
            },
        }
    }

    /// A resource that already completed successfully.
    pub fn completed(uid: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Self::running(uid, name).complete()
    }

    /// Returns this resource transitioned to a successful terminal state.
    pub fn complete(mut self) -> Self {
        self.status.active = 0;
        self.status.succeeded += 1;
        self.status = self.status.with_condition(ConditionKind::Complete, true);
        self
    }

    /// Returns this resource transitioned to a failed terminal state.
    pub fn fail(mut self) -> Self {
        self.status.active = 0;
        self.status.failed += 1;
        self.status = self.status.with_condition(ConditionKind::Failed, true);
        self
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub(crate) fn uid_arc(&self) -> Arc<str> {
        Arc::clone(&self.uid)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// See [`JobStatus::is_finished`].
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.status.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_is_not_finished() {
        assert!(!JobResource::running("u1", "job-1").is_finished());
    }

    #[test]
    fn complete_and_failed_are_finished() {
        assert!(JobResource::running("u1", "job-1").complete().is_finished());
        assert!(JobResource::running("u2", "job-2").fail().is_finished());
    }

    #[test]
    fn suspended_or_false_conditions_are_not_finished() {
        let status = JobStatus::default()
            .with_condition(ConditionKind::Suspended, true)
            .with_condition(ConditionKind::Complete, false);
        assert!(!status.is_finished());

        let status = status.with_condition(ConditionKind::Complete, true);
        assert!(status.is_finished());
        assert_eq!(status.conditions.len(), 2);
    }
}
