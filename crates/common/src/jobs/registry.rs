use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Classify, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Ready,
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JobStatus::Pending => "Pending",
            JobStatus::Ready => "Ready",
            JobStatus::Failed => "Failed",
        })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown job status: {0}")]
pub struct ParseStatusError(String);

impl FromStr for JobStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Pending" => Ok(JobStatus::Pending),
            "Ready" => Ok(JobStatus::Ready),
            "Failed" => Ok(JobStatus::Failed),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("no job with id {0}")]
    NotFound(Uuid),
    #[error("job {0} is still pending")]
    NotReady(Uuid),
    #[error("job {id} failed: {reason}")]
    Failed {
        id: Uuid,
        kind: ErrorKind,
        reason: String,
    },
    #[error("job {id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        id: Uuid,
        from: JobStatus,
        to: JobStatus,
    },
}

impl Classify for JobError {
    fn kind(&self) -> ErrorKind {
        match self {
            JobError::NotFound(_) => ErrorKind::NotFound,
            JobError::NotReady(_) => ErrorKind::Validation,
            JobError::Failed { kind, .. } => *kind,
            JobError::InvalidTransition { .. } => ErrorKind::Internal,
        }
    }
}

#[derive(Debug)]
enum Entry<T> {
    Pending,
    Ready(T),
    Failed { kind: ErrorKind, reason: String },
}

impl<T> Entry<T> {
    fn status(&self) -> JobStatus {
        match self {
            Entry::Pending => JobStatus::Pending,
            Entry::Ready(_) => JobStatus::Ready,
            Entry::Failed { .. } => JobStatus::Failed,
        }
    }
}

#[derive(Debug)]
struct Slot<T> {
    entry: Entry<T>,
    /// Set on the transition out of `Pending`
    finished_at: Option<Instant>,
}

/// Source of truth for whole-file job status.
///
/// Every job starts `Pending` and moves exactly once, to `Ready` or
/// `Failed`. All transitions take the write lock, so a reader can never see
/// a job go back to an earlier state. Finished jobs stay until evicted,
/// after which they read as unknown.
#[derive(Debug)]
pub struct JobRegistry<T> {
    jobs: Arc<RwLock<HashMap<Uuid, Slot<T>>>>,
}

impl<T> Clone for JobRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            jobs: self.jobs.clone(),
        }
    }
}

impl<T> Default for JobRegistry<T> {
    fn default() -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<T: Clone> JobRegistry<T> {
    /// Register a new pending job.
    pub fn register(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.jobs.write().insert(
            id,
            Slot {
                entry: Entry::Pending,
                finished_at: None,
            },
        );
        id
    }

    pub fn complete(&self, id: Uuid, outcome: T) -> Result<(), JobError> {
        self.transition(id, Entry::Ready(outcome))
    }

    pub fn fail(&self, id: Uuid, kind: ErrorKind, reason: impl Into<String>) -> Result<(), JobError> {
        self.transition(
            id,
            Entry::Failed {
                kind,
                reason: reason.into(),
            },
        )
    }

    fn transition(&self, id: Uuid, next: Entry<T>) -> Result<(), JobError> {
        let mut jobs = self.jobs.write();
        let slot = jobs.get_mut(&id).ok_or(JobError::NotFound(id))?;
        let from = slot.entry.status();
        if from != JobStatus::Pending {
            return Err(JobError::InvalidTransition {
                id,
                from,
                to: next.status(),
            });
        }
        tracing::debug!(job_id = %id, to = ?next.status(), "job transition");
        slot.entry = next;
        slot.finished_at = Some(Instant::now());
        Ok(())
    }

    pub fn status(&self, id: Uuid) -> Result<JobStatus, JobError> {
        self.jobs
            .read()
            .get(&id)
            .map(|slot| slot.entry.status())
            .ok_or(JobError::NotFound(id))
    }

    /// The outcome of a finished job. Pending and failed jobs are errors.
    pub fn outcome(&self, id: Uuid) -> Result<T, JobError> {
        match self.jobs.read().get(&id).map(|slot| &slot.entry) {
            None => Err(JobError::NotFound(id)),
            Some(Entry::Pending) => Err(JobError::NotReady(id)),
            Some(Entry::Ready(outcome)) => Ok(outcome.clone()),
            Some(Entry::Failed { kind, reason }) => Err(JobError::Failed {
                id,
                kind: *kind,
                reason: reason.clone(),
            }),
        }
    }

    /// Drop every job that finished at or before `cutoff` and return their
    /// ids. Pending jobs are never evicted.
    pub fn evict_finished_before(&self, cutoff: Instant) -> Vec<Uuid> {
        let mut jobs = self.jobs.write();
        let expired: Vec<Uuid> = jobs
            .iter()
            .filter(|(_, slot)| slot.finished_at.is_some_and(|at| at <= cutoff))
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            jobs.remove(id);
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_to_ready() {
        let registry = JobRegistry::<String>::default();
        let id = registry.register();
        assert_eq!(registry.status(id).unwrap(), JobStatus::Pending);
        assert!(matches!(registry.outcome(id), Err(JobError::NotReady(_))));

        registry.complete(id, "done".into()).unwrap();
        assert_eq!(registry.status(id).unwrap(), JobStatus::Ready);
        assert_eq!(registry.outcome(id).unwrap(), "done");
    }

    #[test]
    fn test_pending_to_failed_keeps_kind() {
        let registry = JobRegistry::<String>::default();
        let id = registry.register();
        registry.fail(id, ErrorKind::AccessDenied, "no tokens").unwrap();

        assert_eq!(registry.status(id).unwrap(), JobStatus::Failed);
        let err = registry.outcome(id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
    }

    #[test]
    fn test_terminal_states_never_change() {
        let registry = JobRegistry::<u32>::default();

        let ready = registry.register();
        registry.complete(ready, 1).unwrap();
        assert!(matches!(
            registry.fail(ready, ErrorKind::Internal, "late"),
            Err(JobError::InvalidTransition { .. })
        ));
        assert!(registry.complete(ready, 2).is_err());
        assert_eq!(registry.outcome(ready).unwrap(), 1);

        let failed = registry.register();
        registry.fail(failed, ErrorKind::Storage, "down").unwrap();
        assert!(registry.complete(failed, 3).is_err());
        assert_eq!(registry.status(failed).unwrap(), JobStatus::Failed);
    }

    #[test]
    fn test_unknown_job() {
        let registry = JobRegistry::<u32>::default();
        let id = Uuid::new_v4();
        assert!(matches!(registry.status(id), Err(JobError::NotFound(_))));
        assert!(matches!(registry.complete(id, 1), Err(JobError::NotFound(_))));
    }

    #[test]
    fn test_concurrent_transitions_pick_one_winner() {
        let registry = JobRegistry::<usize>::default();
        let id = registry.register();

        let winners: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|n| {
                    let registry = registry.clone();
                    scope.spawn(move || registry.complete(id, n).is_ok() as usize)
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });
        assert_eq!(winners, 1);
        assert_eq!(registry.status(id).unwrap(), JobStatus::Ready);
    }

    #[test]
    fn test_status_serializes_as_name() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Pending).unwrap(),
            "\"Pending\""
        );
        for status in [JobStatus::Pending, JobStatus::Ready, JobStatus::Failed] {
            assert_eq!(status.to_string().parse::<JobStatus>().unwrap(), status);
        }
        assert!("Done".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_evicts_only_finished_jobs() {
        let registry = JobRegistry::<u32>::default();
        let pending = registry.register();
        let ready = registry.register();
        let failed = registry.register();
        registry.complete(ready, 1).unwrap();
        registry.fail(failed, ErrorKind::Storage, "down").unwrap();

        let cutoff = Instant::now();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let late = registry.register();
        registry.complete(late, 2).unwrap();

        let mut evicted = registry.evict_finished_before(cutoff);
        evicted.sort();
        let mut expected = vec![ready, failed];
        expected.sort();
        assert_eq!(evicted, expected);

        assert!(matches!(registry.status(ready), Err(JobError::NotFound(_))));
        assert!(matches!(registry.outcome(failed), Err(JobError::NotFound(_))));
        assert_eq!(registry.status(pending).unwrap(), JobStatus::Pending);
        assert_eq!(registry.outcome(late).unwrap(), 2);
        assert_eq!(registry.len(), 2);
    }
}
