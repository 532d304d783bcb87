//! Job requests, identifiers and lifecycle states.

use super::bucketize::AmplitudeProfile;
use super::error::JobError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// What a job has to do before bucketizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Always decode the file, replacing any cached samples.
    DecodeAndBucketize,
    /// Reuse cached samples for the same file, decoding only when absent.
    BucketizeOnly,
}

/// A request to compute the profile of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub path: PathBuf,
    pub kind: JobKind,
}

impl JobRequest {
    pub fn decode(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: JobKind::DecodeAndBucketize,
        }
    }

    pub fn bucketize_only(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: JobKind::BucketizeOnly,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Monotonic job identifier, unique per service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job{}", self.0)
    }
}

/// Lifecycle of the service's current job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::Cancelled
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// State broadcast to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobStatus {
    /// Job the state belongs to; `None` while idle
    pub job: Option<JobId>,
    pub state: JobState,
    /// Terminal state of the most recently finished current job
    pub finished: Option<(JobId, JobState)>,
}

impl JobStatus {
    pub const IDLE: JobStatus = JobStatus {
        job: None,
        state: JobState::Idle,
        finished: None,
    };
}

/// Result of a job that reached a terminal state.
pub type JobOutcome = Result<Arc<AmplitudeProfile>, JobError>;

/// Handle to a submitted job.
pub struct JobHandle {
    id: JobId,
    task: JoinHandle<JobOutcome>,
}

impl JobHandle {
    pub(crate) fn new(id: JobId, task: JoinHandle<JobOutcome>) -> Self {
        Self { id, task }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the job to reach a terminal state.
    pub async fn outcome(self) -> JobOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => Err(JobError::WorkerPanicked(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_constructors() {
        let req = JobRequest::decode("/music/a.mp3");
        assert_eq!(req.kind, JobKind::DecodeAndBucketize);
        assert_eq!(req.path(), Path::new("/music/a.mp3"));

        let req = JobRequest::bucketize_only("/music/a.mp3");
        assert_eq!(req.kind, JobKind::BucketizeOnly);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobState::Idle.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Succeeded.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
    }

    #[test]
    fn test_job_id_display() {
        assert_eq!(JobId(12).to_string(), "job12");
    }
}
