//! Errors that end a waveform job.

use crate::decoding::DecodeError;
use thiserror::Error;

/// Why a waveform job ended without publishing a profile
#[derive(Debug, Error)]
pub enum JobError {
    /// Superseded by a newer job or stopped explicitly
    #[error("Job cancelled")]
    Cancelled,

    /// Decoding the source failed
    #[error(transparent)]
    Decode(DecodeError),

    /// The worker panicked before reaching a terminal state
    #[error("Waveform worker panicked: {0}")]
    WorkerPanicked(String),
}

impl JobError {
    /// Cancellation is expected and not reported as a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, JobError::Cancelled)
    }
}

impl From<DecodeError> for JobError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Cancelled => JobError::Cancelled,
            other => JobError::Decode(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_cancellation_becomes_job_cancellation() {
        assert!(JobError::from(DecodeError::Cancelled).is_cancelled());
    }

    #[test]
    fn test_decode_failure_is_not_cancellation() {
        let err = JobError::from(DecodeError::UnsupportedFormat("garbage".into()));
        assert!(!err.is_cancelled());
        assert_eq!(err.to_string(), "Unsupported audio format: garbage");
    }
}
