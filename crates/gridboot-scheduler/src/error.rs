//! Scheduler adapter error types.

use gridboot_core::JobHandle;
use thiserror::Error;

/// Errors returned by [`BatchScheduler`](crate::BatchScheduler) operations.
///
/// The adapter never retries; every failure is handed back to the caller.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("job submission rejected: {reason}")]
    Submission { reason: String },

    #[error("state query for job {handle} failed: {reason}")]
    Poll { handle: JobHandle, reason: String },

    #[error("no destination host for job {handle}: {reason}")]
    HostResolution { handle: JobHandle, reason: String },
}

impl SchedulerError {
    pub(crate) fn submission(reason: impl ToString) -> Self {
        SchedulerError::Submission {
            reason: reason.to_string(),
        }
    }

    pub(crate) fn poll(handle: &JobHandle, reason: impl ToString) -> Self {
        SchedulerError::Poll {
            handle: handle.clone(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn host(handle: &JobHandle, reason: impl ToString) -> Self {
        SchedulerError::HostResolution {
            handle: handle.clone(),
            reason: reason.to_string(),
        }
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
