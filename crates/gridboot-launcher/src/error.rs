//! Launcher error types.
//!
//! Only [`LaunchError`] aborts a run. [`SlotFailure`] and [`BroadcastError`]
//! are recorded per job or per host in the report and the run carries on.

use gridboot_core::{ConfigError, JobState};
use gridboot_peer::ClientError;
use serde::Serialize;
use thiserror::Error;

pub type LaunchResult<T> = Result<T, LaunchError>;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("invalid launch configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("only {reached} of {required} required workers started")]
    QuorumNotMet { required: usize, reached: usize },
}

/// Why one requested worker did not make it into the membership.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlotFailure {
    #[error("submission failed: {reason}")]
    Submission { reason: String },

    #[error("state query failed {attempts} times in a row: {reason}")]
    PollError { attempts: u32, reason: String },

    #[error("job not running after {waited_secs}s")]
    PollTimeout { waited_secs: u64 },

    #[error("job reached {state} before running")]
    JobEnded { state: JobState },

    #[error("host resolution failed: {reason}")]
    HostResolution { reason: String },

    #[error("discovery task ended without reporting")]
    TaskLost,
}

/// Why one worker did not receive the membership.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BroadcastError {
    #[error("not ready after {waited_ms}ms (last error: {last_error})")]
    NotReady { waited_ms: u64, last_error: String },

    #[error("connection failed: {reason}")]
    Connect { reason: String },

    #[error("call failed ({code}): {message}")]
    Call { code: String, message: String },

    #[error("call timed out")]
    Timeout,

    #[error("delivery task ended without reporting")]
    TaskLost,
}

impl From<ClientError> for BroadcastError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::InvalidEndpoint { reason, .. } | ClientError::Connect { reason, .. } => {
                BroadcastError::Connect { reason }
            }
            ClientError::Call { status, .. } => BroadcastError::Call {
                code: format!("{:?}", status.code()),
                message: status.message().to_string(),
            },
            ClientError::Timeout { .. } => BroadcastError::Timeout,
        }
    }
}
