//! Shared types used across gridboot crates.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Port every worker's bootstrap server listens on unless configured otherwise.
pub const DEFAULT_PEER_PORT: u16 = 8001;

/// Job name used when none is configured.
pub const DEFAULT_JOB_NAME: &str = "gridboot-worker";

/// Template for the worker jobs of one bootstrap run.
///
/// Every worker is submitted from the same request, so the scheduler sees
/// `worker_count` identical jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    pub worker_count: usize,
    /// Absolute path of the worker executable on the compute hosts.
    pub remote_command: String,
    /// Passed through verbatim to each worker.
    pub command_args: Vec<String>,
    /// Opaque native options forwarded to the scheduler (e.g. `-pe batch 16`).
    pub scheduler_options: String,
    pub notify_email: Option<String>,
    pub job_name: String,
    pub working_dir: Option<PathBuf>,
}

impl JobRequest {
    /// Create a request for `worker_count` copies of `remote_command`.
    pub fn new(worker_count: usize, remote_command: impl Into<String>) -> Self {
        Self {
            worker_count,
            remote_command: remote_command.into(),
            command_args: Vec::new(),
            scheduler_options: String::new(),
            notify_email: None,
            job_name: DEFAULT_JOB_NAME.to_string(),
            working_dir: None,
        }
    }

    /// Set the arguments passed to every worker.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the native scheduler options.
    pub fn with_scheduler_options(mut self, options: impl Into<String>) -> Self {
        self.scheduler_options = options.into();
        self
    }

    /// Set the address notified on job events. A blank address clears it.
    pub fn with_notify_email(mut self, email: impl Into<String>) -> Self {
        let email = email.into();
        self.notify_email = (!email.trim().is_empty()).then_some(email);
        self
    }

    /// Set the name the scheduler shows for each job.
    pub fn with_job_name(mut self, name: impl Into<String>) -> Self {
        self.job_name = name.into();
        self
    }

    /// Run the jobs in `dir` instead of the submit directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Pre-flight check run before anything is submitted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count < 1 {
            return Err(ConfigError::Invalid(
                "need at least one worker".to_string(),
            ));
        }
        if self.remote_command.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "remote command must not be empty".to_string(),
            ));
        }
        if self.job_name.trim().is_empty() {
            return Err(ConfigError::Invalid("job name must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Scheduler-assigned identifier of one submitted job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(String);

impl JobHandle {
    /// Wrap a scheduler-assigned job id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Run state of a job as reported by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Failed,
    Done,
    Unknown,
}

impl JobState {
    /// The job will never reach `Running` from this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Failed | JobState::Done)
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Failed => "failed",
            JobState::Done => "done",
            JobState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Address of a running worker's bootstrap server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerEndpoint {
    pub hostname: String,
    pub peer_port: u16,
}

impl WorkerEndpoint {
    /// Create an endpoint for `hostname` on `peer_port`.
    pub fn new(hostname: impl Into<String>, peer_port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            peer_port,
        }
    }

    /// `hostname:port`, as dialled by the launcher.
    pub fn address(&self) -> String {
        format!("{}:{}", self.hostname, self.peer_port)
    }

    /// URI form accepted by tonic endpoints.
    pub fn uri(&self) -> String {
        format!("http://{}", self.address())
    }
}

impl fmt::Display for WorkerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hostname, self.peer_port)
    }
}

/// Ordered hostnames of all bootstrapped workers.
///
/// Built by the launcher with [`Membership::push`], which keeps the first
/// occurrence of each host. Values received over the wire are stored as-is
/// via `From<Vec<String>>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Membership(Vec<String>);

impl Membership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a host. Returns `false` and leaves the list untouched if the
    /// host is already present.
    pub fn push(&mut self, hostname: impl Into<String>) -> bool {
        let hostname = hostname.into();
        if self.contains(&hostname) {
            return false;
        }
        self.0.push(hostname);
        true
    }

    pub fn contains(&self, hostname: &str) -> bool {
        self.0.iter().any(|h| h == hostname)
    }

    pub fn hosts(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }

    /// One endpoint per host, all on the same peer port.
    pub fn endpoints(&self, peer_port: u16) -> Vec<WorkerEndpoint> {
        self.0
            .iter()
            .map(|h| WorkerEndpoint::new(h.clone(), peer_port))
            .collect()
    }
}

impl From<Vec<String>> for Membership {
    fn from(hosts: Vec<String>) -> Self {
        Self(hosts)
    }
}

impl<'a> IntoIterator for &'a Membership {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Membership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}
