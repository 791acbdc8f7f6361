//! gridboot.toml configuration parser.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{DEFAULT_JOB_NAME, DEFAULT_PEER_PORT, JobRequest};

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridbootConfig {
    pub job: JobConfig,
    pub scheduler: SchedulerConfig,
    pub launch: LaunchConfig,
}

/// `[job]`: the worker job template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub workers: Option<usize>,
    pub remote_command: Option<String>,
    pub args: Vec<String>,
    pub native_spec: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub working_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchedulerKind {
    #[default]
    GridEngine,
    Slurm,
}

impl std::str::FromStr for SchedulerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grid-engine" | "sge" | "uge" => Ok(SchedulerKind::GridEngine),
            "slurm" => Ok(SchedulerKind::Slurm),
            other => Err(ConfigError::Invalid(format!(
                "unsupported scheduler '{other}' (expected grid-engine or slurm)"
            ))),
        }
    }
}

/// `[scheduler]`: which batch system to talk to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub kind: SchedulerKind,
    /// Override for `qsub` / `sbatch`.
    pub submit_bin: Option<String>,
    /// Override for `qstat` / `squeue`.
    pub status_bin: Option<String>,
}

/// How the launcher decides a worker is ready to receive the membership.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadinessMode {
    /// Ping each worker's bootstrap server until it answers.
    #[default]
    Handshake,
    /// Sleep for `settle_delay_secs` and assume every worker is listening.
    Delay,
}

/// `[launch]`: timing and policy of the bootstrap run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    pub peer_port: u16,
    pub poll_interval_ms: u64,
    /// Consecutive failed state queries after which a job is given up.
    pub poll_error_limit: u32,
    pub running_timeout_secs: Option<u64>,
    pub readiness: ReadinessMode,
    pub settle_delay_secs: u64,
    pub readiness_timeout_secs: u64,
    pub readiness_interval_ms: u64,
    pub rpc_timeout_secs: u64,
    /// Abort before broadcast when fewer workers resolve. Unset means any
    /// non-empty membership is broadcast.
    pub min_workers: Option<usize>,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            peer_port: DEFAULT_PEER_PORT,
            poll_interval_ms: 500,
            poll_error_limit: 5,
            running_timeout_secs: None,
            readiness: ReadinessMode::Handshake,
            settle_delay_secs: 10,
            readiness_timeout_secs: 30,
            readiness_interval_ms: 250,
            rpc_timeout_secs: 5,
            min_workers: None,
        }
    }
}

impl LaunchConfig {
    /// Delay between state queries for one job.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// How long a job may take to reach `Running`. `None` waits forever.
    pub fn running_timeout(&self) -> Option<Duration> {
        self.running_timeout_secs.map(Duration::from_secs)
    }

    /// Fixed wait before broadcasting in `delay` readiness mode.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    /// Per-host deadline for the readiness handshake.
    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_secs(self.readiness_timeout_secs)
    }

    /// Delay between readiness pings to one host.
    pub fn readiness_interval(&self) -> Duration {
        Duration::from_millis(self.readiness_interval_ms)
    }

    /// Deadline for a single bootstrap RPC.
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.peer_port == 0 {
            return Err(ConfigError::Invalid("peer_port must be non-zero".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be non-zero".to_string(),
            ));
        }
        if self.poll_error_limit == 0 {
            return Err(ConfigError::Invalid(
                "poll_error_limit must be at least 1".to_string(),
            ));
        }
        if self.readiness == ReadinessMode::Handshake && self.readiness_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "readiness_interval_ms must be non-zero".to_string(),
            ));
        }
        if self.rpc_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "rpc_timeout_secs must be non-zero".to_string(),
            ));
        }
        if self.min_workers == Some(0) {
            return Err(ConfigError::Invalid(
                "min_workers must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}

impl GridbootConfig {
    /// Load and parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Build the job template, checking that every required setting is present.
    pub fn job_request(&self) -> Result<JobRequest, ConfigError> {
        let workers = self.job.workers.ok_or(ConfigError::Missing("job.workers"))?;
        let command = self
            .job
            .remote_command
            .clone()
            .ok_or(ConfigError::Missing("job.remote_command"))?;

        let mut request = JobRequest::new(workers, command)
            .with_args(self.job.args.iter().cloned())
            .with_scheduler_options(self.job.native_spec.clone())
            .with_job_name(
                self.job
                    .name
                    .clone()
                    .unwrap_or_else(|| DEFAULT_JOB_NAME.to_string()),
            );
        if let Some(email) = &self.job.email {
            request = request.with_notify_email(email.clone());
        }
        if let Some(dir) = &self.job.working_dir {
            request = request.with_working_dir(dir.clone());
        }

        request.validate()?;
        if let Some(min) = self.launch.min_workers
            && min > workers
        {
            return Err(ConfigError::Invalid(format!(
                "min_workers ({min}) exceeds requested workers ({workers})"
            )));
        }
        Ok(request)
    }

    /// A starter gridboot.toml with every section filled in.
    pub fn scaffold() -> Self {
        GridbootConfig {
            job: JobConfig {
                workers: Some(4),
                remote_command: Some("/opt/worker/bin/worker".to_string()),
                args: vec!["serve".to_string()],
                native_spec: "-pe batch 16".to_string(),
                email: None,
                name: Some(DEFAULT_JOB_NAME.to_string()),
                working_dir: None,
            },
            scheduler: SchedulerConfig::default(),
            launch: LaunchConfig::default(),
        }
    }
}
