//! gridboot-scheduler: adapter over the external batch scheduler.
//!
//! The launcher only needs three things from the grid: submit a worker job,
//! ask for its run state, and learn which host it landed on. This crate
//! expresses those as [`BatchScheduler`] and implements it by driving the
//! scheduler's own command-line clients.
//!
//! # Architecture
//!
//! ```text
//! BatchScheduler (trait)
//!   ├── GridEngine   qsub -terse / qstat listing
//!   ├── Slurm        sbatch --parsable / squeue -o "%T|%N"
//!   └── Backend      config-selected dispatch over the two
//! ```
//!
//! No operation retries. Polling cadence and failure policy belong to the
//! caller.

use std::future::Future;

use gridboot_core::{JobHandle, JobRequest, JobState, SchedulerConfig, SchedulerKind};

pub mod command;
pub mod error;
pub mod grid_engine;
pub mod slurm;

pub use error::{SchedulerError, SchedulerResult};
pub use grid_engine::GridEngine;
pub use slurm::Slurm;

/// Client-side view of a batch scheduler session.
pub trait BatchScheduler: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Submit one job built from `request`.
    fn submit(
        &self,
        request: &JobRequest,
    ) -> impl Future<Output = SchedulerResult<JobHandle>> + Send;

    /// Single, non-blocking state query.
    fn poll_state(
        &self,
        handle: &JobHandle,
    ) -> impl Future<Output = SchedulerResult<JobState>> + Send;

    /// Host the job runs on. Only meaningful once the job is `Running`.
    fn resolve_host(
        &self,
        handle: &JobHandle,
    ) -> impl Future<Output = SchedulerResult<String>> + Send;
}

/// Scheduler selected by `[scheduler]` in gridboot.toml.
#[derive(Debug, Clone)]
pub enum Backend {
    GridEngine(GridEngine),
    Slurm(Slurm),
}

impl Backend {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        match config.kind {
            SchedulerKind::GridEngine => Backend::GridEngine(GridEngine::with_binaries(
                config.submit_bin.as_deref().unwrap_or("qsub"),
                config.status_bin.as_deref().unwrap_or("qstat"),
            )),
            SchedulerKind::Slurm => Backend::Slurm(Slurm::with_binaries(
                config.submit_bin.as_deref().unwrap_or("sbatch"),
                config.status_bin.as_deref().unwrap_or("squeue"),
            )),
        }
    }
}

impl BatchScheduler for Backend {
    fn name(&self) -> &'static str {
        match self {
            Backend::GridEngine(s) => s.name(),
            Backend::Slurm(s) => s.name(),
        }
    }

    async fn submit(&self, request: &JobRequest) -> SchedulerResult<JobHandle> {
        match self {
            Backend::GridEngine(s) => s.submit(request).await,
            Backend::Slurm(s) => s.submit(request).await,
        }
    }

    async fn poll_state(&self, handle: &JobHandle) -> SchedulerResult<JobState> {
        match self {
            Backend::GridEngine(s) => s.poll_state(handle).await,
            Backend::Slurm(s) => s.poll_state(handle).await,
        }
    }

    async fn resolve_host(&self, handle: &JobHandle) -> SchedulerResult<String> {
        match self {
            Backend::GridEngine(s) => s.resolve_host(handle).await,
            Backend::Slurm(s) => s.resolve_host(handle).await,
        }
    }
}
