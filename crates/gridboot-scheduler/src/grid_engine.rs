//! Grid Engine backend (`qsub` / `qstat`).
//!
//! Jobs are submitted in binary mode (`-b y`) so the remote command is run
//! directly on the execution host. State and host come from the plain `qstat`
//! listing, run with `SGE_LONG_QNAMES=-1` so the `queue@host` column is never
//! cut to the default 30 characters:
//!
//! ```text
//! job-ID  prior   name       user   state submit/start at     queue               slots
//! -------------------------------------------------------------------------------------
//!  812345 0.55500 gridboot-w alice  r     10/19/2026 14:32:01 all.q@node017.grid  16
//!  812346 0.00000 gridboot-w alice  qw    10/19/2026 14:32:01                     16
//! ```

use gridboot_core::{JobHandle, JobRequest, JobState};
use tracing::{debug, info};

use crate::command;
use crate::error::{SchedulerError, SchedulerResult};
use crate::BatchScheduler;

/// Makes `qstat` print full queue instance names instead of truncating them.
const LONG_QNAMES: (&str, &str) = ("SGE_LONG_QNAMES", "-1");

/// One row of the `qstat` job listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QstatRow {
    pub job_id: String,
    pub state: String,
    /// Execution host, present once the job is bound to a queue instance.
    pub host: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GridEngine {
    qsub: String,
    qstat: String,
}

impl Default for GridEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GridEngine {
    /// Use `qsub` and `qstat` from `PATH`.
    pub fn new() -> Self {
        Self {
            qsub: "qsub".to_string(),
            qstat: "qstat".to_string(),
        }
    }

    /// Use explicit client binaries instead of `qsub`/`qstat` from `PATH`.
    pub fn with_binaries(qsub: impl Into<String>, qstat: impl Into<String>) -> Self {
        Self {
            qsub: qsub.into(),
            qstat: qstat.into(),
        }
    }

    /// Arguments passed to `qsub` for one worker job.
    pub fn submit_args(request: &JobRequest) -> Vec<String> {
        let mut args = vec![
            "-terse".to_string(),
            "-b".to_string(),
            "y".to_string(),
            "-N".to_string(),
            request.job_name.clone(),
        ];
        if let Some(email) = request.notify_email.as_deref().filter(|e| !e.trim().is_empty()) {
            args.extend(["-M".to_string(), email.to_string(), "-m".to_string(), "bea".to_string()]);
        }
        match &request.working_dir {
            Some(dir) => args.extend(["-wd".to_string(), dir.display().to_string()]),
            None => args.push("-cwd".to_string()),
        }
        args.extend(request.scheduler_options.split_whitespace().map(str::to_string));
        args.push(request.remote_command.clone());
        args.extend(request.command_args.iter().cloned());
        args
    }

    async fn find_row(&self, handle: &JobHandle) -> Result<Option<QstatRow>, command::CommandError> {
        let output = command::run_with_env(&self.qstat, &[], &[LONG_QNAMES])
            .await?
            .into_success()?;
        Ok(parse_qstat(&output.stdout)
            .into_iter()
            .find(|row| row.job_id == handle.as_str()))
    }
}

impl BatchScheduler for GridEngine {
    fn name(&self) -> &'static str {
        "grid-engine"
    }

    async fn submit(&self, request: &JobRequest) -> SchedulerResult<JobHandle> {
        let args = Self::submit_args(request);
        let output = command::run(&self.qsub, &args)
            .await
            .and_then(|o| o.into_success())
            .map_err(SchedulerError::submission)?;

        let job_id = parse_job_id(&output.stdout).ok_or_else(|| {
            SchedulerError::submission(format!(
                "unexpected qsub output: {:?}",
                output.stdout.trim()
            ))
        })?;

        info!(job_id = %job_id, "grid engine job submitted");
        Ok(JobHandle::new(job_id))
    }

    async fn poll_state(&self, handle: &JobHandle) -> SchedulerResult<JobState> {
        let row = self
            .find_row(handle)
            .await
            .map_err(|e| SchedulerError::poll(handle, e))?;

        let state = match row {
            Some(row) => state_from_code(&row.state),
            // Finished jobs drop out of the listing.
            None => JobState::Done,
        };
        debug!(job_id = %handle, %state, "polled grid engine job");
        Ok(state)
    }

    async fn resolve_host(&self, handle: &JobHandle) -> SchedulerResult<String> {
        let row = self
            .find_row(handle)
            .await
            .map_err(|e| SchedulerError::host(handle, e))?
            .ok_or_else(|| SchedulerError::host(handle, "job no longer listed by qstat"))?;

        row.host
            .ok_or_else(|| SchedulerError::host(handle, "job has no queue instance"))
    }
}

/// Job id from `qsub -terse` output. Array jobs print `id.first-last:step`.
pub fn parse_job_id(stdout: &str) -> Option<String> {
    let line = stdout.lines().map(str::trim).find(|l| !l.is_empty())?;
    let id = line.split('.').next()?;
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
        Some(id.to_string())
    } else {
        None
    }
}

/// Parse the plain `qstat` listing, skipping the header and separator lines.
pub fn parse_qstat(stdout: &str) -> Vec<QstatRow> {
    stdout
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 5 || !fields[0].chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            // The queue column (`queue@host`) follows the submit/start date and
            // time; it is blank while the job is waiting.
            let host = fields
                .iter()
                .skip(5)
                .find_map(|f| f.split_once('@'))
                .map(|(_, host)| host.to_string())
                .filter(|h| !h.is_empty());
            Some(QstatRow {
                job_id: fields[0].to_string(),
                state: fields[4].to_string(),
                host,
            })
        })
        .collect()
}

/// Map a Grid Engine state code (`r`, `qw`, `Eqw`, `dr`, ...) to a [`JobState`].
pub fn state_from_code(code: &str) -> JobState {
    if code.contains('E') {
        JobState::Failed
    } else if code.contains('d') {
        JobState::Done
    } else if code.contains('s') || code.contains('S') || code.contains('T') {
        // Suspended jobs are bound to a host but not serving.
        JobState::Pending
    } else if code.contains('r') {
        JobState::Running
    } else if code.contains('q') || code.contains('w') || code.contains('h') || code.contains('t') {
        JobState::Pending
    } else {
        JobState::Unknown
    }
}
