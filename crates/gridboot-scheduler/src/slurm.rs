//! Slurm backend (`sbatch` / `squeue`).

use gridboot_core::{JobHandle, JobRequest, JobState};
use tracing::{debug, info};

use crate::command::{self, shell_quote};
use crate::error::{SchedulerError, SchedulerResult};
use crate::BatchScheduler;

const SQUEUE_FORMAT: &str = "%T|%N";

#[derive(Debug, Clone)]
pub struct Slurm {
    sbatch: String,
    squeue: String,
}

impl Default for Slurm {
    fn default() -> Self {
        Self::new()
    }
}

/// Parsed `squeue -o "%T|%N"` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqueueEntry {
    pub state: JobState,
    pub first_node: Option<String>,
}

impl Slurm {
    /// Use `sbatch` and `squeue` from `PATH`.
    pub fn new() -> Self {
        Self {
            sbatch: "sbatch".to_string(),
            squeue: "squeue".to_string(),
        }
    }

    /// Use explicit client binaries instead of `sbatch`/`squeue` from `PATH`.
    pub fn with_binaries(sbatch: impl Into<String>, squeue: impl Into<String>) -> Self {
        Self {
            sbatch: sbatch.into(),
            squeue: squeue.into(),
        }
    }

    /// Arguments passed to `sbatch` for one worker job.
    pub fn submit_args(request: &JobRequest) -> Vec<String> {
        let mut args = vec![
            "--parsable".to_string(),
            "--job-name".to_string(),
            request.job_name.clone(),
        ];
        if let Some(email) = request.notify_email.as_deref().filter(|e| !e.trim().is_empty()) {
            args.extend([
                "--mail-user".to_string(),
                email.to_string(),
                "--mail-type".to_string(),
                "ALL".to_string(),
            ]);
        }
        if let Some(dir) = &request.working_dir {
            args.extend(["--chdir".to_string(), dir.display().to_string()]);
        }
        args.extend(request.scheduler_options.split_whitespace().map(str::to_string));

        let wrapped: Vec<String> = std::iter::once(&request.remote_command)
            .chain(request.command_args.iter())
            .map(|a| shell_quote(a))
            .collect();
        args.push("--wrap".to_string());
        args.push(wrapped.join(" "));
        args
    }

    /// `None` when the job is no longer known to the controller.
    async fn query(&self, handle: &JobHandle) -> Result<Option<SqueueEntry>, command::CommandError> {
        let args = vec![
            "-h".to_string(),
            "-j".to_string(),
            handle.to_string(),
            "-o".to_string(),
            SQUEUE_FORMAT.to_string(),
        ];
        let output = command::run(&self.squeue, &args).await?;
        if !output.status.success() && output.stderr.contains("Invalid job id") {
            return Ok(None);
        }
        let output = output.into_success()?;
        Ok(parse_squeue(&output.stdout))
    }
}

impl BatchScheduler for Slurm {
    fn name(&self) -> &'static str {
        "slurm"
    }

    async fn submit(&self, request: &JobRequest) -> SchedulerResult<JobHandle> {
        let args = Self::submit_args(request);
        let output = command::run(&self.sbatch, &args)
            .await
            .and_then(|o| o.into_success())
            .map_err(SchedulerError::submission)?;

        let job_id = parse_job_id(&output.stdout).ok_or_else(|| {
            SchedulerError::submission(format!(
                "unexpected sbatch output: {:?}",
                output.stdout.trim()
            ))
        })?;

        info!(job_id = %job_id, "slurm job submitted");
        Ok(JobHandle::new(job_id))
    }

    async fn poll_state(&self, handle: &JobHandle) -> SchedulerResult<JobState> {
        let entry = self
            .query(handle)
            .await
            .map_err(|e| SchedulerError::poll(handle, e))?;
        let state = entry.map_or(JobState::Done, |e| e.state);
        debug!(job_id = %handle, %state, "polled slurm job");
        Ok(state)
    }

    async fn resolve_host(&self, handle: &JobHandle) -> SchedulerResult<String> {
        self.query(handle)
            .await
            .map_err(|e| SchedulerError::host(handle, e))?
            .ok_or_else(|| SchedulerError::host(handle, "job no longer known to slurm"))?
            .first_node
            .ok_or_else(|| SchedulerError::host(handle, "no node allocated"))
    }
}

/// Job id from `sbatch --parsable` output (`id` or `id;cluster`).
pub fn parse_job_id(stdout: &str) -> Option<String> {
    let line = stdout.lines().map(str::trim).find(|l| !l.is_empty())?;
    let id = line.split(';').next()?.trim();
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit() || c == '_') {
        Some(id.to_string())
    } else {
        None
    }
}

pub fn parse_squeue(stdout: &str) -> Option<SqueueEntry> {
    let line = stdout.lines().map(str::trim).find(|l| !l.is_empty())?;
    let (state, nodes) = line.split_once('|').unwrap_or((line, ""));
    Some(SqueueEntry {
        state: state_from_name(state),
        first_node: first_node(nodes),
    })
}

pub fn state_from_name(name: &str) -> JobState {
    match name.trim() {
        "RUNNING" | "COMPLETING" => JobState::Running,
        "PENDING" | "CONFIGURING" | "SUSPENDED" | "REQUEUED" | "RESIZING" => JobState::Pending,
        "FAILED" | "CANCELLED" | "TIMEOUT" | "NODE_FAIL" | "OUT_OF_MEMORY" | "PREEMPTED"
        | "BOOT_FAIL" | "DEADLINE" => JobState::Failed,
        "COMPLETED" => JobState::Done,
        _ => JobState::Unknown,
    }
}

/// First host of a Slurm node list, expanding bracket ranges
/// (`node[017-018,020]` gives `node017`).
pub fn first_node(list: &str) -> Option<String> {
    let list = list.trim();
    if list.is_empty() || list == "(null)" {
        return None;
    }

    let mut depth = 0usize;
    let mut end = list.len();
    for (i, c) in list.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                end = i;
                break;
            }
            _ => {}
        }
    }
    let entry = &list[..end];

    let Some(open) = entry.find('[') else {
        return Some(entry.to_string());
    };
    let close = entry[open..].find(']').map(|i| open + i)?;
    let prefix = &entry[..open];
    let suffix = &entry[close + 1..];
    let first = entry[open + 1..close].split([',', '-']).next()?;
    Some(format!("{prefix}{first}{suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_parsable_ids() {
        assert_eq!(parse_job_id("4242\n"), Some("4242".to_string()));
        assert_eq!(parse_job_id("4242;cluster-a\n"), Some("4242".to_string()));
        assert_eq!(parse_job_id("sbatch: error"), None);
    }

    #[test]
    fn maps_state_names() {
        assert_eq!(state_from_name("RUNNING"), JobState::Running);
        assert_eq!(state_from_name("PENDING"), JobState::Pending);
        assert_eq!(state_from_name("NODE_FAIL"), JobState::Failed);
        assert_eq!(state_from_name("CANCELLED"), JobState::Failed);
        assert_eq!(state_from_name("COMPLETED"), JobState::Done);
        assert_eq!(state_from_name("STAGE_OUT"), JobState::Unknown);
    }

    #[test]
    fn expands_first_node() {
        assert_eq!(first_node("node017"), Some("node017".to_string()));
        assert_eq!(first_node("node[017-018,020]"), Some("node017".to_string()));
        assert_eq!(first_node("gpu[3,5]-ib,cpu1"), Some("gpu3-ib".to_string()));
        assert_eq!(first_node("a1,b2"), Some("a1".to_string()));
        assert_eq!(first_node(""), None);
        assert_eq!(first_node("(null)"), None);
    }

    #[test]
    fn parses_squeue_line() {
        let entry = parse_squeue("RUNNING|node[1-2]\n").unwrap();
        assert_eq!(entry.state, JobState::Running);
        assert_eq!(entry.first_node.as_deref(), Some("node1"));

        let pending = parse_squeue("PENDING|\n").unwrap();
        assert_eq!(pending.state, JobState::Pending);
        assert!(pending.first_node.is_none());

        assert!(parse_squeue("").is_none());
    }

    #[test]
    fn submit_args_wrap_command() {
        let req = JobRequest::new(2, "/opt/bin/worker")
            .with_args(["serve", "my data"])
            .with_scheduler_options("--partition=batch --cpus-per-task=16")
            .with_notify_email("ops@example.org");

        let args = Slurm::submit_args(&req);
        assert_eq!(args[0], "--parsable");
        assert!(args.windows(2).any(|w| w == ["--mail-user", "ops@example.org"]));
        assert!(args.contains(&"--partition=batch".to_string()));
        assert!(args.contains(&"--cpus-per-task=16".to_string()));
        assert_eq!(args[args.len() - 2], "--wrap");
        assert_eq!(args[args.len() - 1], "/opt/bin/worker serve 'my data'");
    }

    #[test]
    fn blank_email_adds_no_mail_flags() {
        let mut req = JobRequest::new(1, "/opt/bin/worker");
        req.notify_email = Some(String::new());
        let args = Slurm::submit_args(&req);
        assert!(!args.contains(&"--mail-user".to_string()));
    }

    #[cfg(unix)]
    mod fake_clients {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use std::path::Path;

        fn script(dir: &Path, name: &str, body: &str) -> String {
            let path = dir.join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path.display().to_string()
        }

        #[tokio::test]
        async fn submit_and_resolve() {
            let dir = tempfile::tempdir().unwrap();
            let sbatch = script(dir.path(), "sbatch", "echo '4242;main'");
            let squeue = script(dir.path(), "squeue", "echo 'RUNNING|node[07-09]'");

            let slurm = Slurm::with_binaries(sbatch, squeue);
            let handle = slurm.submit(&JobRequest::new(1, "/bin/worker")).await.unwrap();
            assert_eq!(handle.as_str(), "4242");
            assert_eq!(slurm.poll_state(&handle).await.unwrap(), JobState::Running);
            assert_eq!(slurm.resolve_host(&handle).await.unwrap(), "node07");
        }

        #[tokio::test]
        async fn purged_job_is_done() {
            let dir = tempfile::tempdir().unwrap();
            let squeue = script(
                dir.path(),
                "squeue",
                "echo 'slurm_load_jobs error: Invalid job id specified' >&2; exit 1",
            );
            let slurm = Slurm::with_binaries("sbatch", squeue);
            let handle = JobHandle::new("99");

            assert_eq!(slurm.poll_state(&handle).await.unwrap(), JobState::Done);
            assert!(matches!(
                slurm.resolve_host(&handle).await,
                Err(SchedulerError::HostResolution { .. })
            ));
        }
    }
}
