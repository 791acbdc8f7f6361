//! Thin runner for scheduler command-line clients.

use std::process::{ExitStatus, Stdio};

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}

/// Captured result of one client invocation.
#[derive(Debug)]
pub struct CommandOutput {
    pub program: String,
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Turn a non-zero exit into [`CommandError::Failed`].
    pub fn into_success(self) -> Result<Self, CommandError> {
        if self.status.success() {
            return Ok(self);
        }
        let status = match self.status.code() {
            Some(code) => format!("exit code {code}"),
            None => "signal".to_string(),
        };
        Err(CommandError::Failed {
            program: self.program,
            status,
            stderr: self.stderr.trim().to_string(),
        })
    }
}

/// Run `program args...` to completion and capture its output.
///
/// The exit status is not checked here; callers decide whether a non-zero
/// exit is an error (e.g. `squeue` on a purged job).
pub async fn run(program: &str, args: &[String]) -> Result<CommandOutput, CommandError> {
    run_with_env(program, args, &[]).await
}

/// Like [`run`], with extra environment variables set for the child.
pub async fn run_with_env(
    program: &str,
    args: &[String],
    env: &[(&str, &str)],
) -> Result<CommandOutput, CommandError> {
    debug!(program, ?args, ?env, "running scheduler client");

    let output = Command::new(program)
        .args(args)
        .envs(env.iter().copied())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| CommandError::Spawn {
            program: program.to_string(),
            source,
        })?;

    Ok(CommandOutput {
        program: program.to_string(),
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Quote one argument for a POSIX shell.
pub fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./=:,+@%".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
