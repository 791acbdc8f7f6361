//! Worker mode: runs inside each scheduler job on a compute host.
//!
//! 1. Binds the bootstrap server on the peer port
//! 2. Optionally mirrors the membership into `--peers-file`
//! 3. Runs the data-serving command, or waits for Ctrl-C when none is given
//!
//! Membership updates are accepted for as long as the worker runs.

use std::net::SocketAddr;
use std::process::ExitStatus;

use anyhow::Context;
use gridboot_peer::{BootstrapServer, PEERS_FILE_ENV, PeerRegistry, spawn_peers_file_writer};
use tokio::process::Command;
use tracing::{info, warn};

use crate::WorkerArgs;

/// Returns the process exit code: the worker command's, or 0 when serving
/// without one.
pub async fn run_worker(args: WorkerArgs) -> anyhow::Result<u8> {
    let listen = SocketAddr::new(args.listen, args.port);
    let registry = PeerRegistry::new();

    let server = BootstrapServer::new(listen, registry.clone()).start().await?;
    let writer = args
        .peers_file
        .clone()
        .map(|path| spawn_peers_file_writer(&registry, path));

    let code = match args.command.split_first() {
        None => {
            info!("no worker command given, serving until interrupted");
            tokio::signal::ctrl_c()
                .await
                .context("failed to install Ctrl-C handler")?;
            info!("shutdown signal received");
            0
        }
        Some((program, rest)) => {
            let mut command = Command::new(program);
            command.args(rest).kill_on_drop(true);
            if let Some(path) = &args.peers_file {
                command.env(PEERS_FILE_ENV, path);
            }

            let mut child = command
                .spawn()
                .with_context(|| format!("failed to start worker command {program}"))?;
            info!(pid = ?child.id(), %program, "worker command started");

            let status = tokio::select! {
                status = child.wait() => Some(status?),
                _ = tokio::signal::ctrl_c() => None,
            };
            match status {
                Some(status) => {
                    info!(%status, "worker command exited");
                    exit_code(status)
                }
                None => {
                    info!("shutdown signal received, stopping worker command");
                    child.kill().await?;
                    130
                }
            }
        }
    };

    if let Some(writer) = writer {
        writer.abort();
    }
    if let Err(e) = server.shutdown().await {
        warn!(error = %e, "bootstrap server did not stop cleanly");
    }
    Ok(code)
}

/// Pass the child's exit code through. Death by signal maps to 1.
fn exit_code(status: ExitStatus) -> u8 {
    status
        .code()
        .and_then(|code| u8::try_from(code).ok())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn exit_code_passes_through() {
        use std::os::unix::process::ExitStatusExt;

        assert_eq!(exit_code(ExitStatus::from_raw(0)), 0);
        assert_eq!(exit_code(ExitStatus::from_raw(3 << 8)), 3);
        // Killed by SIGKILL.
        assert_eq!(exit_code(ExitStatus::from_raw(9)), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn child_sees_peers_file_and_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let peers = dir.path().join("peers");
        let marker = dir.path().join("env");

        let args = WorkerArgs {
            listen: "127.0.0.1".parse().unwrap(),
            port: 0,
            peers_file: Some(peers.clone()),
            command: vec![
                "sh".to_string(),
                "-c".to_string(),
                format!("echo \"${PEERS_FILE_ENV}\" > {}; exit 7", marker.display()),
            ],
        };

        let code = run_worker(args).await.unwrap();
        assert_eq!(code, 7);
        assert_eq!(
            std::fs::read_to_string(&marker).unwrap().trim(),
            peers.display().to_string()
        );
    }
}
