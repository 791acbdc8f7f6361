//! Mirror the registry into a file for out-of-process readers.
//!
//! The data-serving subsystem usually runs as a separate executable, so it
//! cannot read the in-memory registry. Every change is written as one
//! hostname per line to a temporary file that is then renamed over the
//! target, so readers never see a partial list.

use std::path::{Path, PathBuf};

use gridboot_core::Membership;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::PeerResult;
use crate::registry::PeerRegistry;

/// Environment variable a spawned worker command reads the file path from.
pub const PEERS_FILE_ENV: &str = "GRIDBOOT_PEERS_FILE";

pub async fn write_peers_file(path: &Path, membership: &Membership) -> PeerResult<()> {
    let mut content = membership.hosts().join("\n");
    if !content.is_empty() {
        content.push('\n');
    }

    let tmp = tmp_path(path);
    tokio::fs::write(&tmp, content).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Read a peers file back, ignoring blank lines.
pub async fn read_peers_file(path: &Path) -> PeerResult<Membership> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(Membership::from(
        content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>(),
    ))
}

/// Spawn a task that rewrites `path` on every membership change. Ends when
/// the registry is dropped.
pub fn spawn_peers_file_writer(registry: &PeerRegistry, path: PathBuf) -> JoinHandle<()> {
    let mut rx = registry.subscribe();
    tokio::spawn(async move {
        loop {
            let current = rx.borrow_and_update().clone();
            if let Some(membership) = current {
                match write_peers_file(&path, &membership).await {
                    Ok(()) => info!(path = %path.display(), peers = membership.len(), "peers file written"),
                    Err(e) => warn!(path = %path.display(), error = %e, "failed to write peers file"),
                }
            }
            if rx.changed().await.is_err() {
                break;
            }
        }
    })
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
