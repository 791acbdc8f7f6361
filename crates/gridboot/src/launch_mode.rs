//! Launch mode: run one bootstrap sequence from the submit host.

use std::path::{Path, PathBuf};

use anyhow::Context;
use gridboot_core::GridbootConfig;
use gridboot_launcher::{LaunchSettings, Launcher};
use gridboot_scheduler::Backend;
use tracing::{info, warn};

use crate::LaunchArgs;

const DEFAULT_CONFIG_FILE: &str = "gridboot.toml";

pub async fn run_launch(args: LaunchArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args);

    let request = config.job_request()?;
    let settings = LaunchSettings::from_config(&config.launch)?;
    let scheduler = Backend::from_config(&config.scheduler);

    let launcher = Launcher::new(scheduler, settings);
    let report = launcher.run(&request).await?;

    for slot in report.failed_slots() {
        warn!(slot = slot.slot, handle = ?slot.handle, outcome = ?slot.outcome, "worker missing from membership");
    }
    for failure in &report.broadcast.failed {
        warn!(host = %failure.host, error = %failure.error, "worker did not receive membership");
    }
    info!(
        requested = report.requested,
        started = report.started(),
        delivered = report.broadcast.delivered.len(),
        membership = %report.membership,
        "launch complete"
    );

    if let Some(path) = &args.report {
        report
            .write_json(path)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "report written");
    }
    Ok(())
}

/// Explicit path, else `./gridboot.toml` if it exists, else defaults.
fn load_config(path: Option<&Path>) -> anyhow::Result<GridbootConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default.exists() {
                return Ok(GridbootConfig::default());
            }
            default
        }
    };
    let config = GridbootConfig::from_file(&path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    info!(path = %path.display(), "config loaded");
    Ok(config)
}

fn apply_overrides(config: &mut GridbootConfig, args: &LaunchArgs) {
    if let Some(workers) = args.workers {
        config.job.workers = Some(workers);
    }
    if let Some(command) = &args.remote_command {
        config.job.remote_command = Some(command.clone());
    }
    if let Some(spec) = &args.native_spec {
        config.job.native_spec = spec.clone();
    }
    if let Some(email) = &args.email {
        config.job.email = Some(email.clone());
    }
    if !args.args.is_empty() {
        config.job.args = args.args.clone();
    }
    if let Some(kind) = args.scheduler {
        config.scheduler.kind = kind;
    }
    if let Some(port) = args.peer_port {
        config.launch.peer_port = port;
    }
    if let Some(min) = args.min_workers {
        config.launch.min_workers = Some(min);
    }
}
