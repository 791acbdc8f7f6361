//! gridboot: bootstrap a peer group of workers on a batch grid.
//!
//! # Usage
//!
//! ```text
//! gridboot launch --config gridboot.toml --workers 8 -- serve --data /scratch
//! gridboot worker --peers-file /tmp/peers -- /opt/worker/bin/worker serve
//! gridboot config > gridboot.toml
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use gridboot_core::{DEFAULT_PEER_PORT, GridbootConfig, SchedulerKind};

mod launch_mode;
mod worker_mode;

#[derive(Parser)]
#[command(
    name = "gridboot",
    about = "Launch workers on a batch grid and bootstrap their peer membership",
    version,
    propagate_version = true
)]
struct Cli {
    /// Log at debug level for every target.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit the workers, collect their hosts, and broadcast the membership.
    Launch(LaunchArgs),
    /// Run on a compute host: serve the bootstrap endpoint, then the worker
    /// command.
    Worker(WorkerArgs),
    /// Print a starter gridboot.toml.
    Config,
}

#[derive(Args, Debug)]
pub struct LaunchArgs {
    /// Config file. Defaults to ./gridboot.toml when present.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of workers to start.
    #[arg(short = 'n', long)]
    pub workers: Option<usize>,

    /// Worker executable on the compute hosts.
    #[arg(long)]
    pub remote_command: Option<String>,

    /// Native scheduler options, forwarded verbatim (e.g. "-pe batch 16").
    #[arg(long)]
    pub native_spec: Option<String>,

    /// Address notified by the scheduler on job events.
    #[arg(long)]
    pub email: Option<String>,

    /// Batch system: grid-engine or slurm.
    #[arg(long)]
    pub scheduler: Option<SchedulerKind>,

    /// Port the workers' bootstrap servers listen on.
    #[arg(long)]
    pub peer_port: Option<u16>,

    /// Abort before broadcasting if fewer workers start.
    #[arg(long)]
    pub min_workers: Option<usize>,

    /// Write the run report as JSON to this file.
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Arguments passed to every worker.
    #[arg(last = true)]
    pub args: Vec<String>,
}

#[derive(Args, Debug)]
pub struct WorkerArgs {
    /// Interface for the bootstrap server.
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub listen: IpAddr,

    /// Bootstrap server port.
    #[arg(long, default_value_t = DEFAULT_PEER_PORT)]
    pub port: u16,

    /// Keep this file updated with the received membership, one host per line.
    #[arg(long)]
    pub peers_file: Option<PathBuf>,

    /// Data-serving command to run once the bootstrap server is up.
    #[arg(last = true)]
    pub command: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,gridboot=debug"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Command::Launch(args) => {
            launch_mode::run_launch(args).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Worker(args) => worker_mode::run_worker(args).await.map(ExitCode::from),
        Command::Config => {
            print!("{}", GridbootConfig::scaffold().to_toml_string()?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
