pub mod config;
pub mod types;

pub use config::{
    ConfigError, GridbootConfig, JobConfig, LaunchConfig, ReadinessMode, SchedulerConfig,
    SchedulerKind,
};
pub use types::*;
