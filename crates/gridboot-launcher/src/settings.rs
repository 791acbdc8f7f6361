//! Resolved launch settings.

use std::time::Duration;

use gridboot_core::{ConfigError, DEFAULT_PEER_PORT, LaunchConfig, ReadinessMode};

/// How the launcher decides a worker is listening before broadcasting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Ping each worker until it answers or `timeout` elapses.
    Handshake { timeout: Duration, interval: Duration },
    /// Sleep once, then treat every resolved worker as ready.
    Delay(Duration),
}

/// Timing and policy for one launcher, built from `[launch]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSettings {
    pub peer_port: u16,
    pub poll_interval: Duration,
    pub poll_error_limit: u32,
    pub running_timeout: Option<Duration>,
    pub readiness: Readiness,
    pub rpc_timeout: Duration,
    pub min_workers: Option<usize>,
}

impl LaunchSettings {
    /// Validate `[launch]` and convert it to settings.
    pub fn from_config(config: &LaunchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let readiness = match config.readiness {
            ReadinessMode::Handshake => Readiness::Handshake {
                timeout: config.readiness_timeout(),
                interval: config.readiness_interval(),
            },
            ReadinessMode::Delay => Readiness::Delay(config.settle_delay()),
        };
        Ok(Self {
            peer_port: config.peer_port,
            poll_interval: config.poll_interval(),
            poll_error_limit: config.poll_error_limit,
            running_timeout: config.running_timeout(),
            readiness,
            rpc_timeout: config.rpc_timeout(),
            min_workers: config.min_workers,
        })
    }

    /// Set the port workers' bootstrap servers listen on.
    pub fn with_peer_port(mut self, port: u16) -> Self {
        self.peer_port = port;
        self
    }

    /// Set how the launcher waits before broadcasting.
    pub fn with_readiness(mut self, readiness: Readiness) -> Self {
        self.readiness = readiness;
        self
    }

    /// Abort before broadcasting when fewer than `min` workers start.
    pub fn with_min_workers(mut self, min: usize) -> Self {
        self.min_workers = Some(min);
        self
    }

    /// Give up on a job that is not running after `timeout`.
    pub fn with_running_timeout(mut self, timeout: Duration) -> Self {
        self.running_timeout = Some(timeout);
        self
    }
}

impl Default for LaunchSettings {
    fn default() -> Self {
        Self {
            peer_port: DEFAULT_PEER_PORT,
            poll_interval: Duration::from_millis(500),
            poll_error_limit: 5,
            running_timeout: None,
            readiness: Readiness::Handshake {
                timeout: Duration::from_secs(30),
                interval: Duration::from_millis(250),
            },
            rpc_timeout: Duration::from_secs(5),
            min_workers: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_default_config() {
        let from_config = LaunchSettings::from_config(&LaunchConfig::default()).unwrap();
        assert_eq!(from_config, LaunchSettings::default());
    }

    #[test]
    fn delay_mode_uses_settle_delay() {
        let config = LaunchConfig {
            readiness: ReadinessMode::Delay,
            settle_delay_secs: 10,
            ..LaunchConfig::default()
        };
        let settings = LaunchSettings::from_config(&config).unwrap();
        assert_eq!(settings.readiness, Readiness::Delay(Duration::from_secs(10)));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = LaunchConfig {
            rpc_timeout_secs: 0,
            ..LaunchConfig::default()
        };
        assert!(matches!(
            LaunchSettings::from_config(&config),
            Err(ConfigError::Invalid(_))
        ));
    }
}
