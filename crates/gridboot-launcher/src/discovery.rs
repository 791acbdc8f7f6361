//! Per-job discovery: poll one handle until it runs, then resolve its host.

use std::time::Duration;

use gridboot_core::{JobHandle, JobState};
use gridboot_scheduler::BatchScheduler;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::error::SlotFailure;

/// Polling policy shared by every discovery task of a run.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Consecutive query errors that give up the job.
    pub error_limit: u32,
    pub running_timeout: Option<Duration>,
}

/// Poll `handle` until it is `Running`, then return its host.
///
/// Ends in a [`SlotFailure`] when the job finishes or fails without running,
/// when `error_limit` state queries in a row fail, or when `running_timeout`
/// passes first.
pub async fn discover_host<S: BatchScheduler>(
    scheduler: &S,
    handle: &JobHandle,
    policy: PollPolicy,
) -> Result<String, SlotFailure> {
    let started = Instant::now();
    let mut errors = 0u32;

    loop {
        match scheduler.poll_state(handle).await {
            Ok(JobState::Running) => {
                debug!(%handle, "job running, resolving host");
                return scheduler.resolve_host(handle).await.map_err(|e| {
                    SlotFailure::HostResolution {
                        reason: e.to_string(),
                    }
                });
            }
            Ok(state) if state.is_terminal() => {
                return Err(SlotFailure::JobEnded { state });
            }
            Ok(state) => {
                errors = 0;
                trace!(%handle, %state, "job not running yet");
            }
            Err(e) => {
                errors += 1;
                warn!(%handle, attempt = errors, error = %e, "job state query failed");
                if errors >= policy.error_limit {
                    return Err(SlotFailure::PollError {
                        attempts: errors,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if let Some(limit) = policy.running_timeout {
            let waited = started.elapsed();
            if waited >= limit {
                return Err(SlotFailure::PollTimeout {
                    waited_secs: waited.as_secs(),
                });
            }
        }

        tokio::time::sleep(policy.interval).await;
    }
}
