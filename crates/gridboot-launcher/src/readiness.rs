//! Readiness handshake: wait until each worker's bootstrap server answers.

use std::sync::Arc;
use std::time::Duration;

use gridboot_core::WorkerEndpoint;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::broadcast::per_host;
use crate::error::BroadcastError;
use crate::transport::PeerTransport;

/// Endpoints split by whether they answered in time.
#[derive(Debug, Default)]
pub struct ReadinessOutcome {
    pub ready: Vec<WorkerEndpoint>,
    pub not_ready: Vec<(WorkerEndpoint, BroadcastError)>,
}

/// Ping every endpoint concurrently until it answers or `timeout` passes.
pub async fn await_ready<T: PeerTransport>(
    transport: &Arc<T>,
    endpoints: &[WorkerEndpoint],
    timeout: Duration,
    interval: Duration,
) -> ReadinessOutcome {
    info!(
        hosts = endpoints.len(),
        timeout_ms = timeout.as_millis() as u64,
        "waiting for workers to accept connections"
    );

    let results = per_host(transport, endpoints, |transport, endpoint| async move {
        wait_ready(transport.as_ref(), &endpoint, timeout, interval).await
    })
    .await;

    let mut outcome = ReadinessOutcome::default();
    for (endpoint, result) in endpoints.iter().zip(results) {
        match result {
            Ok(waited) => {
                debug!(%endpoint, waited_ms = waited.as_millis() as u64, "worker ready");
                outcome.ready.push(endpoint.clone());
            }
            Err(e) => {
                warn!(%endpoint, error = %e, "worker not ready, skipping broadcast");
                outcome.not_ready.push((endpoint.clone(), e));
            }
        }
    }
    outcome
}

async fn wait_ready<T: PeerTransport>(
    transport: &T,
    endpoint: &WorkerEndpoint,
    timeout: Duration,
    interval: Duration,
) -> Result<Duration, BroadcastError> {
    let started = Instant::now();
    let deadline = started + timeout;

    loop {
        let last_error = match tokio::time::timeout_at(deadline, transport.ping(endpoint)).await {
            Ok(Ok(())) => return Ok(started.elapsed()),
            Ok(Err(e)) => e.to_string(),
            Err(_) => "ping timed out".to_string(),
        };

        if Instant::now() + interval >= deadline {
            return Err(BroadcastError::NotReady {
                waited_ms: started.elapsed().as_millis() as u64,
                last_error,
            });
        }
        trace!(%endpoint, error = %last_error, "worker not answering yet");
        tokio::time::sleep(interval).await;
    }
}
