//! Parallel per-host calls: membership delivery and the fan-out helper the
//! readiness handshake shares.

use std::future::Future;
use std::sync::Arc;

use gridboot_core::{Membership, WorkerEndpoint};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::error::BroadcastError;
use crate::transport::PeerTransport;

/// Run `call` once per endpoint, all concurrently, and return the results in
/// endpoint order. A task that panics is reported as [`BroadcastError::TaskLost`].
pub(crate) async fn per_host<T, V, F, Fut>(
    transport: &Arc<T>,
    endpoints: &[WorkerEndpoint],
    call: F,
) -> Vec<Result<V, BroadcastError>>
where
    T: PeerTransport,
    V: Send + 'static,
    F: Fn(Arc<T>, WorkerEndpoint) -> Fut,
    Fut: Future<Output = Result<V, BroadcastError>> + Send + 'static,
{
    let mut tasks = JoinSet::new();
    for (index, endpoint) in endpoints.iter().enumerate() {
        let fut = call(Arc::clone(transport), endpoint.clone());
        tasks.spawn(async move { (index, fut.await) });
    }

    let mut results: Vec<Option<Result<V, BroadcastError>>> =
        endpoints.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => results[index] = Some(result),
            Err(e) => error!(error = %e, "per-host task failed"),
        }
    }

    results
        .into_iter()
        .map(|r| r.unwrap_or(Err(BroadcastError::TaskLost)))
        .collect()
}

/// Send `membership` to every target in parallel. Each call is bounded by
/// the transport's own timeout; a failure on one host never affects another
/// and is not retried.
pub async fn broadcast_membership<T: PeerTransport>(
    transport: &Arc<T>,
    targets: &[WorkerEndpoint],
    membership: Arc<Membership>,
) -> Vec<Result<u32, BroadcastError>> {
    let results = per_host(transport, targets, |transport, endpoint| {
        let membership = Arc::clone(&membership);
        async move { transport.deliver(&endpoint, &membership).await }
    })
    .await;

    for (endpoint, result) in targets.iter().zip(&results) {
        match result {
            Ok(accepted) => info!(%endpoint, accepted, "membership delivered"),
            Err(e) => warn!(%endpoint, error = %e, "membership delivery failed"),
        }
    }
    results
}
