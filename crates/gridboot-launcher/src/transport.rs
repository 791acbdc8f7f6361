//! How the launcher reaches workers.
//!
//! [`PeerTransport`] is the seam between the bootstrap sequence and the
//! network. Production uses [`GrpcTransport`]; tests substitute recorders.

use std::future::Future;
use std::time::Duration;

use gridboot_core::{Membership, WorkerEndpoint};
use gridboot_peer::PeerClient;

use crate::error::BroadcastError;

pub trait PeerTransport: Send + Sync + 'static {
    /// One readiness probe. `Ok` means the worker's server answered.
    fn ping(
        &self,
        endpoint: &WorkerEndpoint,
    ) -> impl Future<Output = Result<(), BroadcastError>> + Send;

    /// Send the full membership. Returns the count the worker accepted.
    fn deliver(
        &self,
        endpoint: &WorkerEndpoint,
        membership: &Membership,
    ) -> impl Future<Output = Result<u32, BroadcastError>> + Send;
}

/// `PeerService` over gRPC, one short-lived channel per call.
#[derive(Debug, Clone)]
pub struct GrpcTransport {
    rpc_timeout: Duration,
}

impl GrpcTransport {
    /// Create a transport whose calls are bounded by `rpc_timeout`.
    pub fn new(rpc_timeout: Duration) -> Self {
        Self { rpc_timeout }
    }

    fn client(&self, endpoint: &WorkerEndpoint) -> PeerClient {
        PeerClient::new(endpoint.clone(), self.rpc_timeout)
    }
}

impl PeerTransport for GrpcTransport {
    async fn ping(&self, endpoint: &WorkerEndpoint) -> Result<(), BroadcastError> {
        self.client(endpoint).ping().await?;
        Ok(())
    }

    async fn deliver(
        &self,
        endpoint: &WorkerEndpoint,
        membership: &Membership,
    ) -> Result<u32, BroadcastError> {
        Ok(self.client(endpoint).set_peers(membership).await?)
    }
}
