//! Client for a worker's `PeerService`, used by the launcher.
//!
//! Every call opens a fresh channel and is bounded end to end (connect plus
//! request) by the configured timeout, so an unreachable host costs at most
//! one timeout.

use std::future::Future;
use std::time::Duration;

use gridboot_core::{Membership, WorkerEndpoint};
use tonic::transport::{Channel, Endpoint};
use tracing::debug;

use crate::error::ClientError;
use crate::proto;
use crate::proto::peer_service_client::PeerServiceClient;

#[derive(Debug, Clone)]
pub struct PeerClient {
    endpoint: WorkerEndpoint,
    timeout: Duration,
}

impl PeerClient {
    /// Create a client for one worker. Every call is bounded by `timeout`.
    pub fn new(endpoint: WorkerEndpoint, timeout: Duration) -> Self {
        Self { endpoint, timeout }
    }

    pub fn endpoint(&self) -> &WorkerEndpoint {
        &self.endpoint
    }

    /// Send the complete membership. Returns the count the worker stored.
    pub async fn set_peers(&self, membership: &Membership) -> Result<u32, ClientError> {
        let request = proto::SetPeersRequest {
            hostnames: membership.hosts().to_vec(),
        };
        self.bounded(async {
            let mut client = self.connect().await?;
            let response = client
                .set_peers(request)
                .await
                .map_err(|status| self.call_error(status))?;
            Ok(response.into_inner().accepted)
        })
        .await
    }

    pub async fn ping(&self) -> Result<proto::PingResponse, ClientError> {
        self.bounded(async {
            let mut client = self.connect().await?;
            let response = client
                .ping(proto::PingRequest {})
                .await
                .map_err(|status| self.call_error(status))?;
            Ok(response.into_inner())
        })
        .await
    }

    async fn connect(&self) -> Result<PeerServiceClient<Channel>, ClientError> {
        let uri = self.endpoint.uri();
        let endpoint = Endpoint::from_shared(uri)
            .map_err(|e| ClientError::InvalidEndpoint {
                endpoint: self.endpoint.address(),
                reason: error_chain(&e),
            })?
            .connect_timeout(self.timeout)
            .timeout(self.timeout);

        let channel = endpoint
            .connect()
            .await
            .map_err(|e| ClientError::Connect {
                endpoint: self.endpoint.address(),
                reason: error_chain(&e),
            })?;

        debug!(endpoint = %self.endpoint, "connected to worker");
        Ok(PeerServiceClient::new(channel))
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        tokio::time::timeout(self.timeout, call)
            .await
            .unwrap_or_else(|_| {
                Err(ClientError::Timeout {
                    endpoint: self.endpoint.address(),
                })
            })
    }

    fn call_error(&self, status: tonic::Status) -> ClientError {
        ClientError::Call {
            endpoint: self.endpoint.address(),
            status,
        }
    }
}

/// Flatten an error and its sources into one line. tonic's transport error
/// only says "transport error" at the top level.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(e) = source {
        out.push_str(": ");
        out.push_str(&e.to_string());
        source = e.source();
    }
    out
}
