//! Peer gRPC server, worker side.
//!
//! Implements the `PeerService` interface over a [`PeerRegistry`]. The
//! launcher calls `SetPeers` once per bootstrap run and `Ping` while waiting
//! for the worker to come up.

use gridboot_core::Membership;
use tonic::{Request, Response, Status};
use tracing::{debug, info};

use crate::proto;
use crate::proto::peer_service_server::PeerService;
use crate::registry::PeerRegistry;

/// gRPC implementation of the peer service.
pub struct PeerServer {
    registry: PeerRegistry,
}

impl PeerServer {
    /// Create a new peer service backed by `registry`.
    pub fn new(registry: PeerRegistry) -> Self {
        Self { registry }
    }

    /// Get the tonic service for mounting on a gRPC server.
    pub fn into_service(self) -> proto::peer_service_server::PeerServiceServer<Self> {
        proto::peer_service_server::PeerServiceServer::new(self)
    }
}

#[tonic::async_trait]
impl PeerService for PeerServer {
    async fn set_peers(
        &self,
        request: Request<proto::SetPeersRequest>,
    ) -> Result<Response<proto::SetPeersResponse>, Status> {
        let remote = request.remote_addr();
        let hostnames = request.into_inner().hostnames;

        info!(?remote, peers = ?hostnames, "set peers");
        let accepted = self.registry.set_peers(Membership::from(hostnames));

        Ok(Response::new(proto::SetPeersResponse {
            accepted: accepted as u32,
        }))
    }

    async fn ping(
        &self,
        request: Request<proto::PingRequest>,
    ) -> Result<Response<proto::PingResponse>, Status> {
        debug!(remote = ?request.remote_addr(), "ping");

        Ok(Response::new(proto::PingResponse {
            has_membership: self.registry.is_initialized(),
            member_count: self.registry.len() as u32,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_peers_updates_registry() {
        let registry = PeerRegistry::new();
        let server = PeerServer::new(registry.clone());

        let resp = server
            .set_peers(Request::new(proto::SetPeersRequest {
                hostnames: vec!["a".to_string(), "c".to_string()],
            }))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(resp.accepted, 2);
        assert_eq!(
            registry.current().unwrap().hosts(),
            &["a".to_string(), "c".to_string()]
        );
    }

    #[tokio::test]
    async fn ping_reports_registry_state() {
        let registry = PeerRegistry::new();
        let server = PeerServer::new(registry.clone());

        let before = server
            .ping(Request::new(proto::PingRequest {}))
            .await
            .unwrap()
            .into_inner();
        assert!(!before.has_membership);
        assert_eq!(before.member_count, 0);

        registry.set_peers(Membership::from(vec!["a".to_string()]));
        let after = server
            .ping(Request::new(proto::PingRequest {}))
            .await
            .unwrap()
            .into_inner();
        assert!(after.has_membership);
        assert_eq!(after.member_count, 1);
    }
}
