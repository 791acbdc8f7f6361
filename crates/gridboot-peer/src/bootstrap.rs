//! Worker bootstrap server.
//!
//! Binds the well-known peer port and serves `PeerService` in the
//! background. [`BootstrapServer::start`] only returns once the socket is
//! bound, so the worker is accepting membership updates before it hands
//! control to its data-serving subsystem.

use std::net::{Ipv4Addr, SocketAddr};

use gridboot_core::DEFAULT_PEER_PORT;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tracing::{error, info};

use crate::error::{PeerError, PeerResult};
use crate::registry::PeerRegistry;
use crate::server::PeerServer;

/// `0.0.0.0:8001`.
pub fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PEER_PORT))
}

pub struct BootstrapServer {
    listen_addr: SocketAddr,
    registry: PeerRegistry,
}

impl BootstrapServer {
    /// Create a server that records memberships into `registry`.
    pub fn new(listen_addr: SocketAddr, registry: PeerRegistry) -> Self {
        Self {
            listen_addr,
            registry,
        }
    }

    /// Bind the listener and start serving in a background task.
    pub async fn start(self) -> PeerResult<RunningServer> {
        let listener = TcpListener::bind(self.listen_addr)
            .await
            .map_err(|source| PeerError::Bind {
                addr: self.listen_addr.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let service = PeerServer::new(self.registry.clone()).into_service();

        let handle = tokio::spawn(async move {
            let result = Server::builder()
                .add_service(service)
                .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
                    let _ = shutdown_rx.changed().await;
                })
                .await;
            if let Err(e) = &result {
                error!(error = %e, "bootstrap server error");
            }
            result
        });

        info!(%local_addr, "bootstrap server listening");

        Ok(RunningServer {
            local_addr,
            registry: self.registry,
            shutdown_tx,
            handle,
        })
    }
}

/// Handle to a started bootstrap server.
pub struct RunningServer {
    local_addr: SocketAddr,
    registry: PeerRegistry,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<Result<(), tonic::transport::Error>>,
}

impl RunningServer {
    /// Address actually bound (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    /// Stop accepting connections and wait for the server task to finish.
    pub async fn shutdown(self) -> PeerResult<()> {
        let _ = self.shutdown_tx.send(true);
        match self.handle.await {
            Ok(result) => {
                result?;
                info!(addr = %self.local_addr, "bootstrap server stopped");
                Ok(())
            }
            Err(e) => Err(PeerError::Task(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn binds_before_returning() {
        let server = BootstrapServer::new("127.0.0.1:0".parse().unwrap(), PeerRegistry::new())
            .start()
            .await
            .unwrap();

        let addr = server.local_addr();
        assert_ne!(addr.port(), 0);
        assert!(tokio::net::TcpStream::connect(addr).await.is_ok());

        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn port_in_use_is_bind_error() {
        let first = BootstrapServer::new("127.0.0.1:0".parse().unwrap(), PeerRegistry::new())
            .start()
            .await
            .unwrap();

        let err = BootstrapServer::new(first.local_addr(), PeerRegistry::new())
            .start()
            .await
            .err()
            .unwrap();
        assert!(matches!(err, PeerError::Bind { .. }));

        first.shutdown().await.unwrap();
    }

    #[test]
    fn default_listen_is_well_known_port() {
        assert_eq!(default_listen_addr().to_string(), "0.0.0.0:8001");
    }
}
