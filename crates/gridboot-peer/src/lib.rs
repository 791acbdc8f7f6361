//! gridboot-peer: the worker bootstrap service and its client.
//!
//! Each worker runs a small gRPC server on the well-known peer port. The
//! launcher pushes the full cluster membership to it once every worker's
//! host is known.
//!
//! # Architecture
//!
//! ```text
//! Launcher
//!   └── PeerClient (gRPC)
//!       ├── Ping() → readiness probe
//!       └── SetPeers() → full membership, replace semantics
//!
//! Worker
//!   └── BootstrapServer
//!       ├── PeerServer → PeerRegistry (watch channel)
//!       └── peers file writer (optional, for external readers)
//! ```

pub mod bootstrap;
pub mod client;
pub mod error;
pub mod peers_file;
pub mod registry;
pub mod server;

/// Generated protobuf types and gRPC service stubs.
pub mod proto {
    tonic::include_proto!("gridboot.peer");
}

pub use bootstrap::{BootstrapServer, RunningServer, default_listen_addr};
pub use client::PeerClient;
pub use error::{ClientError, PeerError, PeerResult};
pub use peers_file::{PEERS_FILE_ENV, read_peers_file, spawn_peers_file_writer, write_peers_file};
pub use registry::{PeerRegistry, RegistryState};
pub use server::PeerServer;
