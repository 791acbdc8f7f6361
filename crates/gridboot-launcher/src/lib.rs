//! gridboot-launcher: bring up N workers and tell each who its peers are.
//!
//! # Sequence
//!
//! ```text
//! Launcher::run
//!   ├── pre-flight     reject N < 1, empty command, min_workers > N
//!   ├── submit         N sequential BatchScheduler::submit calls
//!   ├── discover       one task per job: poll until Running, resolve host
//!   ├── collect        N outcomes over one mpsc channel, dedupe hosts
//!   ├── quorum         optional min_workers check
//!   ├── readiness      Ping handshake, or a fixed settle delay
//!   └── broadcast      SetPeers to every ready worker in parallel
//! ```
//!
//! Failures of individual jobs or hosts shrink the result instead of
//! aborting it; everything is recorded in the returned [`LaunchReport`].

pub mod broadcast;
pub mod discovery;
pub mod error;
pub mod launcher;
pub mod readiness;
pub mod report;
pub mod settings;
pub mod transport;

pub use error::{BroadcastError, LaunchError, LaunchResult, SlotFailure};
pub use launcher::Launcher;
pub use report::{BroadcastReport, HostFailure, LaunchReport, SlotOutcome, SlotReport};
pub use settings::{LaunchSettings, Readiness};
pub use transport::{GrpcTransport, PeerTransport};
