//! Peer registry: the worker's view of its peer group.
//!
//! Holds the most recently received [`Membership`]. The only writer is the
//! `SetPeers` handler; the data-serving side reads it lazily with
//! [`PeerRegistry::current`] or reacts to changes through
//! [`PeerRegistry::subscribe`].

use std::sync::Arc;

use gridboot_core::Membership;
use tokio::sync::watch;
use tracing::{debug, info};

/// Lifecycle of the registry on one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    /// No membership received yet.
    Uninitialized,
    HasMembership,
}

/// Process-wide membership store.
///
/// Cloning is cheap; all clones share the same state. Each update replaces
/// the stored value in one step, so readers see either the old or the new
/// list, never a mix.
#[derive(Debug, Clone)]
pub struct PeerRegistry {
    tx: Arc<watch::Sender<Option<Membership>>>,
}

impl Default for PeerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerRegistry {
    /// Create an empty, uninitialized registry.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Replace the stored membership. Never fails and performs no validation.
    ///
    /// Subscribers are only woken when the list actually changes, so
    /// repeating the same update is a no-op. Returns the number of hosts now
    /// stored.
    pub fn set_peers(&self, membership: Membership) -> usize {
        let count = membership.len();
        let changed = self.tx.send_if_modified(|current| {
            if current.as_ref() == Some(&membership) {
                false
            } else {
                *current = Some(membership);
                true
            }
        });

        if changed {
            info!(peers = count, "peer membership updated");
        } else {
            debug!(peers = count, "peer membership unchanged");
        }
        count
    }

    /// Snapshot of the stored membership, `None` while uninitialized.
    pub fn current(&self) -> Option<Membership> {
        self.tx.borrow().clone()
    }

    pub fn state(&self) -> RegistryState {
        if self.tx.borrow().is_some() {
            RegistryState::HasMembership
        } else {
            RegistryState::Uninitialized
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state() == RegistryState::HasMembership
    }

    /// Number of stored hosts (zero while uninitialized).
    pub fn len(&self) -> usize {
        self.tx.borrow().as_ref().map_or(0, Membership::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Change notifications. The receiver starts out having seen the current
    /// value.
    pub fn subscribe(&self) -> watch::Receiver<Option<Membership>> {
        self.tx.subscribe()
    }

    /// Wait until a membership has been received and return it.
    pub async fn wait_for_membership(&self) -> Membership {
        let mut rx = self.subscribe();
        match rx.wait_for(|m| m.is_some()).await {
            Ok(m) => (*m).clone().unwrap_or_default(),
            // The sender is owned by `self`, so the channel stays open.
            Err(_) => Membership::default(),
        }
    }
}
