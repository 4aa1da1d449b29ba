//! Authoritative side: change detection and broadcast.

use crate::link::{PeerId, PeerLink};
use crate::lock;
use crate::message::{SyncMessage, content_hash};
use crate::phase::SyncPhase;

use skillcap_core::ResolutionState;
use skillcap_core::version::{PROTOCOL_VERSION, is_compatible};
use skillcap_store::{ConfigStore, render_document};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, trace, warn};

/// Result of a change-checked broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastOutcome {
    /// Content hash matched the last broadcast; nothing sent
    Unchanged,
    /// Content changed and was sent; `delivered` peers accepted it
    Sent { peers: usize, delivered: usize },
}

pub struct Authority {
    state: Arc<ResolutionState>,
    store: Arc<ConfigStore>,
    link: Arc<dyn PeerLink>,
    peers: Mutex<BTreeSet<PeerId>>,
    phase: Mutex<SyncPhase>,
}

impl Authority {
    pub fn new(state: Arc<ResolutionState>, store: Arc<ConfigStore>, link: Arc<dyn PeerLink>) -> Self {
        Self { state, store, link, peers: Mutex::new(BTreeSet::new()), phase: Mutex::new(SyncPhase::Unsynced) }
    }

    pub fn phase(&self) -> SyncPhase {
        *lock(&self.phase)
    }

    pub fn peers(&self) -> Vec<PeerId> {
        lock(&self.peers).iter().copied().collect()
    }

    /// Text to broadcast: the skill file, or the published map when unreadable.
    pub fn current_content(&self) -> String {
        if let Some(text) = self.store.read_text() {
            return text;
        }
        match render_document(&self.state.entries()) {
            Ok(text) => text,
            Err(e) => {
                warn!("cannot render published skill config: {}", e);
                String::new()
            }
        }
    }

    /// Send the current content to every peer if its hash changed.
    pub fn broadcast_if_changed(&self) -> BroadcastOutcome {
        let content = self.current_content();
        let hash = content_hash(&content);
        if !self.state.record_broadcast_hash(&hash) {
            trace!(hash = %hash, "skill config unchanged, not broadcasting");
            return BroadcastOutcome::Unchanged;
        }

        let message = SyncMessage::new(content);
        let peers = self.peers();
        let delivered = peers.iter().filter(|peer| self.deliver(**peer, &message)).count();
        self.mark_broadcast();

        info!(hash = %hash, peers = peers.len(), delivered, "broadcast skill config");
        BroadcastOutcome::Sent { peers: peers.len(), delivered }
    }

    /// Send the current content to one peer without the hash check.
    pub fn broadcast_unconditional(&self, peer: PeerId) -> bool {
        let message = SyncMessage::new(self.current_content());
        let delivered = self.deliver(peer, &message);
        if delivered {
            self.mark_broadcast();
        }
        delivered
    }

    /// Register a newly active peer that announced `protocol_version` and bring it up to date.
    ///
    /// A peer with an incompatible version is refused: it is never registered,
    /// receives nothing and is dropped from the link.
    pub fn on_peer_active(&self, peer: PeerId, protocol_version: i32) -> bool {
        if !is_compatible(protocol_version) {
            lock(&self.peers).remove(&peer);
            warn!(
                peer = %peer,
                expected = PROTOCOL_VERSION,
                received = protocol_version,
                "refusing peer with incompatible protocol version"
            );
            self.link.drop_peer(peer);
            return false;
        }

        lock(&self.peers).insert(peer);
        debug!(peer = %peer, "peer active");
        self.broadcast_unconditional(peer);
        self.broadcast_if_changed();
        true
    }

    pub fn on_peer_inactive(&self, peer: PeerId) -> bool {
        let removed = lock(&self.peers).remove(&peer);
        if removed {
            debug!(peer = %peer, "peer inactive");
        }
        removed
    }

    fn deliver(&self, peer: PeerId, message: &SyncMessage) -> bool {
        match self.link.send(peer, message) {
            Ok(()) => true,
            Err(e) => {
                warn!(peer = %peer, "failed to send skill config: {}", e);
                false
            }
        }
    }

    fn mark_broadcast(&self) {
        let mut phase = lock(&self.phase);
        if *phase == SyncPhase::Unsynced {
            *phase = SyncPhase::BroadcastPending;
        }
    }
}

impl std::fmt::Debug for Authority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authority")
            .field("store", &self.store)
            .field("peers", &self.peers())
            .field("phase", &self.phase())
            .finish()
    }
}
