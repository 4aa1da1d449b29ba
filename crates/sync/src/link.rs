use crate::error::{Error, Result};
use crate::lock;
use crate::message::SyncMessage;

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

/// Identifies one dependent on a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(u64);

impl PeerId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// Message transport from the authority to dependents.
///
/// Delivery is best effort. Implementations must not block.
pub trait PeerLink: Send + Sync {
    fn send(&self, peer: PeerId, message: &SyncMessage) -> Result<()>;

    /// Close the connection to a refused peer. Links without connections ignore it.
    fn drop_peer(&self, _peer: PeerId) {}
}

/// In-process link delivering encoded frames over unbounded channels.
#[derive(Debug, Default)]
pub struct ChannelLink {
    next_id: AtomicU64,
    peers: Mutex<HashMap<PeerId, mpsc::UnboundedSender<Vec<u8>>>>,
}

impl ChannelLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new dependent; frames for it arrive on the returned receiver.
    pub fn connect(&self) -> (PeerId, mpsc::UnboundedReceiver<Vec<u8>>) {
        let peer = PeerId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.peers).insert(peer, tx);
        (peer, rx)
    }

    /// Drop the sending half so the peer's receiver closes.
    pub fn disconnect(&self, peer: PeerId) -> bool {
        lock(&self.peers).remove(&peer).is_some()
    }

    pub fn peer_count(&self) -> usize {
        lock(&self.peers).len()
    }
}

impl PeerLink for ChannelLink {
    fn send(&self, peer: PeerId, message: &SyncMessage) -> Result<()> {
        let frame = message.encode()?;
        let peers = lock(&self.peers);
        let tx = peers.get(&peer).ok_or(Error::UnknownPeer(peer))?;
        tx.send(frame).map_err(|_| Error::PeerDisconnected(peer))
    }

    fn drop_peer(&self, peer: PeerId) {
        self.disconnect(peer);
    }
}
