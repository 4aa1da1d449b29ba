//! Error types for the sync protocol

use crate::link::PeerId;
use thiserror::Error;

/// Result type for sync operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Frame could not be encoded or decoded
    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Remote protocol version differs from ours
    #[error("Protocol mismatch: expected {expected}, received {received}")]
    ProtocolMismatch { expected: i32, received: i32 },

    /// Peer was never connected on this link
    #[error("Unknown peer {0}")]
    UnknownPeer(PeerId),

    /// Peer's receiving end is gone
    #[error("Peer {0} disconnected")]
    PeerDisconnected(PeerId),

    /// Skill file store error
    #[error("Store error: {0}")]
    Store(#[from] skillcap_store::Error),
}
