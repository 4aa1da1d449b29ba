//! Wire message from the authority to its dependents.
//!
//! A frame is the JSON pair `[content, protocolVersion]`, where `content` is
//! the full skill file text. No partial updates are ever sent.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use skillcap_core::PROTOCOL_VERSION;
use skillcap_core::version::is_compatible;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, i32)", into = "(String, i32)")]
pub struct SyncMessage {
    pub content: String,
    pub protocol_version: i32,
}

impl From<(String, i32)> for SyncMessage {
    fn from((content, protocol_version): (String, i32)) -> Self {
        Self { content, protocol_version }
    }
}

impl From<SyncMessage> for (String, i32) {
    fn from(message: SyncMessage) -> Self {
        (message.content, message.protocol_version)
    }
}

impl SyncMessage {
    /// Message carrying `content` at the local protocol version.
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into(), protocol_version: PROTOCOL_VERSION }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(frame: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(frame)?)
    }

    /// Fails unless the protocol version matches ours exactly.
    pub fn check_version(&self) -> Result<()> {
        if is_compatible(self.protocol_version) {
            Ok(())
        } else {
            Err(Error::ProtocolMismatch { expected: PROTOCOL_VERSION, received: self.protocol_version })
        }
    }

    pub fn content_hash(&self) -> String {
        content_hash(&self.content)
    }
}

/// SHA-256 of the text, lowercase hex.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
