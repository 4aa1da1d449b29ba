//! Skill config synchronization between an authoritative process and its
//! dependents.
//!
//! The authority hashes the skill file text and broadcasts it, with the
//! protocol version, whenever the hash changes or a peer becomes active.
//! A dependent that accepts a message switches to authoritative mode for the
//! rest of the process and stops applying its own skill file.

pub mod authority;
pub mod dependent;
pub mod error;
pub mod link;
pub mod message;
pub mod phase;
pub mod runtime;

pub use authority::{Authority, BroadcastOutcome};
pub use dependent::{Dependent, ReceiveOutcome};
pub use error::{Error, Result};
pub use link::{ChannelLink, PeerId, PeerLink};
pub use message::{SyncMessage, content_hash};
pub use phase::SyncPhase;
pub use runtime::{Role, Runtime};

use std::sync::{Mutex, MutexGuard};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
