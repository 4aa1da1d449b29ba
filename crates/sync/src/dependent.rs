//! Dependent side: validate and apply authoritative config.

use crate::lock;
use crate::message::SyncMessage;
use crate::phase::SyncPhase;

use chrono::{DateTime, Utc};
use skillcap_core::{ConfigurationMap, ResolutionState};
use skillcap_store::{DocumentFormat, parse_document};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// Entries replaced; `format` is `None` when the content could not be parsed
    Applied { entries: usize, format: Option<DocumentFormat> },
    /// Protocol version mismatch; state untouched
    Rejected { expected: i32, received: i32 },
}

impl ReceiveOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ReceiveOutcome::Applied { .. })
    }
}

#[derive(Debug)]
pub struct Dependent {
    state: Arc<ResolutionState>,
    phase: Mutex<SyncPhase>,
    received_at: Mutex<Option<DateTime<Utc>>>,
}

impl Dependent {
    pub fn new(state: Arc<ResolutionState>) -> Self {
        Self { state, phase: Mutex::new(SyncPhase::Unsynced), received_at: Mutex::new(None) }
    }

    pub fn phase(&self) -> SyncPhase {
        *lock(&self.phase)
    }

    /// When the last authoritative message was applied.
    pub fn last_received_at(&self) -> Option<DateTime<Utc>> {
        *lock(&self.received_at)
    }

    /// Apply an authoritative message.
    ///
    /// A matching version switches the process to authoritative mode for good
    /// and replaces the entries, with an empty map when nothing parses.
    pub fn on_receive(&self, content: &str, protocol_version: i32) -> ReceiveOutcome {
        let message = SyncMessage { content: content.to_string(), protocol_version };
        if let Err(e) = message.check_version() {
            warn!("discarding skill config from authority: {}", e);
            return ReceiveOutcome::Rejected { expected: skillcap_core::PROTOCOL_VERSION, received: protocol_version };
        }

        let (entries, format) = match parse_document(content) {
            Ok(doc) => (doc.entries, Some(doc.format)),
            Err(e) => {
                warn!("authority sent unparseable skill config, clearing entries: {}", e);
                (ConfigurationMap::new(), None)
            }
        };

        let count = entries.len();
        self.state.publish_authoritative(entries);
        *lock(&self.phase) = SyncPhase::Received;
        *lock(&self.received_at) = Some(Utc::now());

        info!(entries = count, "applied authoritative skill config");
        ReceiveOutcome::Applied { entries: count, format }
    }

    /// Decode and apply one wire frame; undecodable frames are dropped.
    pub fn on_frame(&self, frame: &[u8]) -> Option<ReceiveOutcome> {
        match SyncMessage::decode(frame) {
            Ok(message) => Some(self.on_receive(&message.content, message.protocol_version)),
            Err(e) => {
                warn!(bytes = frame.len(), "discarding undecodable sync frame: {}", e);
                None
            }
        }
    }

    /// Apply frames until the sender closes; returns how many were applied.
    pub async fn run(&self, mut frames: mpsc::UnboundedReceiver<Vec<u8>>) -> usize {
        let mut applied = 0;
        while let Some(frame) = frames.recv().await {
            if self.on_frame(&frame).is_some_and(|outcome| outcome.is_applied()) {
                applied += 1;
            }
        }
        debug!(applied, "sync link closed");
        applied
    }
}
