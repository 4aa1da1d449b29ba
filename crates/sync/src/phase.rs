use std::fmt;

/// Sync progress of one process. Never returns to `Unsynced`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    #[default]
    Unsynced,
    /// Authority has broadcast at least once
    BroadcastPending,
    /// Dependent has accepted an authoritative message
    Received,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::Unsynced => "unsynced",
            SyncPhase::BroadcastPending => "broadcast-pending",
            SyncPhase::Received => "received",
        }
    }

    pub fn is_synced(&self) -> bool {
        !matches!(self, SyncPhase::Unsynced)
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
