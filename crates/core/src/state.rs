//! Process-wide resolution state.
//!
//! The entry map is published through an [`ArcSwap`]: readers load a snapshot
//! without locking, writers build a complete new map and swap it in. Writers
//! are additionally serialised by a mutex so the `Local` to `Authoritative`
//! transition and the map swap happen as one step.

use crate::entry::ConfigurationMap;
use arc_swap::ArcSwap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Where the published entries came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceMode {
    /// Local skill file (default until a valid authoritative message arrives)
    #[default]
    Local,
    /// Received from the authoritative process; permanent for this process
    Authoritative,
}

impl SourceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceMode::Local => "local",
            SourceMode::Authoritative => "authoritative",
        }
    }

    fn from_u8(value: u8) -> Self {
        if value == 1 { SourceMode::Authoritative } else { SourceMode::Local }
    }

    fn as_u8(self) -> u8 {
        match self {
            SourceMode::Local => 0,
            SourceMode::Authoritative => 1,
        }
    }
}

impl std::fmt::Display for SourceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Single owned instance of everything the resolver reads.
#[derive(Debug)]
pub struct ResolutionState {
    entries: ArcSwap<ConfigurationMap>,
    source_mode: AtomicU8,
    enable_local_override: AtomicBool,
    last_broadcast_hash: Mutex<Option<String>>,
    warned: Mutex<HashSet<String>>,
    write_lock: Mutex<()>,
}

impl Default for ResolutionState {
    fn default() -> Self {
        Self::new(true)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ResolutionState {
    /// Empty state in `Local` mode.
    pub fn new(enable_local_override: bool) -> Self {
        Self {
            entries: ArcSwap::from_pointee(ConfigurationMap::new()),
            source_mode: AtomicU8::new(SourceMode::Local.as_u8()),
            enable_local_override: AtomicBool::new(enable_local_override),
            last_broadcast_hash: Mutex::new(None),
            warned: Mutex::new(HashSet::new()),
            write_lock: Mutex::new(()),
        }
    }

    /// Snapshot of the currently published map.
    pub fn entries(&self) -> Arc<ConfigurationMap> {
        self.entries.load_full()
    }

    pub fn source_mode(&self) -> SourceMode {
        SourceMode::from_u8(self.source_mode.load(Ordering::Acquire))
    }

    pub fn is_authoritative(&self) -> bool {
        self.source_mode() == SourceMode::Authoritative
    }

    pub fn local_override_enabled(&self) -> bool {
        self.enable_local_override.load(Ordering::Acquire)
    }

    pub fn set_local_override(&self, enabled: bool) {
        self.enable_local_override.store(enabled, Ordering::Release);
    }

    /// True when local file contents may be applied right now.
    pub fn accepts_local(&self) -> bool {
        !self.is_authoritative() && self.local_override_enabled()
    }

    /// Publish a map read from the local file.
    ///
    /// Refused (returns false) once the process is authoritative or when
    /// local override is disabled.
    pub fn publish_local(&self, map: ConfigurationMap) -> bool {
        let _guard = lock(&self.write_lock);
        if !self.accepts_local() {
            return false;
        }
        self.entries.store(Arc::new(map));
        true
    }

    /// Publish a map received from the authoritative process and lock the
    /// source mode to `Authoritative` for the rest of the process.
    pub fn publish_authoritative(&self, map: ConfigurationMap) {
        let _guard = lock(&self.write_lock);
        self.source_mode
            .store(SourceMode::Authoritative.as_u8(), Ordering::Release);
        self.entries.store(Arc::new(map));
    }

    pub fn last_broadcast_hash(&self) -> Option<String> {
        lock(&self.last_broadcast_hash).clone()
    }

    /// Record `hash` as broadcast. Returns false when it equals the previous one.
    pub fn record_broadcast_hash(&self, hash: &str) -> bool {
        let mut last = lock(&self.last_broadcast_hash);
        if last.as_deref() == Some(hash) {
            return false;
        }
        *last = Some(hash.to_string());
        true
    }

    /// Insert-if-absent on the warned identifier set. True on first insert.
    pub fn mark_warned(&self, identifier: &str) -> bool {
        let mut warned = lock(&self.warned);
        if warned.contains(identifier) {
            return false;
        }
        warned.insert(identifier.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::SkillConfigEntry;

    fn map_with(key: &str, cap: i32) -> ConfigurationMap {
        let mut map = ConfigurationMap::new();
        map.insert(key.to_string(), SkillConfigEntry::with_cap(cap));
        map
    }

    #[test]
    fn test_new_state_is_local_and_empty() {
        let state = ResolutionState::new(true);
        assert_eq!(state.source_mode(), SourceMode::Local);
        assert!(state.entries().is_empty());
        assert!(state.last_broadcast_hash().is_none());
    }

    #[test]
    fn test_publish_local_replaces_map() {
        let state = ResolutionState::new(true);
        assert!(state.publish_local(map_with("Swords", 300)));
        assert_eq!(state.entries()["Swords"].cap, 300);

        assert!(state.publish_local(map_with("Axes", 400)));
        let entries = state.entries();
        assert!(!entries.contains_key("Swords"));
        assert_eq!(entries["Axes"].cap, 400);
    }

    #[test]
    fn test_snapshot_survives_replacement() {
        let state = ResolutionState::new(true);
        state.publish_local(map_with("Swords", 300));
        let before = state.entries();
        state.publish_local(map_with("Swords", 500));
        assert_eq!(before["Swords"].cap, 300);
        assert_eq!(state.entries()["Swords"].cap, 500);
    }

    #[test]
    fn test_publish_local_refused_when_override_disabled() {
        let state = ResolutionState::new(false);
        assert!(!state.publish_local(map_with("Swords", 300)));
        assert!(state.entries().is_empty());
    }

    #[test]
    fn test_authoritative_lock_in_is_irreversible() {
        let state = ResolutionState::new(true);
        state.publish_authoritative(map_with("Swords", 900));
        assert_eq!(state.source_mode(), SourceMode::Authoritative);

        assert!(!state.publish_local(map_with("Swords", 300)));
        assert_eq!(state.entries()["Swords"].cap, 900);
        assert_eq!(state.source_mode(), SourceMode::Authoritative);
    }

    #[test]
    fn test_record_broadcast_hash() {
        let state = ResolutionState::default();
        assert!(state.record_broadcast_hash("abc"));
        assert!(!state.record_broadcast_hash("abc"));
        assert!(state.record_broadcast_hash("def"));
        assert_eq!(state.last_broadcast_hash().as_deref(), Some("def"));
    }

    #[test]
    fn test_mark_warned_once() {
        let state = ResolutionState::default();
        assert!(state.mark_warned("1500"));
        assert!(!state.mark_warned("1500"));
        assert!(state.mark_warned("1501"));
    }

    #[test]
    fn test_source_mode_display() {
        assert_eq!(SourceMode::Local.to_string(), "local");
        assert_eq!(SourceMode::Authoritative.to_string(), "authoritative");
    }
}
