//! Process-level facade wiring settings, store, resolver and sync role.

use crate::authority::{Authority, BroadcastOutcome};
use crate::dependent::{Dependent, ReceiveOutcome};
use crate::error::Result;
use crate::link::{PeerId, PeerLink};
use crate::phase::SyncPhase;

use skillcap_core::{CurveParams, NameLookup, NoNames, ResolutionState, Resolver, Settings, SourceMode};
use skillcap_store::{ConfigStore, ConfigWatcher, MigrationOutcome, SkillFileEvent};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// Which side of the sync link this process is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Authoritative,
    Dependent,
}

#[derive(Debug)]
enum Side {
    Authority(Authority),
    Dependent(Dependent),
}

/// One running engine: the resolution state, its skill file and its sync role.
#[derive(Debug)]
pub struct Runtime {
    settings: Settings,
    state: Arc<ResolutionState>,
    store: Arc<ConfigStore>,
    resolver: Resolver,
    side: Side,
}

impl Runtime {
    /// Authoritative process broadcasting over `link`.
    pub fn authoritative(settings: Settings, names: Arc<dyn NameLookup>, link: Arc<dyn PeerLink>) -> Self {
        Self::build(settings, names, |state, store| Side::Authority(Authority::new(state, store, link)))
    }

    /// Dependent process receiving from an authority.
    pub fn dependent(settings: Settings, names: Arc<dyn NameLookup>) -> Self {
        Self::build(settings, names, |state, _| Side::Dependent(Dependent::new(state)))
    }

    /// Process with no sync link; behaves as an authority without peers.
    pub fn standalone(settings: Settings) -> Self {
        Self::authoritative(settings, Arc::new(NoNames), Arc::new(NoLink))
    }

    fn build<F>(settings: Settings, names: Arc<dyn NameLookup>, side: F) -> Self
    where
        F: FnOnce(Arc<ResolutionState>, Arc<ConfigStore>) -> Side,
    {
        let state = Arc::new(ResolutionState::new(settings.general.enable_local_override));
        let store = Arc::new(ConfigStore::open(&settings.store));
        let resolver = Resolver::new(state.clone())
            .with_names(names)
            .with_fallback(settings.fallback_entry());
        let side = side(state.clone(), store.clone());

        let runtime = Self { settings, state, store, resolver, side };
        runtime.reload();
        runtime
    }

    pub fn role(&self) -> Role {
        match self.side {
            Side::Authority(_) => Role::Authoritative,
            Side::Dependent(_) => Role::Dependent,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn state(&self) -> &Arc<ResolutionState> {
        &self.state
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn source_mode(&self) -> SourceMode {
        self.state.source_mode()
    }

    pub fn phase(&self) -> SyncPhase {
        match &self.side {
            Side::Authority(authority) => authority.phase(),
            Side::Dependent(dependent) => dependent.phase(),
        }
    }

    /// Seed the skill file with the known skills if absent, then reload.
    pub fn seed<I, S>(&self, known_skills: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let created = self.store.ensure_exists(known_skills, &self.settings.fallback_entry());
        if created {
            self.reload();
        }
        created
    }

    /// Add defaults for skills discovered after startup; reloads when any were added.
    pub fn append_missing<I, S>(&self, known_skills: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let added = self.store.append_missing(known_skills, &self.settings.fallback_entry());
        if added > 0 {
            self.reload();
        }
        added
    }

    pub fn migrate(&self) -> MigrationOutcome {
        let outcome = self.store.migrate();
        if matches!(outcome, MigrationOutcome::Migrated { .. }) {
            self.reload();
        }
        outcome
    }

    /// Re-read the skill file and publish it unless authoritative data or the
    /// override setting forbids. An authority then broadcasts if changed.
    pub fn reload(&self) -> bool {
        let entries = self.store.load();
        let count = entries.len();
        let applied = self.state.publish_local(entries);
        if applied {
            info!(entries = count, path = %self.store.active_path().display(), "loaded skill file");
        } else {
            debug!(mode = %self.state.source_mode(), "local skill file not applied");
        }

        if let Side::Authority(authority) = &self.side {
            authority.broadcast_if_changed();
        }
        applied
    }

    /// `None` on a dependent, which never broadcasts.
    pub fn broadcast_if_changed(&self) -> Option<BroadcastOutcome> {
        match &self.side {
            Side::Authority(authority) => Some(authority.broadcast_if_changed()),
            Side::Dependent(_) => None,
        }
    }

    /// `false` when the peer was refused or this process is a dependent.
    pub fn on_peer_active(&self, peer: PeerId, protocol_version: i32) -> bool {
        match &self.side {
            Side::Authority(authority) => authority.on_peer_active(peer, protocol_version),
            Side::Dependent(_) => {
                warn!(peer = %peer, "dependent ignoring peer activation");
                false
            }
        }
    }

    pub fn on_peer_inactive(&self, peer: PeerId) -> bool {
        match &self.side {
            Side::Authority(authority) => authority.on_peer_inactive(peer),
            Side::Dependent(_) => false,
        }
    }

    /// `None` on an authority, which never accepts remote config.
    pub fn on_receive(&self, content: &str, protocol_version: i32) -> Option<ReceiveOutcome> {
        match &self.side {
            Side::Dependent(dependent) => Some(dependent.on_receive(content, protocol_version)),
            Side::Authority(_) => {
                warn!("authority ignoring received skill config");
                None
            }
        }
    }

    /// Apply frames from the authority until the link closes.
    pub async fn run_receiver(&self, frames: mpsc::UnboundedReceiver<Vec<u8>>) -> usize {
        match &self.side {
            Side::Dependent(dependent) => dependent.run(frames).await,
            Side::Authority(_) => 0,
        }
    }

    pub fn watch(&self) -> Result<ConfigWatcher> {
        Ok(ConfigWatcher::new(self.store.active_path())?)
    }

    /// Reload on every skill file event until the watcher goes away.
    pub async fn follow(&self, mut events: broadcast::Receiver<SkillFileEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => {
                    debug!(path = %event.path().display(), "skill file changed");
                    self.reload();
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "skill file events lagged");
                    self.reload();
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    pub fn get_cap(&self, skill: &str) -> i32 {
        self.resolver.get_cap(skill)
    }

    pub fn get_bonus_cap(&self, skill: &str) -> i32 {
        self.resolver.get_bonus_cap(skill)
    }

    pub fn is_relative(&self, skill: &str) -> bool {
        self.resolver.is_relative(skill)
    }

    pub fn use_custom_growth_curve(&self, skill: &str) -> bool {
        self.resolver.use_custom_growth_curve(skill)
    }

    pub fn get_growth_exponent(&self, skill: &str) -> f32 {
        self.resolver.get_growth_exponent(skill)
    }

    pub fn get_growth_multiplier(&self, skill: &str) -> f32 {
        self.resolver.get_growth_multiplier(skill)
    }

    pub fn get_growth_constant(&self, skill: &str) -> f32 {
        self.resolver.get_growth_constant(skill)
    }

    pub fn curve_params(&self, skill: &str) -> CurveParams {
        self.resolver.curve_params(skill)
    }

    pub fn next_level_threshold(&self, skill: &str, current_level: f32) -> f32 {
        self.resolver.next_level_threshold(skill, current_level)
    }

    pub fn level_progress_fraction(&self, skill: &str, accumulated_progress: f32, current_level: f32) -> f32 {
        self.resolver
            .level_progress_fraction(skill, accumulated_progress, current_level)
    }
}

/// Link with no peers.
struct NoLink;

impl PeerLink for NoLink {
    fn send(&self, peer: PeerId, _message: &crate::message::SyncMessage) -> Result<()> {
        Err(crate::error::Error::UnknownPeer(peer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillcap_core::{ConfigurationMap, NameTable, SkillConfigEntry, StoreSettings};
    use std::fs;
    use tempfile::TempDir;

    fn settings_in(temp: &TempDir) -> Settings {
        Settings {
            store: StoreSettings {
                dir: Some(temp.path().join("config")),
                fallback_dir: Some(temp.path().join("fallback")),
                ..StoreSettings::default()
            },
            ..Settings::default()
        }
    }

    fn write_skill_file(temp: &TempDir, text: &str) {
        let dir = temp.path().join("config");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("skilllimitconfig.yaml"), text).unwrap();
    }

    #[test]
    fn test_standalone_loads_on_start() {
        let temp = TempDir::new().unwrap();
        write_skill_file(&temp, "Swords:\n  cap: 300\n  bonusCap: 150\nRun:\n  cap: 0\n");

        let runtime = Runtime::standalone(settings_in(&temp));
        assert_eq!(runtime.role(), Role::Authoritative);
        assert_eq!(runtime.get_cap("Swords"), 300);
        assert_eq!(runtime.get_bonus_cap("Swords"), 150);
        assert_eq!(runtime.get_cap("Run"), 250);
        assert_eq!(runtime.get_cap("Unknown"), 250);
        assert!(runtime.is_relative("Unknown"));
    }

    #[test]
    fn test_seed_creates_file_with_default_cap() {
        let temp = TempDir::new().unwrap();
        let mut settings = settings_in(&temp);
        settings.general.default_cap = 400;

        let runtime = Runtime::standalone(settings);
        assert!(runtime.seed(["Swords", "Axes"]));
        assert!(!runtime.seed(["Swords"]));
        assert_eq!(runtime.state().entries()["Axes"].cap, 400);
        assert_eq!(runtime.append_missing(["Swords", "Bows"]), 1);
        assert!(runtime.state().entries().contains_key("Bows"));
    }

    #[test]
    fn test_override_disabled_ignores_local_file() {
        let temp = TempDir::new().unwrap();
        write_skill_file(&temp, "Swords: 300\n");
        let mut settings = settings_in(&temp);
        settings.general.enable_local_override = false;

        let runtime = Runtime::dependent(settings, Arc::new(NoNames));
        assert!(!runtime.reload());
        assert_eq!(runtime.get_cap("Swords"), 250);
    }

    #[test]
    fn test_dependent_lock_in_survives_reload() {
        let temp = TempDir::new().unwrap();
        write_skill_file(&temp, "Swords: 300\n");
        let runtime = Runtime::dependent(settings_in(&temp), Arc::new(NoNames));
        assert_eq!(runtime.get_cap("Swords"), 300);

        let outcome = runtime.on_receive("Swords:\n  cap: 600\n", skillcap_core::PROTOCOL_VERSION);
        assert!(outcome.unwrap().is_applied());
        assert_eq!(runtime.source_mode(), SourceMode::Authoritative);

        write_skill_file(&temp, "Swords: 111\n");
        assert!(!runtime.reload());
        assert_eq!(runtime.get_cap("Swords"), 600);
        assert_eq!(runtime.phase(), SyncPhase::Received);
        assert!(runtime.broadcast_if_changed().is_none());
    }

    #[test]
    fn test_extension_skill_resolves_through_names() {
        let temp = TempDir::new().unwrap();
        write_skill_file(&temp, "Cartography:\n  cap: 175\n  useCustomGrowthCurve: true\n  growthExponent: 2.0\n");
        let names: NameTable = [(1500, "$skilldesc_Cartography")].into_iter().collect();

        let runtime = Runtime::dependent(settings_in(&temp), Arc::new(names));
        assert_eq!(runtime.get_cap("1500"), 175);
        assert!(runtime.use_custom_growth_curve("1500"));
        assert_eq!(runtime.get_growth_exponent("1500"), 2.0);
        assert_eq!(runtime.get_cap("1600"), 250);
    }

    #[test]
    fn test_migrate_reloads() {
        let temp = TempDir::new().unwrap();
        write_skill_file(&temp, "Swords: 300\n");
        let runtime = Runtime::standalone(settings_in(&temp));
        assert_eq!(runtime.migrate(), MigrationOutcome::Migrated { entries: 1 });
        let mut expected = ConfigurationMap::new();
        expected.insert("Swords".to_string(), SkillConfigEntry::with_cap(300));
        assert_eq!(*runtime.state().entries(), expected);
    }

    #[test]
    fn test_progress_is_zero_at_cap() {
        let temp = TempDir::new().unwrap();
        write_skill_file(&temp, "Swords: 10\n");
        let runtime = Runtime::standalone(settings_in(&temp));
        assert_eq!(runtime.level_progress_fraction("Swords", 5.0, 10.0), 0.0);
        assert!(runtime.level_progress_fraction("Swords", 1.0, 1.0) > 0.0);
        assert!(runtime.next_level_threshold("Swords", 1.0) > 0.0);
    }

    #[tokio::test]
    async fn test_follow_reloads_until_closed() {
        let temp = TempDir::new().unwrap();
        write_skill_file(&temp, "Swords: 300\n");
        let runtime = Runtime::standalone(settings_in(&temp));

        let (tx, rx) = broadcast::channel(4);
        write_skill_file(&temp, "Swords: 320\n");
        tx.send(SkillFileEvent::Changed(runtime.store().active_path())).unwrap();
        drop(tx);

        runtime.follow(rx).await;
        assert_eq!(runtime.get_cap("Swords"), 320);
    }
}
