use crate::error::{Error, Result};
use crate::format::{DocumentFormat, ParsedDocument, parse_document, render_document};

use skillcap_core::{ConfigurationMap, SkillConfigEntry, StoreSettings};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, error, info, warn};

/// Where a save ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Written to the active location without redirection
    Written(PathBuf),
    /// Primary write failed; written to the fallback, which is now active
    Redirected(PathBuf),
    /// Neither location could be written
    Failed,
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        !matches!(self, SaveOutcome::Failed)
    }
}

/// Result of rewriting a skill file into the current format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// No file to migrate
    Missing,
    /// Already in the current format
    AlreadyCurrent,
    /// Legacy file rewritten, with the number of entries carried over
    Migrated { entries: usize },
    /// File is neither format; left untouched
    Unrecognised,
    /// Legacy file could not be rewritten
    Failed,
}

/// Reads and writes the operator-edited skill file.
///
/// Holds a primary and a fallback location. Once a write to the primary fails
/// the store redirects to the fallback for the rest of its lifetime.
#[derive(Debug)]
pub struct ConfigStore {
    primary: PathBuf,
    fallback: PathBuf,
    active: RwLock<PathBuf>,
}

impl ConfigStore {
    pub fn open(settings: &StoreSettings) -> Self {
        Self::with_paths(settings.primary_path(), settings.fallback_path())
    }

    pub fn with_paths(primary: impl Into<PathBuf>, fallback: impl Into<PathBuf>) -> Self {
        let primary = primary.into();
        let fallback = fallback.into();

        let active = if !exists(&primary) && primary != fallback && exists(&fallback) {
            info!(path = %fallback.display(), "using skill file left at fallback location");
            fallback.clone()
        } else {
            primary.clone()
        };

        Self { primary, fallback, active: RwLock::new(active) }
    }

    pub fn primary_path(&self) -> &Path {
        &self.primary
    }

    pub fn fallback_path(&self) -> &Path {
        &self.fallback
    }

    /// Path currently used for reads and writes.
    pub fn active_path(&self) -> PathBuf {
        self.read_active().clone()
    }

    pub fn is_redirected(&self) -> bool {
        *self.read_active() != self.primary
    }

    fn read_active(&self) -> RwLockReadGuard<'_, PathBuf> {
        self.active.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_active(&self) -> RwLockWriteGuard<'_, PathBuf> {
        self.active.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seed the skill file with one default entry per known skill when absent.
    ///
    /// Returns `true` when a new file was written. An existing file is never
    /// replaced.
    pub fn ensure_exists<I, S>(&self, known_skills: I, default_entry: &SkillConfigEntry) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let path = self.active_path();
        if exists(&path) {
            return false;
        }

        let entries: ConfigurationMap = known_skills
            .into_iter()
            .map(|skill| (skill.as_ref().to_string(), default_entry.clone()))
            .collect();

        info!(path = %path.display(), skills = entries.len(), "seeding skill file");
        self.save(&entries).is_saved()
    }

    /// Load the skill file, degrading to an empty map on any failure.
    pub fn load(&self) -> ConfigurationMap {
        match self.load_document() {
            Ok(Some(doc)) => {
                if doc.format == DocumentFormat::Legacy {
                    info!(path = %self.active_path().display(), "read skill file in legacy format");
                }
                doc.entries
            }
            Ok(None) => {
                debug!(path = %self.active_path().display(), "no skill file");
                ConfigurationMap::new()
            }
            Err(e) => {
                warn!(path = %self.active_path().display(), "ignoring unreadable skill file: {}", e);
                ConfigurationMap::new()
            }
        }
    }

    /// Parse the active file; `None` when it does not exist.
    pub fn load_document(&self) -> Result<Option<ParsedDocument>> {
        match self.try_read_text()? {
            Some(text) => parse_document(&text).map(Some),
            None => Ok(None),
        }
    }

    /// Raw text of the active file, or `None` when absent or unreadable.
    pub fn read_text(&self) -> Option<String> {
        match self.try_read_text() {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %self.active_path().display(), "failed to read skill file: {}", e);
                None
            }
        }
    }

    fn try_read_text(&self) -> Result<Option<String>> {
        let path = self.active_path();
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist `entries`, falling back to the secondary location on failure.
    pub fn save(&self, entries: &ConfigurationMap) -> SaveOutcome {
        match self.try_save(entries) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("skill file not saved: {}", e);
                SaveOutcome::Failed
            }
        }
    }

    /// Like [`ConfigStore::save`] but reports why nothing was written.
    pub fn try_save(&self, entries: &ConfigurationMap) -> Result<SaveOutcome> {
        let text = render_document(entries)?;
        let mut active = self.write_active();

        let primary_err = match write_atomic(&active, &text) {
            Ok(()) => {
                debug!(path = %active.display(), skills = entries.len(), "saved skill file");
                return Ok(SaveOutcome::Written(active.clone()));
            }
            Err(e) => e,
        };

        if *active == self.fallback {
            return Err(Error::Unwritable {
                primary: self.primary.clone(),
                fallback: self.fallback.clone(),
                reason: primary_err.to_string(),
            });
        }

        warn!(
            path = %active.display(),
            fallback = %self.fallback.display(),
            "cannot write skill file ({}), redirecting to fallback", primary_err
        );

        match write_atomic(&self.fallback, &text) {
            Ok(()) => {
                *active = self.fallback.clone();
                Ok(SaveOutcome::Redirected(self.fallback.clone()))
            }
            Err(e) => Err(Error::Unwritable {
                primary: self.primary.clone(),
                fallback: self.fallback.clone(),
                reason: format!("{primary_err}; fallback: {e}"),
            }),
        }
    }

    /// Add a default entry for every known skill missing from the file.
    ///
    /// Saves only when something was added; returns the number of new keys.
    pub fn append_missing<I, S>(&self, known_skills: I, default_entry: &SkillConfigEntry) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries = self.load();
        let mut added = 0;
        for skill in known_skills {
            let key = skill.as_ref();
            if !entries.contains_key(key) {
                entries.insert(key.to_string(), default_entry.clone());
                added += 1;
            }
        }

        if added > 0 {
            info!(added, "appending missing skills to skill file");
            if !self.save(&entries).is_saved() {
                return 0;
            }
        }
        added
    }

    /// Rewrite a legacy-format file in the current format.
    pub fn migrate(&self) -> MigrationOutcome {
        let doc = match self.load_document() {
            Ok(Some(doc)) => doc,
            Ok(None) => return MigrationOutcome::Missing,
            Err(e) => {
                warn!(path = %self.active_path().display(), "not migrating unrecognised skill file: {}", e);
                return MigrationOutcome::Unrecognised;
            }
        };

        if doc.format == DocumentFormat::Current {
            return MigrationOutcome::AlreadyCurrent;
        }

        let count = doc.entries.len();
        if self.save(&doc.entries).is_saved() {
            info!(entries = count, "migrated legacy skill file");
            MigrationOutcome::Migrated { entries: count }
        } else {
            MigrationOutcome::Failed
        }
    }
}

/// Read failures count as absent.
fn exists(path: &Path) -> bool {
    path.try_exists().unwrap_or(false)
}

/// Write to a sibling temp file, then rename over the destination.
fn write_atomic(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("yaml.tmp");
    let result = (|| -> Result<()> {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(text.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, path)?;
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(temp: &TempDir) -> ConfigStore {
        ConfigStore::with_paths(
            temp.path().join("config").join("skilllimitconfig.yaml"),
            temp.path().join("fallback").join("skilllimitconfig.yaml"),
        )
    }

    fn sample() -> ConfigurationMap {
        let mut entries = ConfigurationMap::new();
        entries.insert("Swords".to_string(), SkillConfigEntry::with_cap(300));
        entries.insert(
            "1500".to_string(),
            SkillConfigEntry { use_custom_growth_curve: true, growth_exponent: 2.0, ..SkillConfigEntry::with_cap(500) },
        );
        entries
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        assert!(store.load().is_empty());
        assert!(store.read_text().is_none());
    }

    #[test]
    fn test_save_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        let entries = sample();

        assert_eq!(store.save(&entries), SaveOutcome::Written(store.primary_path().to_path_buf()));
        let loaded = store.load();
        assert_eq!(loaded, entries);

        store.save(&loaded);
        assert_eq!(store.load(), entries);
        assert!(!store.primary_path().with_extension("yaml.tmp").exists());
    }

    #[test]
    fn test_load_legacy_file() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        fs::create_dir_all(store.primary_path().parent().unwrap()).unwrap();
        fs::write(store.primary_path(), "Swords: 300\n").unwrap();

        let loaded = store.load();
        assert_eq!(loaded["Swords"], SkillConfigEntry::with_cap(300));
    }

    #[test]
    fn test_load_garbage_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        fs::create_dir_all(store.primary_path().parent().unwrap()).unwrap();
        fs::write(store.primary_path(), "Swords: [unterminated").unwrap();

        assert!(store.load().is_empty());
        assert!(store.load_document().is_err());
    }

    #[test]
    fn test_ensure_exists_seeds_once() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        let default_entry = SkillConfigEntry::with_cap(250);

        assert!(store.ensure_exists(["Swords", "Axes"], &default_entry));
        let loaded = store.load();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded["Axes"], default_entry);

        fs::write(store.primary_path(), "Swords: 999\n").unwrap();
        assert!(!store.ensure_exists(["Swords", "Axes", "Bows"], &default_entry));
        assert_eq!(fs::read_to_string(store.primary_path()).unwrap(), "Swords: 999\n");
    }

    #[test]
    fn test_append_missing() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        let default_entry = SkillConfigEntry::default();
        store.save(&sample());

        assert_eq!(store.append_missing(["Swords", "Cartography", "1500"], &default_entry), 1);
        let loaded = store.load();
        assert_eq!(loaded["Swords"].cap, 300);
        assert_eq!(loaded["Cartography"], default_entry);

        let before = fs::read_to_string(store.primary_path()).unwrap();
        assert_eq!(store.append_missing(["Swords"], &default_entry), 0);
        assert_eq!(fs::read_to_string(store.primary_path()).unwrap(), before);
    }

    #[test]
    fn test_migrate_legacy_file() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        assert_eq!(store.migrate(), MigrationOutcome::Missing);

        fs::create_dir_all(store.primary_path().parent().unwrap()).unwrap();
        fs::write(store.primary_path(), "Swords: 300\nAxes: 400\n").unwrap();

        assert_eq!(store.migrate(), MigrationOutcome::Migrated { entries: 2 });
        let doc = store.load_document().unwrap().unwrap();
        assert_eq!(doc.format, DocumentFormat::Current);
        assert_eq!(doc.entries["Axes"].cap, 400);
        assert_eq!(store.migrate(), MigrationOutcome::AlreadyCurrent);

        fs::write(store.primary_path(), "- not\n- a map\n").unwrap();
        assert_eq!(store.migrate(), MigrationOutcome::Unrecognised);
    }

    #[test]
    fn test_save_redirects_to_fallback() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let store = ConfigStore::with_paths(
            blocker.join("skilllimitconfig.yaml"),
            temp.path().join("fallback").join("skilllimitconfig.yaml"),
        );
        let entries = sample();

        let outcome = store.save(&entries);
        assert_eq!(outcome, SaveOutcome::Redirected(store.fallback_path().to_path_buf()));
        assert!(store.is_redirected());
        assert_eq!(store.active_path(), store.fallback_path());
        assert_eq!(store.load(), entries);

        let mut more = entries.clone();
        more.insert("Bows".to_string(), SkillConfigEntry::default());
        assert_eq!(store.save(&more), SaveOutcome::Written(store.fallback_path().to_path_buf()));
    }

    #[test]
    fn test_save_fails_when_both_locations_unwritable() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let store =
            ConfigStore::with_paths(blocker.join("a").join("caps.yaml"), blocker.join("b").join("caps.yaml"));
        assert_eq!(store.save(&sample()), SaveOutcome::Failed);
        assert!(matches!(store.try_save(&sample()), Err(Error::Unwritable { .. })));
    }

    #[test]
    fn test_open_starts_redirected_when_only_fallback_exists() {
        let temp = TempDir::new().unwrap();
        let first = store_in(&temp);
        fs::create_dir_all(first.fallback_path().parent().unwrap()).unwrap();
        fs::write(first.fallback_path(), "Swords: 310\n").unwrap();

        let store = store_in(&temp);
        assert!(store.is_redirected());
        assert_eq!(store.load()["Swords"].cap, 310);
    }

    #[test]
    fn test_open_from_settings() {
        let temp = TempDir::new().unwrap();
        let settings = StoreSettings {
            dir: Some(temp.path().join("cfg")),
            file_name: "caps.yaml".to_string(),
            fallback_dir: Some(temp.path().join("fb")),
        };
        let store = ConfigStore::open(&settings);
        assert_eq!(store.active_path(), temp.path().join("cfg").join("caps.yaml"));
        assert!(!store.is_redirected());
    }
}
