//! Persisted skill file store.
//!
//! Owns the on-disk YAML document: current and legacy formats, atomic saves
//! with a fallback location, seeding and migration, and change watching.
//!
//! # Example
//!
//! ```no_run
//! use skillcap_core::Settings;
//! use skillcap_store::ConfigStore;
//!
//! let settings = Settings::default();
//! let store = ConfigStore::open(&settings.store);
//! store.ensure_exists(["Swords", "Axes"], &settings.fallback_entry());
//! let entries = store.load();
//! assert!(entries.contains_key("Swords"));
//! ```

pub mod config_store;
pub mod error;
pub mod format;
pub mod watcher;

pub use config_store::{ConfigStore, MigrationOutcome, SaveOutcome};
pub use error::{Error, Result};
pub use format::{DocumentFormat, ParsedDocument, parse_document, render_document};
pub use watcher::{ConfigWatcher, SkillFileEvent};
