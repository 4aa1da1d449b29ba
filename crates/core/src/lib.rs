//! Skill cap resolution engine.
//!
//! Turns a skill identifier into an effective maximum level, a bonus-factor
//! ceiling and a growth curve, with the precedence rules between the local
//! skill file and configuration received from an authoritative process.

pub mod config;
pub mod curve;
pub mod entry;
pub mod error;
pub mod logging;
pub mod names;
pub mod resolver;
pub mod state;
pub mod version;

pub use config::{GeneralSettings, LoggingSettings, Settings, StoreSettings};
pub use curve::{CurveParams, level_progress_fraction, next_level_threshold, skill_factor};
pub use entry::{ConfigurationMap, DEFAULT_BONUS_CAP, DEFAULT_CAP, SkillConfigEntry};
pub use error::{Error, Result};
pub use names::{NameLookup, NameTable, NoNames, Resolution};
pub use resolver::Resolver;
pub use state::{ResolutionState, SourceMode};
pub use version::{CONFIG_SCHEMA_VERSION, PROTOCOL_VERSION};
