use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::entry::{DEFAULT_BONUS_CAP, DEFAULT_CAP, SkillConfigEntry};
use crate::error::{Error, Result};

/// Default skill file name inside the config directory
pub const DEFAULT_SKILL_FILE: &str = "skilllimitconfig.yaml";

/// Directory name used under platform config/data directories
pub const APP_DIR_NAME: &str = "skillcap";

/// General engine behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct GeneralSettings {
    /// Cap applied to skills without a valid entry
    pub default_cap: i32,

    /// Bonus cap (hundredths) applied to skills without a valid entry
    pub default_bonus_cap: i32,

    /// Apply the local skill file while no authoritative config was received
    pub enable_local_override: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self { default_cap: DEFAULT_CAP, default_bonus_cap: DEFAULT_BONUS_CAP, enable_local_override: true }
    }
}

/// Where the skill file lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct StoreSettings {
    /// Directory holding the skill file (default: platform config dir)
    pub dir: Option<PathBuf>,

    /// Skill file name
    pub file_name: String,

    /// Writable directory used when `dir` cannot be written
    pub fallback_dir: Option<PathBuf>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self { dir: None, file_name: DEFAULT_SKILL_FILE.to_string(), fallback_dir: None }
    }
}

impl StoreSettings {
    /// Directory for the skill file, resolving the platform default.
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR_NAME)
        })
    }

    /// Fallback directory, resolving the platform default.
    pub fn resolved_fallback_dir(&self) -> PathBuf {
        self.fallback_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR_NAME)
        })
    }

    pub fn primary_path(&self) -> PathBuf {
        self.resolved_dir().join(&self.file_name)
    }

    pub fn fallback_path(&self) -> PathBuf {
        self.resolved_fallback_dir().join(&self.file_name)
    }
}

/// File logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FileLoggingConfig {
    /// Write JSON logs to a daily-rotated file
    pub enabled: bool,

    /// Filter for the file layer
    pub level: String,
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        Self { enabled: false, level: "debug".to_string() }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LoggingSettings {
    /// Default filter for stderr output
    pub level: String,

    /// Stderr format: `pretty`, `json` or `compact`
    pub format: String,

    pub file: FileLoggingConfig,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: "warn".to_string(), format: "pretty".to_string(), file: FileLoggingConfig::default() }
    }
}

/// Root structure of `skillcap.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub store: StoreSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Load settings from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(toml_str)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::SettingsNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load settings, using defaults when the file is missing or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::from_file(path) {
            Ok(settings) => settings,
            Err(Error::SettingsNotFound(_)) => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                Self::default()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "ignoring invalid settings file: {}", e);
                Self::default()
            }
        }
    }

    /// Entry used for skills without a valid configured value
    pub fn fallback_entry(&self) -> SkillConfigEntry {
        SkillConfigEntry::with_caps(self.general.default_cap, self.general.default_bonus_cap)
    }

    /// Validate the settings
    fn validate(&self) -> Result<()> {
        if self.general.default_cap <= 0 {
            return Err(Error::Config(format!(
                "default_cap must be positive, got {}",
                self.general.default_cap
            )));
        }

        if self.general.default_bonus_cap <= 0 {
            return Err(Error::Config(format!(
                "default_bonus_cap must be positive, got {}",
                self.general.default_bonus_cap
            )));
        }

        let name = &self.store.file_name;
        if name.trim().is_empty() {
            return Err(Error::Config("store.file_name must not be empty".to_string()));
        }
        if name.contains('/') || name.contains('\\') {
            return Err(Error::Config(format!(
                "store.file_name must be a bare file name, got '{}'",
                name
            )));
        }

        Ok(())
    }

    /// Get example settings (as a string)
    pub fn example() -> &'static str {
        r#"# skillcap settings
# Copy this file to skillcap.toml and customize as needed

[general]
# Cap applied to skills with no entry (or a cap <= 0) in the skill file
default_cap = 250
# Bonus cap, in hundredths, applied the same way (100 = factor 1.0)
default_bonus_cap = 100
# Apply the local skill file until an authoritative config is received
enable_local_override = true

[store]
# Directory holding the skill file (default: platform config dir + /skillcap)
# dir = "/path/to/config/skillcap"
file_name = "skilllimitconfig.yaml"
# Writable directory used if the primary one cannot be written
# fallback_dir = "/path/to/writable/dir"

[logging]
# Filter for stderr output (overridden by SKILLCAP_LOG / RUST_LOG)
level = "warn"
# "pretty", "json" or "compact"
format = "pretty"

[logging.file]
enabled = false
level = "debug"
"#
    }
}
