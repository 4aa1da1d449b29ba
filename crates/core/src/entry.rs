//! Per-skill configuration entries and the map that holds them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default effective maximum level.
pub const DEFAULT_CAP: i32 = 250;

/// Default bonus-factor ceiling in hundredths (100 = factor 1.0).
pub const DEFAULT_BONUS_CAP: i32 = 100;

pub const DEFAULT_GROWTH_EXPONENT: f32 = 1.5;
pub const DEFAULT_GROWTH_MULTIPLIER: f32 = 0.5;
pub const DEFAULT_GROWTH_CONSTANT: f32 = 0.5;

/// Skill key to entry. Ordered by key so serialization is deterministic.
pub type ConfigurationMap = BTreeMap<String, SkillConfigEntry>;

/// Configuration of one progression track.
///
/// Values are kept exactly as written in the file. Out-of-range values are
/// handled where they are consumed, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SkillConfigEntry {
    /// Effective maximum level
    pub cap: i32,
    /// Ceiling for the derived bonus factor, in hundredths
    pub bonus_cap: i32,
    /// Scale progress against `cap` (true) or against the fixed baseline of 100
    pub relative: bool,
    /// Use the growth parameters below instead of the baseline curve
    pub use_custom_growth_curve: bool,
    pub growth_exponent: f32,
    pub growth_multiplier: f32,
    pub growth_constant: f32,
}

impl Default for SkillConfigEntry {
    fn default() -> Self {
        Self {
            cap: DEFAULT_CAP,
            bonus_cap: DEFAULT_BONUS_CAP,
            relative: true,
            use_custom_growth_curve: false,
            growth_exponent: DEFAULT_GROWTH_EXPONENT,
            growth_multiplier: DEFAULT_GROWTH_MULTIPLIER,
            growth_constant: DEFAULT_GROWTH_CONSTANT,
        }
    }
}

impl SkillConfigEntry {
    /// Entry with the given cap and every other field at its default.
    ///
    /// This is how a legacy `key: <int>` line is upconverted.
    pub fn with_cap(cap: i32) -> Self {
        Self { cap, ..Self::default() }
    }

    /// Entry with the given cap and bonus cap, other fields at defaults.
    pub fn with_caps(cap: i32, bonus_cap: i32) -> Self {
        Self { cap, bonus_cap, ..Self::default() }
    }
}
