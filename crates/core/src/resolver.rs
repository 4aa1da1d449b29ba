//! Cap and growth-curve lookups with precedence and fallbacks.
//!
//! Every lookup resolves the raw identifier through [`crate::names`] first, then
//! reads the published map if the current source mode allows it. Lookups never
//! touch the disk.

use crate::curve::{self, CurveParams};
use crate::entry::{ConfigurationMap, SkillConfigEntry};
use crate::names::{NameLookup, NoNames, Resolution, resolve_key};
use crate::state::{ResolutionState, SourceMode};
use std::sync::Arc;

/// Reads limits and curve parameters for skills out of a [`ResolutionState`].
#[derive(Clone)]
pub struct Resolver {
    state: Arc<ResolutionState>,
    names: Arc<dyn NameLookup>,
    fallback: SkillConfigEntry,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("state", &self.state)
            .field("fallback", &self.fallback)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    /// Resolver with the built-in fallback entry and no name lookup.
    pub fn new(state: Arc<ResolutionState>) -> Self {
        Self { state, names: Arc::new(NoNames), fallback: SkillConfigEntry::default() }
    }

    pub fn with_names(mut self, names: Arc<dyn NameLookup>) -> Self {
        self.names = names;
        self
    }

    /// Values returned for absent or invalid fields.
    pub fn with_fallback(mut self, fallback: SkillConfigEntry) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn state(&self) -> &Arc<ResolutionState> {
        &self.state
    }

    pub fn fallback(&self) -> &SkillConfigEntry {
        &self.fallback
    }

    /// Map a raw identifier to its configuration key.
    ///
    /// Emits a one-time warning per identifier when an extension skill has no
    /// matching key.
    pub fn resolve_key(&self, raw: &str) -> String {
        self.resolve_key_in(&self.state.entries(), raw)
    }

    fn resolve_key_in(&self, entries: &ConfigurationMap, raw: &str) -> String {
        let resolution = resolve_key(raw, |k| entries.contains_key(k), self.names.as_ref());
        if let Resolution::Unresolved(key) = &resolution
            && self.state.mark_warned(key)
        {
            tracing::warn!(
                skill = %key,
                "no configuration for extension skill {key}; add a '{key}' entry to the skill file to configure it"
            );
        }
        resolution.into_key()
    }

    /// The entry that applies to `raw`, if the source mode allows one.
    ///
    /// Key resolution and the value read use the same map snapshot.
    pub fn entry(&self, raw: &str) -> Option<SkillConfigEntry> {
        let applies = match self.state.source_mode() {
            SourceMode::Authoritative => true,
            SourceMode::Local => self.state.local_override_enabled(),
        };
        let entries = self.state.entries();
        let key = self.resolve_key_in(&entries, raw);
        if !applies {
            return None;
        }
        entries.get(&key).cloned()
    }

    /// Effective maximum level. Non-positive values fall back.
    pub fn get_cap(&self, raw: &str) -> i32 {
        self.cap_of(self.entry(raw).as_ref())
    }

    /// Bonus-factor ceiling in hundredths. Non-positive values fall back.
    pub fn get_bonus_cap(&self, raw: &str) -> i32 {
        self.bonus_cap_of(self.entry(raw).as_ref())
    }

    pub fn is_relative(&self, raw: &str) -> bool {
        self.entry(raw).map_or(self.fallback.relative, |e| e.relative)
    }

    pub fn use_custom_growth_curve(&self, raw: &str) -> bool {
        self.entry(raw)
            .map_or(self.fallback.use_custom_growth_curve, |e| e.use_custom_growth_curve)
    }

    pub fn get_growth_exponent(&self, raw: &str) -> f32 {
        finite_or(self.entry(raw).map(|e| e.growth_exponent), self.fallback.growth_exponent)
    }

    pub fn get_growth_multiplier(&self, raw: &str) -> f32 {
        finite_or(self.entry(raw).map(|e| e.growth_multiplier), self.fallback.growth_multiplier)
    }

    pub fn get_growth_constant(&self, raw: &str) -> f32 {
        finite_or(self.entry(raw).map(|e| e.growth_constant), self.fallback.growth_constant)
    }

    /// All curve parameters for `raw` in one lookup.
    pub fn curve_params(&self, raw: &str) -> CurveParams {
        self.curve_params_of(self.entry(raw).as_ref())
    }

    /// Threshold to advance one level of `raw` from `current_level`.
    pub fn next_level_threshold(&self, raw: &str, current_level: f32) -> f32 {
        curve::next_level_threshold(current_level, &self.curve_params(raw))
    }

    /// Progress fraction of `raw` at `current_level`, 0 once capped.
    pub fn level_progress_fraction(&self, raw: &str, accumulated_progress: f32, current_level: f32) -> f32 {
        let entry = self.entry(raw);
        curve::level_progress_fraction(
            accumulated_progress,
            current_level,
            self.cap_of(entry.as_ref()),
            &self.curve_params_of(entry.as_ref()),
        )
    }

    /// Skill factor of `raw` at `level`, bounded by its bonus cap.
    pub fn skill_factor(&self, raw: &str, level: f32) -> f32 {
        let entry = self.entry(raw);
        let relative = entry.as_ref().map_or(self.fallback.relative, |e| e.relative);
        curve::skill_factor(level, self.cap_of(entry.as_ref()), self.bonus_cap_of(entry.as_ref()), relative)
    }

    /// `level` clamped into `[0, cap]` for `raw`.
    pub fn clamp_level(&self, raw: &str, level: f32) -> f32 {
        curve::clamp_level(level, self.get_cap(raw))
    }

    fn cap_of(&self, entry: Option<&SkillConfigEntry>) -> i32 {
        entry
            .map(|e| e.cap)
            .filter(|cap| *cap > 0)
            .unwrap_or(self.fallback.cap)
    }

    fn bonus_cap_of(&self, entry: Option<&SkillConfigEntry>) -> i32 {
        entry
            .map(|e| e.bonus_cap)
            .filter(|bonus| *bonus > 0)
            .unwrap_or(self.fallback.bonus_cap)
    }

    fn curve_params_of(&self, entry: Option<&SkillConfigEntry>) -> CurveParams {
        match entry {
            Some(entry) => CurveParams {
                use_custom: entry.use_custom_growth_curve,
                exponent: finite_or(Some(entry.growth_exponent), self.fallback.growth_exponent),
                multiplier: finite_or(Some(entry.growth_multiplier), self.fallback.growth_multiplier),
                constant: finite_or(Some(entry.growth_constant), self.fallback.growth_constant),
            },
            None => CurveParams::from(&self.fallback),
        }
    }
}

fn finite_or(value: Option<f32>, fallback: f32) -> f32 {
    value.filter(|v| v.is_finite()).unwrap_or(fallback)
}
