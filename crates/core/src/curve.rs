//! Growth curve and level/factor arithmetic.
//!
//! Everything here is pure and deterministic. No function divides by a value
//! that can be zero, and NaN inputs collapse to 0.

use crate::entry::{DEFAULT_GROWTH_CONSTANT, DEFAULT_GROWTH_EXPONENT, DEFAULT_GROWTH_MULTIPLIER, SkillConfigEntry};

/// Level denominator used by the unmodified host.
pub const VANILLA_LEVEL_BASE: f32 = 100.0;

/// Parameters selecting and shaping the per-level threshold curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveParams {
    pub use_custom: bool,
    pub exponent: f32,
    pub multiplier: f32,
    pub constant: f32,
}

impl Default for CurveParams {
    fn default() -> Self {
        Self::baseline()
    }
}

impl CurveParams {
    /// The fixed baseline curve.
    pub fn baseline() -> Self {
        Self {
            use_custom: false,
            exponent: DEFAULT_GROWTH_EXPONENT,
            multiplier: DEFAULT_GROWTH_MULTIPLIER,
            constant: DEFAULT_GROWTH_CONSTANT,
        }
    }

    /// Custom curve `multiplier * (level + constant)^exponent`.
    pub fn custom(exponent: f32, multiplier: f32, constant: f32) -> Self {
        Self { use_custom: true, exponent, multiplier, constant }
    }
}

impl From<&SkillConfigEntry> for CurveParams {
    fn from(entry: &SkillConfigEntry) -> Self {
        Self {
            use_custom: entry.use_custom_growth_curve,
            exponent: entry.growth_exponent,
            multiplier: entry.growth_multiplier,
            constant: entry.growth_constant,
        }
    }
}

/// Baseline threshold: `floor(level + 1)^1.5 * 0.5 + 0.5`, negative levels read as 0.
pub fn baseline_threshold(current_level: f32) -> f32 {
    (current_level.max(0.0) + 1.0).floor().powf(1.5) * 0.5 + 0.5
}

/// Raw custom threshold. May be zero, negative or NaN for a bad curve.
pub fn custom_threshold(current_level: f32, params: &CurveParams) -> f32 {
    params.multiplier * (current_level + params.constant).powf(params.exponent)
}

/// Accumulated progress required to advance one level from `current_level`.
///
/// A custom curve that yields a non-finite or non-positive threshold is
/// replaced by the baseline curve.
pub fn next_level_threshold(current_level: f32, params: &CurveParams) -> f32 {
    if params.use_custom {
        let custom = custom_threshold(current_level, params);
        if custom.is_finite() && custom > 0.0 {
            return custom;
        }
        tracing::debug!(
            current_level,
            exponent = params.exponent,
            multiplier = params.multiplier,
            constant = params.constant,
            "custom growth curve produced invalid threshold {custom}, using baseline"
        );
    }
    baseline_threshold(current_level)
}

/// Fraction of the current level already accumulated, in `[0, 1]`.
///
/// Returns exactly 0 once `current_level` has reached `cap`.
pub fn level_progress_fraction(accumulated_progress: f32, current_level: f32, cap: i32, params: &CurveParams) -> f32 {
    if current_level.is_nan() || current_level >= cap as f32 {
        return 0.0;
    }
    let threshold = next_level_threshold(current_level, params);
    if !threshold.is_finite() || threshold <= 0.0 {
        return 0.0;
    }
    clamp01(accumulated_progress / threshold)
}

/// Clamp into `[0, 1]`, mapping NaN to 0.
pub fn clamp01(value: f32) -> f32 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

/// Multiplicative skill factor, bounded by `bonus_cap / 100`.
///
/// Relative scaling measures `level` against the track's own cap (100 when the
/// cap is not positive); absolute scaling measures it against the vanilla 100.
pub fn skill_factor(level: f32, cap: i32, bonus_cap: i32, relative: bool) -> f32 {
    let max_factor = bonus_cap.max(1) as f32 / 100.0;
    let factor = if relative {
        let cap = if cap > 0 { cap as f32 } else { VANILLA_LEVEL_BASE };
        level / cap * max_factor
    } else {
        level / VANILLA_LEVEL_BASE
    };
    if factor.is_nan() { 0.0 } else { factor.clamp(0.0, max_factor) }
}

/// Keep a level inside `[0, cap]`.
pub fn clamp_level(level: f32, cap: i32) -> f32 {
    let upper = cap.max(0) as f32;
    if level.is_nan() { 0.0 } else { level.clamp(0.0, upper) }
}

/// Add `delta` levels and clamp the result to the cap.
pub fn raise_level(level: f32, delta: f32, cap: i32) -> f32 {
    clamp_level(level + delta, cap)
}

/// Map a vanilla 0..100 level linearly onto 0..cap.
pub fn scale_vanilla_to_cap(level: f32, cap: i32) -> f32 {
    if cap <= 0 {
        return 0.0;
    }
    clamp01(level / VANILLA_LEVEL_BASE) * cap as f32
}

/// Upper bound of a level bar that also shows a temporary buff.
pub fn ui_max_with_buff(cap: i32, buff: f32) -> f32 {
    let buff = if buff.is_nan() { 0.0 } else { buff.max(0.0) };
    (cap as f32 + buff).max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_baseline_threshold_values() {
        assert!(approx(baseline_threshold(0.0), 1.0));
        assert!(approx(baseline_threshold(3.0), 4.5));
        // fractional levels floor before the power
        assert_eq!(baseline_threshold(3.2), baseline_threshold(3.9));
    }

    #[test]
    fn test_baseline_threshold_below_zero_level() {
        assert_eq!(baseline_threshold(-5.0), baseline_threshold(0.0));
        assert_eq!(baseline_threshold(f32::NEG_INFINITY), 1.0);
        assert!(next_level_threshold(-3.5, &CurveParams::baseline()).is_finite());
        assert_eq!(next_level_threshold(-3.5, &CurveParams::custom(1.5, 1.0, 0.0)), 1.0);
    }

    #[test]
    fn test_custom_threshold_used_when_enabled() {
        let params = CurveParams::custom(2.0, 1.0, 0.0);
        assert!(approx(next_level_threshold(10.0, &params), 100.0));
        assert!(approx(next_level_threshold(10.0, &CurveParams::baseline()), baseline_threshold(10.0)));
    }

    #[test]
    fn test_disabled_custom_params_are_ignored() {
        let params = CurveParams { use_custom: false, exponent: 3.0, multiplier: 9.0, constant: 4.0 };
        assert_eq!(next_level_threshold(5.0, &params), baseline_threshold(5.0));
    }

    #[test]
    fn test_invalid_custom_curve_falls_back_to_baseline() {
        let zero = CurveParams::custom(1.0, 0.0, 0.0);
        assert_eq!(next_level_threshold(7.0, &zero), baseline_threshold(7.0));

        let negative = CurveParams::custom(1.0, -2.0, 1.0);
        assert_eq!(next_level_threshold(7.0, &negative), baseline_threshold(7.0));

        // negative base with fractional exponent is NaN
        let nan = CurveParams::custom(1.5, 1.0, -50.0);
        assert_eq!(next_level_threshold(7.0, &nan), baseline_threshold(7.0));
    }

    #[test]
    fn test_progress_is_zero_at_or_above_cap() {
        let params = CurveParams::baseline();
        assert_eq!(level_progress_fraction(5.0, 250.0, 250, &params), 0.0);
        assert_eq!(level_progress_fraction(5.0, 300.0, 250, &params), 0.0);
        assert_eq!(level_progress_fraction(-5.0, 250.0, 250, &params), 0.0);
        assert_eq!(level_progress_fraction(f32::NAN, 250.0, 250, &params), 0.0);
        assert_eq!(level_progress_fraction(f32::INFINITY, 250.0, 250, &params), 0.0);
    }

    #[test]
    fn test_progress_is_clamped() {
        let params = CurveParams::baseline();
        assert_eq!(level_progress_fraction(-3.0, 10.0, 250, &params), 0.0);
        assert_eq!(level_progress_fraction(1.0e9, 10.0, 250, &params), 1.0);
        assert_eq!(level_progress_fraction(f32::NAN, 10.0, 250, &params), 0.0);

        let half = baseline_threshold(10.0) / 2.0;
        assert!(approx(level_progress_fraction(half, 10.0, 250, &params), 0.5));
    }

    #[test]
    fn test_progress_with_nan_level_is_zero() {
        let params = CurveParams::baseline();
        assert_eq!(level_progress_fraction(1.0, f32::NAN, 250, &params), 0.0);
    }

    #[test]
    fn test_skill_factor_relative() {
        assert!(approx(skill_factor(125.0, 250, 100, true), 0.5));
        assert!(approx(skill_factor(250.0, 250, 150, true), 1.5));
        // cap <= 0 measures against 100
        assert!(approx(skill_factor(50.0, 0, 100, true), 0.5));
    }

    #[test]
    fn test_skill_factor_absolute_is_clamped_to_bonus_cap() {
        assert!(approx(skill_factor(50.0, 250, 100, false), 0.5));
        assert!(approx(skill_factor(200.0, 250, 100, false), 1.0));
        assert!(approx(skill_factor(200.0, 250, 150, false), 1.5));
    }

    #[test]
    fn test_skill_factor_guards() {
        assert_eq!(skill_factor(-10.0, 250, 100, true), 0.0);
        assert_eq!(skill_factor(f32::NAN, 250, 100, true), 0.0);
        // bonus cap below 1 is treated as 1
        assert!(approx(skill_factor(1000.0, 250, 0, true), 0.01));
    }

    #[test]
    fn test_clamp_and_raise_level() {
        assert_eq!(clamp_level(300.0, 250), 250.0);
        assert_eq!(clamp_level(-1.0, 250), 0.0);
        assert_eq!(clamp_level(f32::NAN, 250), 0.0);
        assert_eq!(clamp_level(10.0, -5), 0.0);
        assert_eq!(raise_level(240.0, 20.0, 250), 250.0);
        assert_eq!(raise_level(10.0, -20.0, 250), 0.0);
        assert_eq!(raise_level(10.0, 5.0, 250), 15.0);
    }

    #[test]
    fn test_scale_vanilla_to_cap() {
        assert!(approx(scale_vanilla_to_cap(50.0, 300), 150.0));
        assert!(approx(scale_vanilla_to_cap(150.0, 300), 300.0));
        assert_eq!(scale_vanilla_to_cap(50.0, 0), 0.0);
    }

    #[test]
    fn test_ui_max_with_buff() {
        assert_eq!(ui_max_with_buff(250, 15.0), 265.0);
        assert_eq!(ui_max_with_buff(250, -15.0), 250.0);
        assert_eq!(ui_max_with_buff(0, 0.0), 1.0);
    }

    #[test]
    fn test_curve_params_from_entry() {
        let entry = SkillConfigEntry {
            use_custom_growth_curve: true,
            growth_exponent: 2.0,
            growth_multiplier: 3.0,
            growth_constant: 4.0,
            ..SkillConfigEntry::default()
        };
        assert_eq!(CurveParams::from(&entry), CurveParams::custom(2.0, 3.0, 4.0));
    }
}
