//! Stateless guards that keep external modulation inside safe ranges and let
//! raw signal energy veto it during climaxes.

use serde::{Deserialize, Serialize};

use crate::color::wrap_hue;
use crate::frame::Modifiers;

/// Energy above which the override takes over. The comparison is strict.
pub const ENERGY_OVERRIDE_THRESHOLD: f32 = 0.85;

pub const STROBE_RANGE: (f32, f32) = (0.3, 1.0);
pub const FLASH_RANGE: (f32, f32) = (0.3, 1.0);
pub const THRESHOLD_MOD_RANGE: (f32, f32) = (0.8, 1.2);
pub const SATURATION_MOD_RANGE: (f32, f32) = (0.8, 1.2);
pub const BRIGHTNESS_MOD_RANGE: (f32, f32) = (0.8, 1.2);

/// Suggested change to the physics response coming from upstream logic.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsModifier {
    pub strobe_intensity: Option<f32>,
    pub flash_intensity: Option<f32>,
    pub trigger_threshold_mod: Option<f32>,
    pub confidence: f32,
}

impl PhysicsModifier {
    /// Full strobe and flash, neutral threshold, total confidence.
    pub fn maximal() -> Self {
        Self {
            strobe_intensity: Some(1.0),
            flash_intensity: Some(1.0),
            trigger_threshold_mod: Some(1.0),
            confidence: 1.0,
        }
    }
}

/// Suggested colour adjustment coming from upstream logic.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorDecision {
    /// Hue in degrees.
    pub suggested_hue: Option<f32>,
    pub saturation_mod: Option<f32>,
    pub brightness_mod: Option<f32>,
    pub confidence: f32,
}

pub fn clamp_physics_modifier(modifier: PhysicsModifier) -> PhysicsModifier {
    PhysicsModifier {
        strobe_intensity: modifier.strobe_intensity.map(|v| clamp_range(v, STROBE_RANGE)),
        flash_intensity: modifier.flash_intensity.map(|v| clamp_range(v, FLASH_RANGE)),
        trigger_threshold_mod: modifier
            .trigger_threshold_mod
            .map(|v| clamp_range(v, THRESHOLD_MOD_RANGE)),
        confidence: clamp_range(modifier.confidence, (0.0, 1.0)),
    }
}

pub fn clamp_color_decision(decision: ColorDecision) -> ColorDecision {
    ColorDecision {
        suggested_hue: decision.suggested_hue.map(wrap_hue),
        saturation_mod: decision
            .saturation_mod
            .map(|v| clamp_range(v, SATURATION_MOD_RANGE)),
        brightness_mod: decision
            .brightness_mod
            .map(|v| clamp_range(v, BRIGHTNESS_MOD_RANGE)),
        confidence: clamp_range(decision.confidence, (0.0, 1.0)),
    }
}

/// Restricts host gain and sensitivity multipliers before any engine sees them.
pub fn clamp_modifiers(modifiers: Modifiers) -> Modifiers {
    Modifiers {
        brightness: clamp_range(modifiers.brightness, BRIGHTNESS_MOD_RANGE),
        threshold: clamp_range(modifiers.threshold, THRESHOLD_MOD_RANGE),
    }
}

pub fn is_override_active(energy: f32) -> bool {
    energy > ENERGY_OVERRIDE_THRESHOLD
}

/// Replaces any suggestion with [`PhysicsModifier::maximal`] while the
/// override is active; passes it through untouched otherwise.
pub fn apply_override(modifier: Option<PhysicsModifier>, energy: f32) -> Option<PhysicsModifier> {
    let modifier = modifier?;
    if is_override_active(energy) {
        Some(PhysicsModifier::maximal())
    } else {
        Some(modifier)
    }
}

/// Host modifiers with sensitivity neutralised and gain never below unity.
pub fn neutralize_modifiers(modifiers: Modifiers) -> Modifiers {
    Modifiers {
        brightness: modifiers.brightness.max(1.0),
        threshold: 1.0,
    }
}

/// NaN falls to the lower bound.
fn clamp_range(value: f32, (low, high): (f32, f32)) -> f32 {
    if value.is_nan() {
        low
    } else {
        value.clamp(low, high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_boundary_is_exclusive() {
        assert!(!is_override_active(0.85));
        assert!(is_override_active(0.850_001));
        assert!(!is_override_active(0.2));
        assert!(is_override_active(1.0));
    }

    #[test]
    fn active_override_ignores_suggestion() {
        let timid = PhysicsModifier {
            strobe_intensity: Some(0.3),
            flash_intensity: None,
            trigger_threshold_mod: Some(1.2),
            confidence: 0.1,
        };
        assert_eq!(
            apply_override(Some(timid), 0.9),
            Some(PhysicsModifier::maximal())
        );
        assert_eq!(apply_override(Some(timid), 0.5), Some(timid));
        assert_eq!(apply_override(None, 0.99), None);
    }

    #[test]
    fn physics_modifier_is_clamped() {
        let clamped = clamp_physics_modifier(PhysicsModifier {
            strobe_intensity: Some(0.0),
            flash_intensity: Some(4.0),
            trigger_threshold_mod: Some(0.1),
            confidence: 2.0,
        });
        assert_eq!(clamped.strobe_intensity, Some(0.3));
        assert_eq!(clamped.flash_intensity, Some(1.0));
        assert_eq!(clamped.trigger_threshold_mod, Some(0.8));
        assert_eq!(clamped.confidence, 1.0);
    }

    #[test]
    fn color_decision_wraps_hue() {
        let clamped = clamp_color_decision(ColorDecision {
            suggested_hue: Some(-90.0),
            saturation_mod: Some(3.0),
            brightness_mod: Some(f32::NAN),
            confidence: 0.5,
        });
        assert_eq!(clamped.suggested_hue, Some(270.0));
        assert_eq!(clamped.saturation_mod, Some(1.2));
        assert_eq!(clamped.brightness_mod, Some(0.8));
    }

    #[test]
    fn host_modifiers_are_bounded() {
        let clamped = clamp_modifiers(Modifiers {
            brightness: 3.0,
            threshold: 0.0,
        });
        assert_eq!(clamped.brightness, 1.2);
        assert_eq!(clamped.threshold, 0.8);
        assert_eq!(neutralize_modifiers(clamped).threshold, 1.0);
    }
}
