use serde::{Deserialize, Serialize};

use crate::{ReactorError, Result};

/// Top-level configuration injected into the dispatcher.
///
/// Every section falls back to its defaults when omitted, so a host can ship
/// a partial JSON document that only touches the knobs it cares about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactorConfig {
    /// Frame spacing assumed when an audio frame carries no delta.
    pub frame_interval_ms: f32,
    pub techno: TechnoTuning,
    pub latino: LatinoTuning,
    pub rock: RockTuning,
    pub chill: ChillTuning,
    pub fallback: FallbackTuning,
    pub palette: PaletteTuning,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 25.0,
            techno: TechnoTuning::default(),
            latino: LatinoTuning::default(),
            rock: RockTuning::default(),
            chill: ChillTuning::default(),
            fallback: FallbackTuning::default(),
            palette: PaletteTuning::default(),
        }
    }
}

impl ReactorConfig {
    pub fn live_defaults() -> Self {
        Self::default()
    }

    /// Parses and validates a JSON document.
    pub fn from_json_str(source: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rejects values that would break the engines' numeric assumptions.
    pub fn validate(&self) -> Result<()> {
        positive("frame_interval_ms", self.frame_interval_ms)?;

        let techno = &self.techno;
        unit("techno.strobe_threshold", techno.strobe_threshold)?;
        unit("techno.front_gate_on", techno.front_gate_on)?;
        unit("techno.front_gate_off", techno.front_gate_off)?;
        unit("techno.recovery_gate_on", techno.recovery_gate_on)?;
        unit("techno.recovery_gate_off", techno.recovery_gate_off)?;
        ordered(
            "techno.front_gate_off",
            techno.front_gate_off,
            techno.front_gate_on,
        )?;
        ordered(
            "techno.recovery_gate_off",
            techno.recovery_gate_off,
            techno.recovery_gate_on,
        )?;
        unit("techno.back_gate", techno.back_gate)?;
        unit("techno.mover_left_gate", techno.mover_left_gate)?;
        unit("techno.mover_right_gate", techno.mover_right_gate)?;
        unit("techno.strobe_trigger", techno.strobe_trigger)?;
        positive("techno.vitamin_boost", techno.vitamin_boost)?;
        positive("techno.strobe_duration_ms", techno.strobe_duration_ms)?;
        techno.ceilings.validate("techno.ceilings")?;

        let latino = &self.latino;
        unit("latino.kick_threshold", latino.kick_threshold)?;
        unit("latino.front_gate", latino.front_gate)?;
        unit("latino.back_gate", latino.back_gate)?;
        unit("latino.mover_gate", latino.mover_gate)?;
        unit("latino.treble_rejection", latino.treble_rejection)?;
        unit("latino.blackout_drop", latino.blackout_drop)?;
        unit("latino.blackout_min_previous", latino.blackout_min_previous)?;
        positive("latino.front_gain", latino.front_gain)?;
        positive("latino.back_gain", latino.back_gain)?;
        positive("latino.mover_gain", latino.mover_gain)?;
        positive("latino.blackout_window_ms", latino.blackout_window_ms)?;
        latino.ceilings.validate("latino.ceilings")?;

        let rock = &self.rock;
        unit("rock.front_gate", rock.front_gate)?;
        unit("rock.back_gate", rock.back_gate)?;
        positive("rock.front_gain", rock.front_gain)?;
        positive("rock.back_gain", rock.back_gain)?;
        positive("rock.heat_ms", rock.heat_ms)?;
        positive("rock.cool_ms", rock.cool_ms)?;
        positive("rock.charge_ms", rock.charge_ms)?;
        positive("rock.discharge_ms", rock.discharge_ms)?;
        positive("rock.spring_stiffness", rock.spring_stiffness)?;
        positive("rock.spring_damping", rock.spring_damping)?;
        rock.ceilings.validate("rock.ceilings")?;

        let chill = &self.chill;
        positive("chill.cycle_minutes", chill.cycle_minutes)?;
        unit("chill.inertia", chill.inertia)?;
        unit("chill.dimmer", chill.dimmer)?;
        unit("chill.lightness_floor", chill.lightness_floor)?;
        if !(0.0..=10_000.0).contains(&chill.start_depth) {
            return Err(ReactorError::invalid(
                "chill.start_depth",
                "must lie within 0..=10000 meters",
            ));
        }
        chill.ceilings.validate("chill.ceilings")?;

        let fallback = &self.fallback;
        unit("fallback.back_gate", fallback.back_gate)?;
        unit("fallback.front_cap", fallback.front_cap)?;
        unit("fallback.back_cap", fallback.back_cap)?;
        positive("fallback.front_exponent", fallback.front_exponent)?;
        positive("fallback.back_exponent", fallback.back_exponent)?;
        positive("fallback.mover_exponent", fallback.mover_exponent)?;
        if !(1..=10).contains(&fallback.decay_speed) {
            return Err(ReactorError::invalid(
                "fallback.decay_speed",
                "must lie within 1..=10",
            ));
        }

        let palette = &self.palette;
        unit("palette.creativity", palette.creativity)?;
        positive("palette.transition_ms", palette.transition_ms)?;
        non_negative("palette.saturation", palette.saturation)?;
        non_negative("palette.intensity", palette.intensity)?;

        Ok(())
    }
}

/// Per-engine caps applied when an engine's zone values win the frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorityCeilings {
    pub front: f32,
    pub back: f32,
    pub mover: f32,
}

impl Default for AuthorityCeilings {
    fn default() -> Self {
        Self {
            front: 0.95,
            back: 0.95,
            mover: 1.0,
        }
    }
}

impl AuthorityCeilings {
    pub fn open() -> Self {
        Self {
            front: 1.0,
            back: 1.0,
            mover: 1.0,
        }
    }

    fn validate(&self, field: &'static str) -> Result<()> {
        for value in [self.front, self.back, self.mover] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ReactorError::invalid(field, "ceilings must lie within 0..=1"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnoTuning {
    /// Treble level that fires the accent strobe on the colour path.
    pub strobe_threshold: f32,
    pub front_gate_on: f32,
    pub front_gate_off: f32,
    /// Stricter front gate used right after a silence.
    pub recovery_gate_on: f32,
    pub recovery_gate_off: f32,
    pub recovery_window_ms: f32,
    pub back_gate: f32,
    pub back_boost: f32,
    pub mover_left_gate: f32,
    pub mover_left_boost: f32,
    pub mover_right_gate: f32,
    pub mover_right_boost: f32,
    /// Treble gain compensating for lossy-codec high-end loss.
    pub vitamin_boost: f32,
    pub strobe_trigger: f32,
    pub strobe_duration_ms: f32,
    pub ceilings: AuthorityCeilings,
}

impl Default for TechnoTuning {
    fn default() -> Self {
        Self {
            strobe_threshold: 0.6,
            front_gate_on: 0.48,
            front_gate_off: 0.35,
            recovery_gate_on: 0.80,
            recovery_gate_off: 0.60,
            recovery_window_ms: 2000.0,
            back_gate: 0.30,
            back_boost: 5.0,
            mover_left_gate: 0.20,
            mover_left_boost: 4.0,
            mover_right_gate: 0.14,
            mover_right_boost: 10.0,
            vitamin_boost: 2.2,
            strobe_trigger: 0.80,
            strobe_duration_ms: 30.0,
            ceilings: AuthorityCeilings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatinoTuning {
    pub kick_threshold: f32,
    /// Minimum frame-to-frame bass rise that counts as a kick.
    pub kick_rise: f32,
    pub front_gate: f32,
    pub front_gain: f32,
    pub front_decay: f32,
    pub back_gate: f32,
    pub back_gain: f32,
    pub back_decay: f32,
    pub mover_gate: f32,
    pub mover_gain: f32,
    pub treble_rejection: f32,
    pub blackout_frames: u32,
    pub blackout_drop: f32,
    pub blackout_window_ms: f32,
    pub blackout_min_previous: f32,
    pub ceilings: AuthorityCeilings,
}

impl Default for LatinoTuning {
    fn default() -> Self {
        Self {
            kick_threshold: 0.55,
            kick_rise: 0.08,
            front_gate: 0.55,
            front_gain: 1.7,
            front_decay: 0.12,
            back_gate: 0.22,
            back_gain: 1.9,
            back_decay: 0.25,
            mover_gate: 0.22,
            mover_gain: 1.5,
            treble_rejection: 0.30,
            blackout_frames: 3,
            blackout_drop: 0.4,
            blackout_window_ms: 100.0,
            blackout_min_previous: 0.6,
            ceilings: AuthorityCeilings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RockTuning {
    pub front_gate: f32,
    pub front_gain: f32,
    pub back_gate: f32,
    pub back_gain: f32,
    pub heat_ms: f32,
    pub cool_ms: f32,
    pub charge_ms: f32,
    pub discharge_ms: f32,
    pub mover_drive: f32,
    pub spring_stiffness: f32,
    pub spring_damping: f32,
    pub ceilings: AuthorityCeilings,
}

impl Default for RockTuning {
    fn default() -> Self {
        Self {
            front_gate: 0.15,
            front_gain: 2.2,
            back_gate: 0.08,
            back_gain: 1.8,
            heat_ms: 35.0,
            cool_ms: 160.0,
            charge_ms: 60.0,
            discharge_ms: 420.0,
            mover_drive: 1.3,
            spring_stiffness: 60.0,
            spring_damping: 11.0,
            ceilings: AuthorityCeilings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChillTuning {
    pub cycle_minutes: f32,
    /// Share of the previous depth kept on every update.
    pub inertia: f32,
    pub start_depth: f32,
    pub dimmer: f32,
    pub lightness_floor: f32,
    pub ceilings: AuthorityCeilings,
}

impl Default for ChillTuning {
    fn default() -> Self {
        Self {
            cycle_minutes: 20.0,
            inertia: 0.99,
            start_depth: 500.0,
            dimmer: 0.75,
            lightness_floor: 0.10,
            ceilings: AuthorityCeilings::open(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackTuning {
    pub front_exponent: f32,
    pub front_cap: f32,
    pub back_exponent: f32,
    pub back_gain: f32,
    pub back_gate: f32,
    pub back_cap: f32,
    pub mover_exponent: f32,
    pub mover_gain: f32,
    /// 1 cuts fastest, 10 is the most liquid decay.
    pub decay_speed: u8,
}

impl Default for FallbackTuning {
    fn default() -> Self {
        Self {
            front_exponent: 1.2,
            front_cap: 0.95,
            back_exponent: 1.5,
            back_gain: 1.8,
            back_gate: 0.06,
            back_cap: 0.95,
            mover_exponent: 2.0,
            mover_gain: 1.8,
            decay_speed: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteTuning {
    pub creativity: f32,
    pub transition_ms: f32,
    /// Global multiplier on generated saturation.
    pub saturation: f32,
    /// Global multiplier on generated lightness.
    pub intensity: f32,
}

impl Default for PaletteTuning {
    fn default() -> Self {
        Self {
            creativity: 0.7,
            transition_ms: 500.0,
            saturation: 1.0,
            intensity: 1.0,
        }
    }
}

fn unit(field: &'static str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ReactorError::invalid(field, format!("{value} is outside 0..=1")))
    }
}

fn positive(field: &'static str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ReactorError::invalid(field, format!("{value} must be positive")))
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ReactorError::invalid(field, format!("{value} must not be negative")))
    }
}

fn ordered(field: &'static str, low: f32, high: f32) -> Result<()> {
    if low < high {
        Ok(())
    } else {
        Err(ReactorError::invalid(
            field,
            format!("deactivation {low} must sit below activation {high}"),
        ))
    }
}
