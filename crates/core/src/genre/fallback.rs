//! Default envelope policy for styles no genre engine claims.
//!
//! Bass drives the front, mid the back, treble the movers, each through its
//! own curve and decay buffer. No special effects.

use serde::Serialize;

use super::{EngineDebug, EngineInput, EngineOutput, GenreEngine};
use crate::config::FallbackTuning;
use crate::envelope::{soft_knee, DecayBuffers, ZoneKind};
use crate::frame::{EngineTag, ZoneIntensities};

const FRONT_KEY: &str = "front";
const BACK_KEY: &str = "back";
const MOVER_KEY: &str = "mover";
const ZONE_SLOTS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FallbackDebug {
    pub front_target: f32,
    pub back_target: f32,
    pub mover_target: f32,
}

#[derive(Debug, Clone)]
pub struct FallbackEngine {
    tuning: FallbackTuning,
    buffers: DecayBuffers,
    last_targets: FallbackDebug,
}

impl FallbackEngine {
    pub fn new(tuning: FallbackTuning) -> Self {
        Self {
            tuning,
            buffers: DecayBuffers::with_capacity(ZONE_SLOTS),
            last_targets: FallbackDebug::default(),
        }
    }

    /// Generic curve: band energy raised to a fixed exponent, gated, then
    /// smoothed through the decay buffers.
    pub fn default_zones(&mut self, input: &EngineInput<'_>) -> ZoneIntensities {
        let audio = input.audio;
        if audio.is_silent() {
            self.buffers.reset();
            self.last_targets = FallbackDebug::default();
            return ZoneIntensities::default();
        }

        let tuning = &self.tuning;
        let brightness = input.modifiers.brightness;

        let front_target =
            (audio.bass.powf(tuning.front_exponent) * brightness).min(tuning.front_cap);
        let back_raw = audio.mid.powf(tuning.back_exponent) * tuning.back_gain;
        let back_target = if back_raw < tuning.back_gate * input.modifiers.threshold {
            0.0
        } else {
            soft_knee(back_raw).min(tuning.back_cap)
        };
        let mover_target = (audio.treble.powf(tuning.mover_exponent) * tuning.mover_gain).min(1.0);
        let speed = tuning.decay_speed;

        self.last_targets = FallbackDebug {
            front_target,
            back_target,
            mover_target,
        };

        ZoneIntensities::new(
            self.buffers.step(FRONT_KEY, front_target, speed, ZoneKind::Par),
            self.buffers.step(BACK_KEY, back_target, speed, ZoneKind::Par),
            self.buffers.step(MOVER_KEY, mover_target, speed, ZoneKind::Mover),
        )
    }

    /// Targets from the most recent [`FallbackEngine::default_zones`] call.
    pub fn debug(&self) -> EngineDebug {
        EngineDebug::Fallback(self.last_targets.clone())
    }
}

impl Default for FallbackEngine {
    fn default() -> Self {
        Self::new(FallbackTuning::default())
    }
}

impl GenreEngine for FallbackEngine {
    fn tag(&self) -> EngineTag {
        EngineTag::Fallback
    }

    /// Authors no zones; the dispatcher fills them from [`FallbackEngine::default_zones`].
    fn apply(&mut self, _input: &EngineInput<'_>) -> EngineOutput {
        EngineOutput::new(EngineDebug::None)
    }

    fn reset(&mut self) {
        self.buffers.reset();
        self.last_targets = FallbackDebug::default();
    }
}
