//! Analog-voltage engine for rock and pop.
//!
//! Zones behave like physical quantities rather than envelopes: bass heats a
//! filament, low-mids charge a capacitor, and mid pushes a damped spring that
//! carries the mover. Treble is ignored.

use serde::Serialize;

use super::{compress, snap, EngineDebug, EngineInput, EngineOutput, GenreEngine};
use crate::config::RockTuning;
use crate::envelope::{gate, smoothing_alpha};
use crate::frame::{EngineTag, ZoneIntensities};

const GLOW_EXPONENT: f32 = 1.3;
const KNEE: f32 = 0.85;
const KNEE_RATIO: f32 = 0.4;
const ZERO_SNAP: f32 = 0.01;
/// Longest step fed to the spring, in seconds, so a stalled host cannot
/// destabilise the integration.
const MAX_SPRING_STEP_S: f32 = 0.05;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RockDebug {
    pub temperature: f32,
    pub voltage: f32,
    pub spring_position: f32,
    pub spring_velocity: f32,
}

#[derive(Debug, Clone)]
pub struct RockEngine {
    tuning: RockTuning,
    temperature: f32,
    voltage: f32,
    position: f32,
    velocity: f32,
}

impl RockEngine {
    pub fn new(tuning: RockTuning) -> Self {
        Self {
            tuning,
            temperature: 0.0,
            voltage: 0.0,
            position: 0.0,
            velocity: 0.0,
        }
    }

    fn heat(&mut self, drive: f32, delta_ms: f32) {
        let tau = if drive > self.temperature {
            self.tuning.heat_ms
        } else {
            self.tuning.cool_ms
        };
        self.temperature += (drive - self.temperature) * smoothing_alpha(delta_ms, tau);
    }

    fn charge(&mut self, drive: f32, delta_ms: f32) {
        let tau = if drive > self.voltage {
            self.tuning.charge_ms
        } else {
            self.tuning.discharge_ms
        };
        self.voltage += (drive - self.voltage) * smoothing_alpha(delta_ms, tau);
    }

    /// Semi-implicit Euler over a damped mass-spring pulled toward `force`.
    fn push(&mut self, force: f32, delta_ms: f32) {
        let mut remaining = (delta_ms / 1000.0).max(0.0);
        while remaining > 0.0 {
            let dt = remaining.min(MAX_SPRING_STEP_S);
            let accel = self.tuning.spring_stiffness * (force - self.position)
                - self.tuning.spring_damping * self.velocity;
            self.velocity += accel * dt;
            self.position += self.velocity * dt;
            if !(0.0..=1.0).contains(&self.position) {
                self.position = self.position.clamp(0.0, 1.0);
                self.velocity = 0.0;
            }
            remaining -= dt;
        }
    }

    fn debug(&self) -> EngineDebug {
        EngineDebug::Rock(RockDebug {
            temperature: self.temperature,
            voltage: self.voltage,
            spring_position: self.position,
            spring_velocity: self.velocity,
        })
    }
}

impl Default for RockEngine {
    fn default() -> Self {
        Self::new(RockTuning::default())
    }
}

impl GenreEngine for RockEngine {
    fn tag(&self) -> EngineTag {
        EngineTag::Rock
    }

    fn apply(&mut self, input: &EngineInput<'_>) -> EngineOutput {
        let audio = input.audio;
        if audio.is_silent() {
            self.reset();
            return EngineOutput::dark(self.debug());
        }

        let threshold = input.modifiers.threshold;
        let delta_ms = input.delta_ms;
        let tuning = &self.tuning;

        let filament =
            (gate(audio.bass, tuning.front_gate * threshold) * tuning.front_gain).min(1.0);
        let low_mid = (audio.bass + audio.mid) * 0.5;
        let capacitor =
            (gate(low_mid, tuning.back_gate * threshold) * tuning.back_gain).min(1.0);
        let force = (audio.mid * tuning.mover_drive).min(1.0);

        self.heat(filament, delta_ms);
        self.charge(capacitor, delta_ms);
        self.push(force, delta_ms);

        let front = snap(
            compress(self.temperature.max(0.0).powf(GLOW_EXPONENT), KNEE, KNEE_RATIO),
            ZERO_SNAP,
        );
        let back = snap(compress(self.voltage, KNEE, KNEE_RATIO), ZERO_SNAP);
        let mover = snap(self.position, ZERO_SNAP);

        EngineOutput {
            zones: Some(ZoneIntensities::new(front, back, mover)),
            ..EngineOutput::new(self.debug())
        }
    }

    fn reset(&mut self) {
        self.temperature = 0.0;
        self.voltage = 0.0;
        self.position = 0.0;
        self.velocity = 0.0;
    }
}
