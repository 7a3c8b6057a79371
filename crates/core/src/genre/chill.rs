//! Ambient-depth engine for chill, lounge and ambient styles.
//!
//! A virtual diver sinks and rises through 10 000 m of water on a slow tide.
//! Depth picks the colour and how lively the movers are; front and back
//! breathe on free-running oscillators instead of following the audio.

use std::f64::consts::TAU;

use serde::Serialize;

use super::{EffectFlags, EngineDebug, EngineInput, EngineOutput, GenreEngine};
use crate::color::{lerp_hue, wrap_hue};
use crate::config::ChillTuning;
use crate::frame::{ColorPalette, EngineTag, Hsl, ZoneIntensities};

pub const MAX_DEPTH: f32 = 10_000.0;
const CENTROID_NEUTRAL_HZ: f32 = 1200.0;
const BUOYANCY_PER_HZ: f32 = 0.4;
const BUOYANCY_LIMIT: f32 = 1500.0;
const HUE_DRIFT_DEG: f32 = 5.0;
const HUE_DRIFT_PERIOD: f64 = 20_000.0;
const ULTRA_AIR_BASE: f32 = 0.6;
const ULTRA_AIR_DEPTH_GAIN: f32 = 0.3;
const MOVER_ENERGY_GAIN: f32 = 0.2;

/// Depth band with its colour and motion character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthBand {
    Shallows,
    Ocean,
    Twilight,
    Midnight,
}

struct BandProfile {
    top: f32,
    bottom: f32,
    hue_from: f32,
    hue_to: f32,
    light_from: f32,
    light_to: f32,
    speed: f32,
    mover: f32,
}

impl DepthBand {
    pub fn for_depth(depth: f32) -> Self {
        match depth {
            d if d < 1000.0 => DepthBand::Shallows,
            d if d < 3000.0 => DepthBand::Ocean,
            d if d < 6000.0 => DepthBand::Twilight,
            _ => DepthBand::Midnight,
        }
    }

    fn profile(self) -> BandProfile {
        match self {
            DepthBand::Shallows => BandProfile {
                top: 0.0,
                bottom: 1000.0,
                hue_from: 175.0,
                hue_to: 210.0,
                light_from: 0.55,
                light_to: 0.45,
                speed: 1.0,
                mover: 0.5,
            },
            DepthBand::Ocean => BandProfile {
                top: 1000.0,
                bottom: 3000.0,
                hue_from: 210.0,
                hue_to: 245.0,
                light_from: 0.45,
                light_to: 0.35,
                speed: 0.8,
                mover: 0.4,
            },
            DepthBand::Twilight => BandProfile {
                top: 3000.0,
                bottom: 6000.0,
                hue_from: 245.0,
                hue_to: 285.0,
                light_from: 0.35,
                light_to: 0.22,
                speed: 0.6,
                mover: 0.25,
            },
            DepthBand::Midnight => BandProfile {
                top: 6000.0,
                bottom: MAX_DEPTH,
                hue_from: 285.0,
                hue_to: 300.0,
                light_from: 0.22,
                light_to: 0.12,
                speed: 0.4,
                mover: 0.15,
            },
        }
    }

    pub fn base_hue(self) -> f32 {
        self.profile().hue_from
    }

    pub fn speed(self) -> f32 {
        self.profile().speed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChillDebug {
    pub depth: f32,
    pub band: DepthBand,
    pub hue: f32,
    pub front_left: f32,
    pub front_right: f32,
    pub back_left: f32,
    pub back_right: f32,
    pub pan_left: f32,
    pub pan_right: f32,
    pub ultra_flash: bool,
}

#[derive(Debug, Clone)]
pub struct ChillEngine {
    tuning: ChillTuning,
    depth: f32,
    band: DepthBand,
}

impl ChillEngine {
    pub fn new(tuning: ChillTuning) -> Self {
        let depth = tuning.start_depth.clamp(0.0, MAX_DEPTH);
        Self {
            band: DepthBand::for_depth(depth),
            tuning,
            depth,
        }
    }

    pub fn depth(&self) -> f32 {
        self.depth
    }

    pub fn band(&self) -> DepthBand {
        self.band
    }

    /// Tide plus buoyancy, the depth the diver is drifting toward.
    fn target_depth(&self, now_ms: f64, centroid_hz: Option<f32>) -> f32 {
        let cycle_ms = self.tuning.cycle_minutes as f64 * 60_000.0;
        let phase = (now_ms / cycle_ms).rem_euclid(1.0);
        let tide = ((1.0 - (TAU * phase).cos()) / 2.0) as f32 * MAX_DEPTH;
        let buoyancy = centroid_hz
            .map(|hz| (-(hz - CENTROID_NEUTRAL_HZ) * BUOYANCY_PER_HZ).clamp(-BUOYANCY_LIMIT, BUOYANCY_LIMIT))
            .unwrap_or(0.0);
        (tide + buoyancy).clamp(0.0, MAX_DEPTH)
    }

    fn dive(&mut self, now_ms: f64, centroid_hz: Option<f32>) {
        let target = self.target_depth(now_ms, centroid_hz);
        let inertia = self.tuning.inertia;
        self.depth = (self.depth * inertia + target * (1.0 - inertia)).clamp(0.0, MAX_DEPTH);

        let band = DepthBand::for_depth(self.depth);
        if band != self.band {
            tracing::debug!(from = ?self.band, to = ?band, depth = self.depth, "chill depth band");
            self.band = band;
        }
    }

    /// Colour at the current depth, never darker than the lightness floor.
    fn water_color(&self, now_ms: f64) -> Hsl {
        let profile = self.band.profile();
        let span = (profile.bottom - profile.top).max(1.0);
        let t = ((self.depth - profile.top) / span).clamp(0.0, 1.0);

        let drift = ((now_ms / HUE_DRIFT_PERIOD).sin() as f32) * HUE_DRIFT_DEG;
        let hue = wrap_hue(lerp_hue(profile.hue_from, profile.hue_to, t) + drift);

        let mut lightness = profile.light_from + (profile.light_to - profile.light_from) * t;
        if self.band == DepthBand::Midnight {
            lightness = lightness.clamp(0.10, 0.30);
        }
        let lightness = lightness.max(self.tuning.lightness_floor);
        let saturation = 0.85 - self.depth / MAX_DEPTH * 0.25;

        Hsl::from_degrees(hue, saturation * 100.0, lightness * 100.0)
    }
}

impl Default for ChillEngine {
    fn default() -> Self {
        Self::new(ChillTuning::default())
    }
}

impl GenreEngine for ChillEngine {
    fn tag(&self) -> EngineTag {
        EngineTag::Chill
    }

    fn apply(&mut self, input: &EngineInput<'_>) -> EngineOutput {
        let audio = input.audio;
        let now = input.now_ms;
        self.dive(now, audio.centroid_hz);

        let color = self.water_color(now);
        let depth_ratio = self.depth / MAX_DEPTH;
        let pressure = 1.0 - depth_ratio * 0.5;
        let t = now;

        let osc_left = ((t / 3659.0).sin() + 0.25 * (t / 2069.0).sin()) as f32;
        let osc_right = ((t / 3023.0).cos() + 0.25 * (t / 2707.0).sin()) as f32;
        let breath = (0.35 + 0.3 * audio.energy) * pressure;
        let front_left = (0.5 + osc_left * breath).clamp(0.0, 1.0);
        let front_right = (0.5 + osc_right * breath).clamp(0.0, 1.0);
        let back_left = (0.4 + ((t / 4007.0 - 1.8).sin() as f32) * 0.35 * pressure).clamp(0.0, 1.0);
        let back_right =
            (0.4 + ((t / 3511.0 - 2.2).cos() as f32) * 0.35 * pressure).clamp(0.0, 1.0);

        let profile = self.band.profile();
        let sweep = ((t * profile.speed as f64 / 5003.0).sin() as f32) * 0.4 * pressure;
        let pan_left = 0.5 + sweep;
        let pan_right = 0.5 - sweep;

        let ultra_threshold = ULTRA_AIR_BASE - ULTRA_AIR_DEPTH_GAIN * depth_ratio;
        let ultra_flash = audio.ultra_air.map(|air| air > ultra_threshold).unwrap_or(false);
        let mover = if ultra_flash {
            1.0
        } else {
            (profile.mover + audio.energy * MOVER_ENERGY_GAIN).min(1.0)
        };

        let debug = EngineDebug::Chill(ChillDebug {
            depth: self.depth,
            band: self.band,
            hue: color.hue_degrees(),
            front_left,
            front_right,
            back_left,
            back_right,
            pan_left,
            pan_right,
            ultra_flash: ultra_flash && !audio.is_silent(),
        });

        let palette = Some(ColorPalette::from_base(color));
        if audio.is_silent() {
            return EngineOutput {
                palette,
                color_override: Some(color),
                ..EngineOutput::dark(debug)
            };
        }

        EngineOutput {
            palette,
            zones: Some(ZoneIntensities::new(
                (front_left + front_right) * 0.5,
                (back_left + back_right) * 0.5,
                mover,
            )),
            flags: EffectFlags {
                flash: ultra_flash,
                ..Default::default()
            },
            dimmer_override: Some(self.tuning.dimmer),
            force_movement: true,
            color_override: Some(color),
            debug,
        }
    }

    fn reset(&mut self) {
        *self = Self::new(self.tuning.clone());
    }
}
