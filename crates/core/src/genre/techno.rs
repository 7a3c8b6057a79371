//! Punchy-strobe engine for techno and electro.

use serde::Serialize;

use super::{EffectFlags, EngineDebug, EngineInput, EngineOutput, GenreEngine};
use crate::color::boost_lightness;
use crate::config::TechnoTuning;
use crate::envelope::{gate, HysteresisConfig, HysteresisGate};
use crate::frame::{AudioFrame, ColorPalette, EngineTag, Hsl, MoverSplit, ZoneIntensities};
use crate::timeline::OneShot;

const MOVER_KEY: &str = "mover";
const MOVER_MARGIN: f32 = 0.06;
/// Bass/treble ratio above which a treble peak is treated as a kick, not a hat.
const MAX_DROP_RATIO: f32 = 2.0;
const FRONT_GAIN: f32 = 1.8;
const BACK_EXPONENT: f32 = 0.9;
const MOVER_EXPONENT: f32 = 1.2;
const LEFT_TREBLE_BLEED: f32 = 0.3;
const RIGHT_MID_BLEED: f32 = 0.2;
const ATMOSPHERE: f32 = 0.3;
const DUCKING_DEPTH: f32 = 0.6;
const NOISE_FLATNESS: f32 = 0.7;
const NOISE_TRIGGER_SCALE: f32 = 0.8;
const ACID_HARSHNESS: f32 = 0.6;
/// Largest lightness boost, in percent, applied to the primary on a peak.
const PRIMARY_BOOST: f32 = 20.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TechnoDebug {
    pub silent: bool,
    pub front_gate_open: bool,
    pub recovering: bool,
    pub snare: f32,
    pub apocalypse: bool,
    pub ducking: f32,
    pub acid: bool,
    pub color_strobe: bool,
    pub mover_on: bool,
}

#[derive(Debug, Clone)]
pub struct TechnoEngine {
    tuning: TechnoTuning,
    front_open: bool,
    last_silence_ms: Option<f64>,
    mover_gate: HysteresisGate,
    strobe: OneShot,
}

impl TechnoEngine {
    pub fn new(tuning: TechnoTuning) -> Self {
        let mover_gate = HysteresisGate::new(HysteresisConfig::with_margin(0.15, MOVER_MARGIN));
        Self {
            tuning,
            front_open: false,
            last_silence_ms: None,
            mover_gate,
            strobe: OneShot::default(),
        }
    }

    pub fn tuning(&self) -> &TechnoTuning {
        &self.tuning
    }

    /// Strobe accent on the colour path: a treble peak that is not riding
    /// on a much louder kick.
    fn color_strobe(&self, audio: &AudioFrame, threshold: f32) -> bool {
        let drop_ratio = audio.bass / audio.treble.max(0.01);
        audio.treble > self.tuning.strobe_threshold * threshold && drop_ratio < MAX_DROP_RATIO
    }

    fn recolor(&self, input: &EngineInput<'_>, strobe: bool, acid: bool) -> Option<ColorPalette> {
        if !strobe && !acid {
            return None;
        }

        let mut palette = *input.palette;
        let brightness = input.modifiers.brightness;
        if strobe {
            let threshold = self.tuning.strobe_threshold * input.modifiers.threshold;
            let excess = gate(input.audio.treble, threshold);
            palette.accent = Hsl::from_degrees(300.0, 100.0, (85.0 * brightness).min(100.0));
            palette.primary = boost_lightness(palette.primary, excess * PRIMARY_BOOST * brightness);
        }
        if acid {
            palette.secondary = Hsl::from_degrees(100.0, 100.0, 50.0);
        }
        Some(palette)
    }

    fn front(&mut self, bass: f32, threshold: f32, recovering: bool) -> f32 {
        let (on, off) = if recovering {
            (self.tuning.recovery_gate_on, self.tuning.recovery_gate_off)
        } else {
            (self.tuning.front_gate_on, self.tuning.front_gate_off)
        };
        let on = (on * threshold).min(0.99);
        let off = (off * threshold).min(on);

        self.front_open = if self.front_open {
            bass >= off
        } else {
            bass >= on
        };

        if self.front_open {
            (gate(bass, off) * FRONT_GAIN).powi(2).min(1.0)
        } else {
            0.0
        }
    }
}

impl Default for TechnoEngine {
    fn default() -> Self {
        Self::new(TechnoTuning::default())
    }
}

impl GenreEngine for TechnoEngine {
    fn tag(&self) -> EngineTag {
        EngineTag::Techno
    }

    fn apply(&mut self, input: &EngineInput<'_>) -> EngineOutput {
        let audio = input.audio;
        let now = input.now_ms;

        if audio.is_silent() {
            self.last_silence_ms = Some(now);
            self.front_open = false;
            self.mover_gate.update(MOVER_KEY, 0.0);
            self.strobe.clear();
            let mut output = EngineOutput::dark(EngineDebug::Techno(TechnoDebug {
                silent: true,
                ..Default::default()
            }));
            output.zones = Some(ZoneIntensities::default().with_split(MoverSplit::default()));
            return output;
        }

        let threshold = input.modifiers.threshold;
        let tuning = &self.tuning;
        let flatness = audio.flatness();
        let harshness = audio.harshness();

        let recovering = self
            .last_silence_ms
            .map(|at| now - at < tuning.recovery_window_ms as f64)
            .unwrap_or(false);

        let snare = (audio.mid * audio.treble).sqrt();
        let mut back = (gate(snare, tuning.back_gate * threshold).powf(BACK_EXPONENT)
            * tuning.back_boost)
            .min(1.0);

        let left_signal = (audio.mid - LEFT_TREBLE_BLEED * audio.treble).max(0.0);
        let right_signal = (audio.treble - RIGHT_MID_BLEED * audio.mid).max(0.0);
        let atmosphere = flatness * ATMOSPHERE;
        let mut left = (gate(left_signal, tuning.mover_left_gate * threshold).powf(MOVER_EXPONENT)
            * tuning.mover_left_boost)
            .min(1.0)
            .max(atmosphere);
        let mut right = (gate(right_signal, tuning.mover_right_gate * threshold)
            .powf(MOVER_EXPONENT)
            * tuning.mover_right_boost)
            .min(1.0)
            .max(atmosphere);

        let vitamin = audio.treble * tuning.vitamin_boost;
        let strobe_trigger = tuning.strobe_trigger
            * threshold
            * if flatness > NOISE_FLATNESS {
                NOISE_TRIGGER_SCALE
            } else {
                1.0
            };
        let strobe_duration = tuning.strobe_duration_ms;

        let mut front = self.front(audio.bass, threshold, recovering);
        let mut mover = self.mover_gate.update(MOVER_KEY, vitamin);

        let apocalypse = harshness > 0.5 && flatness > 0.5;
        let mut ducking = 1.0;
        if apocalypse {
            let wall = audio.mid.max(audio.treble);
            front = front.max(wall);
            back = back.max(wall);
            mover = mover.max(wall);
            left = left.max(wall);
            right = right.max(wall);
        } else {
            let wall_of_sound =
                flatness > 0.6 || (audio.bass > 0.6 && audio.mid > 0.6 && audio.treble > 0.6);
            if wall_of_sound && front > 0.5 {
                ducking = 1.0 - front * DUCKING_DEPTH;
                back *= ducking;
                left *= ducking;
                right *= ducking;
            }
        }

        if audio.treble > strobe_trigger && self.strobe.trigger(now, strobe_duration) {
            tracing::debug!(treble = audio.treble, "techno strobe");
        }
        let color_strobe = self.color_strobe(audio, threshold);
        let acid = harshness > ACID_HARSHNESS;

        let zones = ZoneIntensities::new(front, back, mover).with_split(MoverSplit { left, right });

        EngineOutput {
            palette: self.recolor(input, color_strobe, acid),
            zones: Some(zones),
            flags: EffectFlags {
                strobe: color_strobe || self.strobe.is_running(now, strobe_duration),
                ..Default::default()
            },
            dimmer_override: None,
            force_movement: false,
            color_override: None,
            debug: EngineDebug::Techno(TechnoDebug {
                silent: false,
                front_gate_open: self.front_open,
                recovering,
                snare,
                apocalypse,
                ducking,
                acid,
                color_strobe,
                mover_on: self.mover_gate.is_on(MOVER_KEY),
            }),
        }
    }

    fn reset(&mut self) {
        self.front_open = false;
        self.last_silence_ms = None;
        self.mover_gate.reset();
        self.strobe.clear();
    }
}
