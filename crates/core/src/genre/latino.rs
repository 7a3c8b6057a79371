//! Bass-forward percussive engine for latin, reggae and cumbia styles.
//!
//! Front punches on the kick, back ticks on percussive treble, movers follow
//! the vocal mid with treble bleed rejected. Three state machines sit on top:
//! a kick-triggered solar flare, a forced blackout on a sudden energy cliff,
//! and a dip/flash sequence fired once per entry into a drop.

use serde::Serialize;

use super::{EffectFlags, EngineDebug, EngineInput, EngineOutput, GenreEngine};
use crate::color::boost_lightness;
use crate::config::LatinoTuning;
use crate::envelope::gate;
use crate::frame::{
    ColorPalette, EngineTag, Hsl, MoverSplit, ZoneIntensities, DROP_SECTION,
};

/// Upper edge of the back gate's normalisation span.
const BACK_SPAN_TOP: f32 = 0.30;
const BACK_ATTACK: f32 = 0.85;
const MOVER_ATTACK: f32 = 0.65;
const MOVER_DECAY: f32 = 0.60;
/// Level a held vocal settles at between syllables.
const MOVER_REST: f32 = 0.25;
const MOVER_CUTOFF: f32 = 0.05;
const FLARE_GAIN: f32 = 1.5;
const FLARE_DECAY: f32 = 0.75;
const FLARE_VISIBLE: f32 = 0.1;
/// Lightness boost, in percent, at full flare.
const FLARE_BOOST: f32 = 20.0;
const FLARE_PRIMARY_SHARE: f32 = 0.75;
const RESCUE_SATURATION: f32 = 0.30;
const DIP_FRAMES: u8 = 2;
const DIP_DIMMER: f32 = 0.30;

/// Phase of the drop flash sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashPhase {
    #[default]
    Idle,
    /// Dimmed frames left before the flash.
    Dip(u8),
    Flash,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatinoDebug {
    pub front: f32,
    pub back: f32,
    pub mover: f32,
    pub flare: f32,
    pub kick: bool,
    pub blackout_remaining: u32,
    pub flash_phase: FlashPhase,
}

#[derive(Debug, Clone)]
pub struct LatinoEngine {
    tuning: LatinoTuning,
    front: f32,
    back: f32,
    mover: f32,
    mover_right: f32,
    flare: f32,
    last_bass: f32,
    /// Energy seen on this engine's previous frame, with its timestamp.
    last_energy: Option<(f32, f64)>,
    blackout_remaining: u32,
    flash: FlashPhase,
    last_section: Option<String>,
}

impl LatinoEngine {
    pub fn new(tuning: LatinoTuning) -> Self {
        Self {
            tuning,
            front: 0.0,
            back: 0.0,
            mover: 0.0,
            mover_right: 0.0,
            flare: 0.0,
            last_bass: 0.0,
            last_energy: None,
            blackout_remaining: 0,
            flash: FlashPhase::Idle,
            last_section: None,
        }
    }

    pub fn flash_phase(&self) -> FlashPhase {
        self.flash
    }

    pub fn blackout_remaining(&self) -> u32 {
        self.blackout_remaining
    }

    /// Instant attack, linear decay.
    fn punch(previous: f32, target: f32, decay: f32) -> f32 {
        if target >= previous {
            target
        } else {
            (previous - decay).max(target)
        }
    }

    /// Mid-driven mover with a rest level that keeps held notes alive.
    fn vocal(previous: f32, target: f32, signal: f32, gate_level: f32) -> f32 {
        let next = if target > previous {
            previous + (target - previous) * MOVER_ATTACK
        } else {
            let engaged = signal >= gate_level * 0.5 && previous >= MOVER_REST;
            let floor = if engaged { MOVER_REST } else { 0.0 };
            (previous * MOVER_DECAY).max(target).max(floor)
        };
        if next < MOVER_CUTOFF {
            0.0
        } else {
            next.min(1.0)
        }
    }

    /// A cliff is measured against the frame's own previous energy when the
    /// host supplies one, otherwise against this engine's last sample, whose
    /// age then has to fit the window.
    fn detect_blackout(&self, input: &EngineInput<'_>) -> bool {
        let audio = input.audio;
        let (previous, elapsed_ms) = match (audio.previous_energy, self.last_energy) {
            (Some(previous), _) => (previous, input.delta_ms as f64),
            (None, Some((previous, at_ms))) => (previous, input.now_ms - at_ms),
            (None, None) => return false,
        };
        let tuning = &self.tuning;
        previous > tuning.blackout_min_previous
            && previous - audio.energy >= tuning.blackout_drop
            && (0.0..=tuning.blackout_window_ms as f64).contains(&elapsed_ms)
    }

    fn track_section(&mut self, section: Option<&str>) {
        let entering_drop =
            section == Some(DROP_SECTION) && self.last_section.as_deref() != Some(DROP_SECTION);
        if entering_drop {
            tracing::debug!("latino drop flash sequence");
            self.flash = FlashPhase::Dip(DIP_FRAMES);
        }
        if self.last_section.as_deref() != section {
            self.last_section = section.map(str::to_string);
        }
    }

    fn recolor(&self, palette: &ColorPalette, brightness: f32, flash_frame: bool) -> ColorPalette {
        let mut palette = *palette;
        if palette.accent.s < RESCUE_SATURATION {
            palette.accent = Hsl::from_degrees(40.0, 100.0, 55.0);
        }
        if self.flare > FLARE_VISIBLE {
            let boost = self.flare * FLARE_BOOST * brightness;
            palette.accent = boost_lightness(palette.accent, boost);
            palette.primary = boost_lightness(palette.primary, boost * FLARE_PRIMARY_SHARE);
        }
        if flash_frame {
            palette.accent = Hsl::new(0.0, 0.0, 1.0);
        }
        palette
    }

    fn debug(&self, kick: bool) -> EngineDebug {
        EngineDebug::Latino(LatinoDebug {
            front: self.front,
            back: self.back,
            mover: self.mover,
            flare: self.flare,
            kick,
            blackout_remaining: self.blackout_remaining,
            flash_phase: self.flash,
        })
    }
}

impl Default for LatinoEngine {
    fn default() -> Self {
        Self::new(LatinoTuning::default())
    }
}

impl GenreEngine for LatinoEngine {
    fn tag(&self) -> EngineTag {
        EngineTag::Latino
    }

    fn apply(&mut self, input: &EngineInput<'_>) -> EngineOutput {
        let audio = input.audio;
        let threshold = input.modifiers.threshold;

        self.track_section(input.section);
        if self.detect_blackout(input) && self.blackout_remaining == 0 {
            tracing::debug!(energy = audio.energy, "latino forced blackout");
            self.blackout_remaining = self.tuning.blackout_frames;
        }
        self.last_energy = Some((audio.energy, input.now_ms));

        let kick;
        if audio.is_silent() {
            self.front = 0.0;
            self.back = 0.0;
            self.mover = 0.0;
            self.mover_right = 0.0;
            self.flare = 0.0;
            kick = false;
        } else {
            let tuning = &self.tuning;
            let front_target =
                (gate(audio.bass, tuning.front_gate * threshold) * tuning.front_gain).min(1.0);
            self.front = Self::punch(self.front, front_target, tuning.front_decay);

            let back_gate = tuning.back_gate * threshold;
            let back_span = (BACK_SPAN_TOP - tuning.back_gate).max(0.01);
            let back_target = if audio.treble > back_gate {
                ((audio.treble - back_gate) / back_span * tuning.back_gain).min(1.0)
            } else {
                0.0
            };
            self.back = if back_target > self.back {
                self.back + (back_target - self.back) * BACK_ATTACK
            } else {
                (self.back - tuning.back_decay).max(back_target)
            };

            let mover_gate = tuning.mover_gate * threshold;
            let vocal = (audio.mid - tuning.treble_rejection * audio.treble).max(0.0);
            let vocal_target = (gate(vocal, mover_gate) * tuning.mover_gain).min(1.0);
            let hats = (audio.treble - tuning.treble_rejection * audio.mid).max(0.0);
            let hats_target = (gate(hats, mover_gate) * tuning.mover_gain).min(1.0);
            self.mover = Self::vocal(self.mover, vocal_target, vocal, mover_gate);
            self.mover_right = Self::vocal(self.mover_right, hats_target, hats, mover_gate);

            let kick_level = tuning.kick_threshold * threshold;
            kick = audio.bass > kick_level
                && audio.bass - self.last_bass > tuning.kick_rise * threshold;
            if kick {
                let flare = (gate(audio.bass, kick_level) * FLARE_GAIN).min(1.0);
                if self.flare <= FLARE_VISIBLE && flare > FLARE_VISIBLE {
                    tracing::debug!(flare, "latino solar flare");
                }
                self.flare = self.flare.max(flare);
            } else {
                self.flare *= FLARE_DECAY;
                if self.flare < 0.01 {
                    self.flare = 0.0;
                }
            }
        }
        self.last_bass = audio.bass;

        if self.blackout_remaining > 0 {
            self.blackout_remaining -= 1;
            let mut output = EngineOutput::dark(self.debug(kick));
            output.zones = Some(ZoneIntensities::default().with_split(MoverSplit::default()));
            output.dimmer_override = Some(0.0);
            output.force_movement = true;
            return output;
        }

        let mut zones = ZoneIntensities::new(self.front, self.back, self.mover).with_split(
            MoverSplit {
                left: self.mover,
                right: self.mover_right,
            },
        );

        let (dimmer_override, flash_frame) = match self.flash {
            FlashPhase::Idle => (None, false),
            FlashPhase::Dip(remaining) => {
                self.flash = if remaining <= 1 {
                    FlashPhase::Flash
                } else {
                    FlashPhase::Dip(remaining - 1)
                };
                (Some(DIP_DIMMER), false)
            }
            FlashPhase::Flash => {
                self.flash = FlashPhase::Idle;
                zones = ZoneIntensities::new(1.0, 1.0, 1.0).with_split(MoverSplit {
                    left: 1.0,
                    right: 1.0,
                });
                (Some(1.0), true)
            }
        };

        let solar_flare = self.flare > FLARE_VISIBLE;
        EngineOutput {
            palette: Some(self.recolor(input.palette, input.modifiers.brightness, flash_frame)),
            zones: Some(zones),
            flags: EffectFlags {
                strobe: false,
                flash: flash_frame,
                solar_flare,
            },
            dimmer_override,
            force_movement: true,
            color_override: None,
            debug: self.debug(kick),
        }
    }

    fn reset(&mut self) {
        *self = Self::new(self.tuning.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::AudioFrame;
    use crate::genre::testing::{input, run, zones};

    fn step(engine: &mut LatinoEngine, audio: &AudioFrame, frame: usize) -> EngineOutput {
        let palette = ColorPalette::default();
        engine.apply(&input(&palette, audio, frame as f64 * 25.0))
    }

    #[test]
    fn bass_transient_hits_front_in_one_frame() {
        let mut engine = LatinoEngine::default();
        step(&mut engine, &AudioFrame::new(0.1, 0.2, 0.1, 0.2), 0);
        let output = step(&mut engine, &AudioFrame::new(0.9, 0.2, 0.1, 0.5), 1);
        assert_eq!(zones(&output).front, 1.0);
    }

    #[test]
    fn front_decays_linearly() {
        let mut engine = LatinoEngine::default();
        step(&mut engine, &AudioFrame::new(0.9, 0.0, 0.0, 0.5), 0);
        let output = step(&mut engine, &AudioFrame::new(0.2, 0.0, 0.0, 0.5), 1);
        assert!((zones(&output).front - 0.88).abs() < 1e-5);
    }

    #[test]
    fn treble_bleed_is_rejected_from_movers() {
        let mut engine = LatinoEngine::default();
        let output = run(&mut engine, &AudioFrame::new(0.2, 0.4, 0.9, 0.5), 4);
        assert_eq!(zones(&output).mover, 0.0);
        assert!(zones(&output).mover_right.unwrap() > 0.0);
    }

    #[test]
    fn held_vocal_rests_instead_of_dying() {
        let mut engine = LatinoEngine::default();
        for frame in 0..4 {
            step(&mut engine, &AudioFrame::new(0.1, 0.8, 0.0, 0.5), frame);
        }
        let mut last = 1.0;
        for frame in 4..12 {
            last = zones(&step(&mut engine, &AudioFrame::new(0.1, 0.15, 0.0, 0.3), frame)).mover;
        }
        assert!((last - MOVER_REST).abs() < 1e-6);
    }

    #[test]
    fn kick_with_rise_fires_solar_flare() {
        let mut engine = LatinoEngine::default();
        step(&mut engine, &AudioFrame::new(0.2, 0.2, 0.1, 0.3), 0);
        let output = step(&mut engine, &AudioFrame::new(0.95, 0.2, 0.1, 0.6), 1);
        assert!(output.flags.solar_flare);

        let palette = output.palette.unwrap();
        assert!(palette.accent.l > ColorPalette::default().accent.l);
    }

    #[test]
    fn sustained_bass_does_not_keep_flaring() {
        let mut engine = LatinoEngine::default();
        let output = run(&mut engine, &AudioFrame::new(0.95, 0.2, 0.1, 0.6), 12);
        assert!(!output.flags.solar_flare);
    }

    #[test]
    fn energy_cliff_forces_blackout() {
        let mut engine = LatinoEngine::default();
        step(&mut engine, &AudioFrame::new(0.8, 0.7, 0.6, 0.8), 0);
        let cliff = AudioFrame::new(0.2, 0.2, 0.2, 0.2).with_previous_energy(0.8);

        for frame in 1..=3 {
            let output = step(&mut engine, &cliff, frame);
            assert_eq!(output.dimmer_override, Some(0.0));
            assert!(zones(&output).is_dark());
        }
        let after = step(&mut engine, &AudioFrame::new(0.2, 0.2, 0.2, 0.2), 4);
        assert_eq!(after.dimmer_override, None);
    }

    #[test]
    fn slow_fade_is_not_a_cliff() {
        let mut engine = LatinoEngine::default();
        let audio = AudioFrame::new(0.8, 0.7, 0.6, 0.2).with_previous_energy(0.8);
        let palette = ColorPalette::default();
        let mut inputs = input(&palette, &audio, 0.0);
        inputs.delta_ms = 500.0;
        let output = engine.apply(&inputs);
        assert_eq!(output.dimmer_override, None);
    }

    #[test]
    fn stale_energy_after_a_gap_is_not_a_cliff() {
        let mut engine = LatinoEngine::default();
        step(&mut engine, &AudioFrame::new(0.8, 0.7, 0.6, 0.8), 0);
        let quiet = AudioFrame::new(0.3, 0.2, 0.2, 0.3);

        let output = step(&mut engine, &quiet, 400);
        assert_eq!(output.dimmer_override, None);
        assert!(!zones(&output).is_dark());
    }

    #[test]
    fn remembered_energy_detects_cliff_within_window() {
        let mut engine = LatinoEngine::default();
        step(&mut engine, &AudioFrame::new(0.8, 0.7, 0.6, 0.8), 0);
        let output = step(&mut engine, &AudioFrame::new(0.3, 0.2, 0.2, 0.3), 1);
        assert_eq!(output.dimmer_override, Some(0.0));
    }

    #[test]
    fn drop_entry_plays_dip_flash_idle_once() {
        let mut engine = LatinoEngine::default();
        let verse = AudioFrame::new(0.4, 0.4, 0.3, 0.5).with_section("verse");
        let drop = AudioFrame::new(0.4, 0.4, 0.3, 0.5).with_section("drop");

        step(&mut engine, &verse, 0);
        let dimmers: Vec<Option<f32>> = (1..8)
            .map(|frame| step(&mut engine, &drop, frame).dimmer_override)
            .collect();
        assert_eq!(
            dimmers,
            vec![Some(0.3), Some(0.3), Some(1.0), None, None, None, None]
        );
    }

    #[test]
    fn washed_out_accent_is_rescued_to_gold() {
        let engine = LatinoEngine::default();
        let mut palette = ColorPalette::default();
        palette.accent = Hsl::new(0.5, 0.1, 0.5);
        let recolored = engine.recolor(&palette, 1.0, false);
        assert!((recolored.accent.hue_degrees() - 40.0).abs() < 0.01);
    }
}
