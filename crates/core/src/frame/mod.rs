//! Per-frame data exchanged between the host and the reactor.

use serde::{Deserialize, Serialize};

use crate::color;
use crate::genre::EngineDebug;

/// Band level under which a frame is considered silent.
pub const SILENCE_FLOOR: f32 = 0.01;

/// Section tag that triggers drop-specific behaviour.
pub const DROP_SECTION: &str = "drop";

/// Normalised audio features for a single output tick.
///
/// Every band is expected in `[0, 1]`. Missing or non-finite values are
/// treated as zero by [`AudioFrame::sanitized`], which the dispatcher calls
/// before any engine sees the frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioFrame {
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    pub energy: f32,
    pub previous_energy: Option<f32>,
    /// Milliseconds since the previous frame.
    pub delta_ms: Option<f32>,
    pub bpm: Option<f32>,
    pub section: Option<String>,
    /// Spectral centroid in Hz.
    pub centroid_hz: Option<f32>,
    /// Energy of the 16-22 kHz band.
    pub ultra_air: Option<f32>,
    pub harshness: Option<f32>,
    pub flatness: Option<f32>,
}

impl AudioFrame {
    pub fn new(bass: f32, mid: f32, treble: f32, energy: f32) -> Self {
        Self {
            bass,
            mid,
            treble,
            energy,
            ..Default::default()
        }
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn with_previous_energy(mut self, previous: f32) -> Self {
        self.previous_energy = Some(previous);
        self
    }

    pub fn with_delta_ms(mut self, delta_ms: f32) -> Self {
        self.delta_ms = Some(delta_ms);
        self
    }

    /// Returns a copy with every band clamped to `[0, 1]` and NaN/inf zeroed.
    pub fn sanitized(&self) -> Self {
        Self {
            bass: unit(self.bass),
            mid: unit(self.mid),
            treble: unit(self.treble),
            energy: unit(self.energy),
            previous_energy: self.previous_energy.map(unit),
            delta_ms: self
                .delta_ms
                .filter(|value| value.is_finite() && *value >= 0.0),
            bpm: self.bpm.filter(|value| value.is_finite() && *value > 0.0),
            section: self.section.clone(),
            centroid_hz: self
                .centroid_hz
                .filter(|value| value.is_finite())
                .map(|value| value.max(0.0)),
            ultra_air: self.ultra_air.map(unit),
            harshness: self.harshness.map(unit),
            flatness: self.flatness.map(unit),
        }
    }

    pub fn is_silent(&self) -> bool {
        self.energy < SILENCE_FLOOR
            && self.bass < SILENCE_FLOOR
            && self.mid < SILENCE_FLOOR
            && self.treble < SILENCE_FLOOR
    }

    pub fn flatness(&self) -> f32 {
        self.flatness.unwrap_or(0.0)
    }

    pub fn harshness(&self) -> f32 {
        self.harshness.unwrap_or(0.0)
    }
}

/// Upstream description of the music currently playing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleContext {
    pub name: String,
    pub bpm: Option<f32>,
    pub section: Option<String>,
}

impl StyleContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    /// The context tag wins over the one carried by the audio frame.
    pub fn resolve_section<'a>(&'a self, audio: &'a AudioFrame) -> Option<&'a str> {
        self.section.as_deref().or(audio.section.as_deref())
    }
}

/// Gain and sensitivity adjustments supplied by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub brightness: f32,
    pub threshold: f32,
}

impl Default for Modifiers {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            threshold: 1.0,
        }
    }
}

/// Hue/saturation/lightness colour with every channel normalised to `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Hsl {
    pub h: f32,
    pub s: f32,
    pub l: f32,
}

impl Hsl {
    pub fn new(h: f32, s: f32, l: f32) -> Self {
        Self {
            h: color::wrap_unit_hue(h),
            s: unit(s),
            l: unit(l),
        }
    }

    /// Builds a colour from degrees and percentages.
    pub fn from_degrees(hue: f32, saturation: f32, lightness: f32) -> Self {
        Self::new(hue / 360.0, saturation / 100.0, lightness / 100.0)
    }

    pub fn hue_degrees(&self) -> f32 {
        color::wrap_hue(self.h * 360.0)
    }

    pub fn to_rgb(self) -> Rgb {
        color::hsl_to_rgb(self)
    }
}

/// The four colour slots an upstream palette selector hands to the reactor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorPalette {
    pub primary: Hsl,
    pub secondary: Hsl,
    pub ambient: Hsl,
    pub accent: Hsl,
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self {
            primary: Hsl::from_degrees(15.0, 100.0, 50.0),
            secondary: Hsl::from_degrees(45.0, 90.0, 55.0),
            ambient: Hsl::from_degrees(330.0, 70.0, 30.0),
            accent: Hsl::from_degrees(190.0, 100.0, 55.0),
        }
    }
}

impl ColorPalette {
    /// Builds a palette from a single hue with spread slots.
    pub fn from_base(base: Hsl) -> Self {
        let shifted = |offset: f32| Hsl::new(base.h + offset / 360.0, base.s, base.l);
        Self {
            primary: base,
            secondary: shifted(30.0),
            ambient: shifted(-30.0),
            accent: shifted(180.0),
        }
    }

    pub fn to_rgb(&self) -> RgbPalette {
        RgbPalette {
            primary: self.primary.to_rgb(),
            secondary: self.secondary.to_rgb(),
            ambient: self.ambient.to_rgb(),
            accent: self.accent.to_rgb(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn lerp(self, other: Rgb, t: f32) -> Rgb {
        let t = unit(t);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgb {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
        }
    }
}

/// Resolved palette in 8-bit RGB, ready for fixture mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgbPalette {
    pub primary: Rgb,
    pub secondary: Rgb,
    pub ambient: Rgb,
    pub accent: Rgb,
}

/// Independent left/right mover intensities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MoverSplit {
    pub left: f32,
    pub right: f32,
}

/// Logical output channels for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneIntensities {
    pub front: f32,
    pub back: f32,
    /// Legacy single mover channel.
    pub mover: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mover_left: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mover_right: Option<f32>,
}

impl ZoneIntensities {
    pub fn new(front: f32, back: f32, mover: f32) -> Self {
        Self {
            front,
            back,
            mover,
            mover_left: None,
            mover_right: None,
        }
    }

    pub fn with_split(mut self, split: MoverSplit) -> Self {
        self.mover_left = Some(split.left);
        self.mover_right = Some(split.right);
        self
    }

    pub fn clamped(self) -> Self {
        Self {
            front: unit(self.front),
            back: unit(self.back),
            mover: unit(self.mover),
            mover_left: self.mover_left.map(unit),
            mover_right: self.mover_right.map(unit),
        }
    }

    pub fn is_dark(&self) -> bool {
        let split = self.mover_left.unwrap_or(0.0).max(self.mover_right.unwrap_or(0.0));
        self.front <= 0.0 && self.back <= 0.0 && self.mover <= 0.0 && split <= 0.0
    }
}

/// Identifies which engine family authored a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineTag {
    Techno,
    Latino,
    Rock,
    Chill,
    Fallback,
}

impl EngineTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineTag::Techno => "techno",
            EngineTag::Latino => "latino",
            EngineTag::Rock => "rock",
            EngineTag::Chill => "chill",
            EngineTag::Fallback => "fallback",
        }
    }
}

/// Everything the reactor emits for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReactiveOutput {
    pub palette: RgbPalette,
    pub zones: ZoneIntensities,
    pub strobe_active: bool,
    pub flash_active: bool,
    pub solar_flare_active: bool,
    pub dimmer_override: Option<f32>,
    pub force_movement: bool,
    pub engine: EngineTag,
    pub energy_override_active: bool,
    pub color_override: Option<Hsl>,
    pub debug: EngineDebug,
}

impl ReactiveOutput {
    pub fn any_effect(&self) -> bool {
        self.strobe_active || self.flash_active || self.solar_flare_active
    }
}

/// Clamps into `[0, 1]`, mapping NaN and infinities to zero.
pub fn unit(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizing_zeroes_non_finite_bands() {
        let frame = AudioFrame {
            bass: f32::NAN,
            mid: 1.7,
            treble: -0.3,
            energy: f32::INFINITY,
            delta_ms: Some(-4.0),
            ..Default::default()
        };

        let clean = frame.sanitized();
        assert_eq!(clean.bass, 0.0);
        assert_eq!(clean.mid, 1.0);
        assert_eq!(clean.treble, 0.0);
        assert_eq!(clean.energy, 0.0);
        assert_eq!(clean.delta_ms, None);
    }

    #[test]
    fn silence_requires_every_band_below_floor() {
        assert!(AudioFrame::default().is_silent());
        assert!(!AudioFrame::new(0.0, 0.0, 0.2, 0.0).is_silent());
    }

    #[test]
    fn context_section_overrides_frame_section() {
        let audio = AudioFrame::default().with_section("verse");
        let context = StyleContext::new("techno").with_section("drop");
        assert_eq!(context.resolve_section(&audio), Some("drop"));
        assert_eq!(StyleContext::new("techno").resolve_section(&audio), Some("verse"));
    }

    #[test]
    fn hsl_wraps_hue_into_unit_range() {
        let color = Hsl::from_degrees(-30.0, 150.0, 50.0);
        assert!((color.hue_degrees() - 330.0).abs() < 1e-3);
        assert_eq!(color.s, 1.0);
    }

    #[test]
    fn split_zones_are_clamped() {
        let zones = ZoneIntensities::new(1.4, 0.5, -1.0)
            .with_split(MoverSplit {
                left: 2.0,
                right: 0.3,
            })
            .clamped();
        assert_eq!(zones.front, 1.0);
        assert_eq!(zones.mover, 0.0);
        assert_eq!(zones.mover_left, Some(1.0));
    }
}
