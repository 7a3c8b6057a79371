//! Genre physics engines.
//!
//! Every engine turns one sanitised audio frame into zone intensities, effect
//! flags and an optional palette. Engines own all of their state; nothing is
//! shared between instances.

use serde::Serialize;

use crate::frame::{AudioFrame, ColorPalette, EngineTag, Hsl, Modifiers, ZoneIntensities};

pub mod chill;
pub mod fallback;
pub mod latino;
pub mod rock;
pub mod techno;

pub use chill::{ChillDebug, ChillEngine, DepthBand};
pub use fallback::{FallbackDebug, FallbackEngine};
pub use latino::{FlashPhase, LatinoDebug, LatinoEngine};
pub use rock::{RockDebug, RockEngine};
pub use techno::{TechnoDebug, TechnoEngine};

/// Everything an engine may look at for one frame.
#[derive(Debug, Clone, Copy)]
pub struct EngineInput<'a> {
    pub palette: &'a ColorPalette,
    /// Already sanitised by the dispatcher.
    pub audio: &'a AudioFrame,
    pub section: Option<&'a str>,
    pub bpm: Option<f32>,
    /// Clamped, and neutralised while the energy override is active.
    pub modifiers: Modifiers,
    /// Engine-local time from the dispatcher's frame clock.
    pub now_ms: f64,
    pub delta_ms: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EffectFlags {
    pub strobe: bool,
    pub flash: bool,
    pub solar_flare: bool,
}

/// What an engine hands back to the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutput {
    /// Replacement palette, if the engine recoloured the frame.
    pub palette: Option<ColorPalette>,
    /// Engine-authoritative zone values. `None` defers to the generic curve.
    pub zones: Option<ZoneIntensities>,
    pub flags: EffectFlags,
    pub dimmer_override: Option<f32>,
    pub force_movement: bool,
    pub color_override: Option<Hsl>,
    pub debug: EngineDebug,
}

impl EngineOutput {
    pub fn new(debug: EngineDebug) -> Self {
        Self {
            palette: None,
            zones: None,
            flags: EffectFlags::default(),
            dimmer_override: None,
            force_movement: false,
            color_override: None,
            debug,
        }
    }

    /// Fully dark frame with explicit zero zones.
    pub fn dark(debug: EngineDebug) -> Self {
        Self {
            zones: Some(ZoneIntensities::default()),
            ..Self::new(debug)
        }
    }
}

/// Engine-specific diagnostics. Never read back by control flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "engine", rename_all = "lowercase")]
pub enum EngineDebug {
    None,
    Techno(TechnoDebug),
    Latino(LatinoDebug),
    Rock(RockDebug),
    Chill(ChillDebug),
    Fallback(FallbackDebug),
}

pub trait GenreEngine {
    fn tag(&self) -> EngineTag;

    /// Advances the engine by one frame.
    fn apply(&mut self, input: &EngineInput<'_>) -> EngineOutput;

    /// Clears every envelope and state machine back to construction state.
    fn reset(&mut self);
}

/// Soft compression above `knee`: excess is scaled by `ratio`.
pub(crate) fn compress(value: f32, knee: f32, ratio: f32) -> f32 {
    if value > knee {
        (knee + (value - knee) * ratio).min(1.0)
    } else {
        value.max(0.0)
    }
}

/// Zeroes values under `floor`.
pub(crate) fn snap(value: f32, floor: f32) -> f32 {
    if value < floor {
        0.0
    } else {
        value
    }
}
