//! Core library for the Light Reactor engine.
//!
//! The crate turns normalised audio features (band energies, tempo, section
//! tags) plus a style name into per-zone light intensities and colours. Each
//! module owns one subsystem: envelope primitives, the procedural palette,
//! the genre physics engines, the safety gate and the dispatcher tying them
//! together. Everything runs synchronously inside a single `update` call per
//! output tick; nothing here touches files, sockets or the wall clock.

pub mod color;
pub mod config;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod frame;
pub mod genre;
pub mod palette;
pub mod safety;
pub mod timeline;

pub use config::{
    AuthorityCeilings, ChillTuning, FallbackTuning, LatinoTuning, PaletteTuning, ReactorConfig,
    RockTuning, TechnoTuning,
};
pub use dispatcher::{route_style, Dispatcher, StyleRoute, STYLE_ROUTES};
pub use envelope::{DecayBuffers, HysteresisConfig, HysteresisGate, ZoneKind};
pub use error::{ReactorError, Result};
pub use frame::{
    AudioFrame, ColorPalette, EngineTag, Hsl, Modifiers, MoverSplit, ReactiveOutput, Rgb,
    RgbPalette, StyleContext, ZoneIntensities,
};
pub use genre::{EngineDebug, EngineInput, EngineOutput, GenreEngine};
pub use palette::{LightKind, PaletteName, ProceduralPalette, Side, ZoneColors};
pub use safety::{ColorDecision, PhysicsModifier, ENERGY_OVERRIDE_THRESHOLD};
pub use timeline::FrameClock;
