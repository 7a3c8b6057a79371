//! Deterministic procedural colour generation per named mood.
//!
//! Nothing here reads a clock or an RNG. Callers pass the current time in
//! milliseconds, and the "entropy" is a fixed transcendental function of that
//! time, the requested intensity, the fixture side, and a running energy seed.
//! Identical inputs therefore always yield identical colours.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::color::{lerp_hue, wrap_hue};
use crate::config::PaletteTuning;
use crate::frame::{unit, Hsl, Rgb};

const DRIFT_PERIOD_MS: f64 = 15_000.0;
const NEON_CYCLE_MS: f64 = 60_000.0;
const NEON_BLEND_START: f64 = 0.8;
const HIELO_MIN_INTENSITY: f32 = 0.25;
const BACK_HUE_SHIFT: f32 = -15.0;

/// Neon hue pairs as `(primary, accent)` in degrees.
const NEON_PAIRS: [(f32, f32); 4] = [(300.0, 180.0), (180.0, 330.0), (270.0, 120.0), (120.0, 300.0)];

/// Alias table; anything missing here and in [`PaletteName::canonical`]
/// resolves to fuego.
const ALIASES: [(&str, PaletteName); 5] = [
    ("default", PaletteName::Fuego),
    ("latino", PaletteName::Fuego),
    ("arctic", PaletteName::Hielo),
    ("tropical", PaletteName::Selva),
    ("cyberpunk", PaletteName::Neon),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaletteName {
    Fuego,
    Hielo,
    Selva,
    Neon,
}

impl PaletteName {
    pub const ALL: [PaletteName; 4] = [
        PaletteName::Fuego,
        PaletteName::Hielo,
        PaletteName::Selva,
        PaletteName::Neon,
    ];

    fn canonical(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|palette| palette.as_str() == name)
    }

    /// Resolves a free-text name, following aliases.
    pub fn resolve(name: &str) -> Self {
        let name = name.trim().to_ascii_lowercase();
        Self::canonical(&name)
            .or_else(|| {
                ALIASES
                    .iter()
                    .find(|(alias, _)| *alias == name)
                    .map(|(_, palette)| *palette)
            })
            .unwrap_or(PaletteName::Fuego)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaletteName::Fuego => "fuego",
            PaletteName::Hielo => "hielo",
            PaletteName::Selva => "selva",
            PaletteName::Neon => "neon",
        }
    }
}

/// Wash fixtures flood a zone; spots are the beam fixtures on movers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightKind {
    Wash,
    Spot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
    Front,
    Back,
}

/// One colour per logical zone of a stereo rig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ZoneColors {
    pub front: Rgb,
    pub back: Rgb,
    pub mover_left: Rgb,
    pub mover_right: Rgb,
}

/// Colour in degrees/percent while a mood function works on it.
#[derive(Debug, Clone, Copy)]
struct Shade {
    h: f32,
    s: f32,
    l: f32,
}

/// Stateful front end: active palette, transition blend and energy seed.
#[derive(Debug, Clone)]
pub struct ProceduralPalette {
    tuning: PaletteTuning,
    active: PaletteName,
    target: Option<PaletteName>,
    progress: f32,
    energy_seed: f32,
}

impl Default for ProceduralPalette {
    fn default() -> Self {
        Self::new(PaletteTuning::default())
    }
}

impl ProceduralPalette {
    pub fn new(tuning: PaletteTuning) -> Self {
        Self {
            tuning,
            active: PaletteName::Fuego,
            target: None,
            progress: 1.0,
            energy_seed: 0.5,
        }
    }

    pub fn active(&self) -> PaletteName {
        self.active
    }

    pub fn target(&self) -> Option<PaletteName> {
        self.target
    }

    pub fn transition_progress(&self) -> f32 {
        self.progress
    }

    /// Feeds the running energy that seeds the entropy term.
    pub fn set_energy(&mut self, energy: f32) {
        self.energy_seed = unit(energy);
    }

    /// Starts a linear blend toward `name`.
    pub fn set_palette(&mut self, name: &str) {
        let next = PaletteName::resolve(name);
        if next == self.active && self.target.is_none() {
            return;
        }
        tracing::debug!(from = self.active.as_str(), to = next.as_str(), "palette transition");
        self.target = Some(next);
        self.progress = 0.0;
    }

    pub fn set_palette_immediate(&mut self, name: &str) {
        self.active = PaletteName::resolve(name);
        self.target = None;
        self.progress = 1.0;
    }

    /// Moves an in-flight transition forward by `delta_ms`.
    pub fn advance(&mut self, delta_ms: f32) {
        let Some(target) = self.target else {
            return;
        };
        self.progress += delta_ms.max(0.0) / self.tuning.transition_ms.max(1.0);
        if self.progress >= 1.0 {
            self.active = target;
            self.target = None;
            self.progress = 1.0;
        }
    }

    /// Colour for an explicitly named palette, ignoring the active blend.
    pub fn color_for(
        &self,
        name: &str,
        intensity: f32,
        kind: LightKind,
        side: Side,
        now_ms: f64,
    ) -> Rgb {
        self.hsl_for(PaletteName::resolve(name), intensity, kind, side, now_ms)
            .to_rgb()
    }

    /// Colour for the active palette, blended toward the transition target.
    pub fn current_color(&self, intensity: f32, kind: LightKind, side: Side, now_ms: f64) -> Rgb {
        let from = self
            .hsl_for(self.active, intensity, kind, side, now_ms)
            .to_rgb();
        match self.target {
            Some(target) => {
                let to = self.hsl_for(target, intensity, kind, side, now_ms).to_rgb();
                from.lerp(to, self.progress)
            }
            None => from,
        }
    }

    pub fn zone_colors(&self, intensity: f32, now_ms: f64) -> ZoneColors {
        ZoneColors {
            front: self.current_color(intensity, LightKind::Wash, Side::Front, now_ms),
            back: self.current_color(intensity, LightKind::Wash, Side::Back, now_ms),
            mover_left: self.current_color(intensity, LightKind::Spot, Side::Left, now_ms),
            mover_right: self.current_color(intensity, LightKind::Spot, Side::Right, now_ms),
        }
    }

    /// Full pipeline for one palette: mood, side shift, yellow fix, globals.
    pub fn hsl_for(
        &self,
        palette: PaletteName,
        intensity: f32,
        kind: LightKind,
        side: Side,
        now_ms: f64,
    ) -> Hsl {
        let intensity = unit(intensity);
        let drift = self.time_drift(now_ms);
        let seed_offset =
            now_ms + intensity as f64 * 1000.0 + if side == Side::Right { 500.0 } else { 0.0 };
        let entropy = entropy(now_ms, self.energy_seed, seed_offset);

        let mut shade = match palette {
            PaletteName::Fuego => fuego(intensity, kind, side, drift, entropy),
            PaletteName::Hielo => hielo(intensity.max(HIELO_MIN_INTENSITY), kind, side, drift, entropy),
            PaletteName::Selva => selva(intensity, kind, side, drift, entropy),
            PaletteName::Neon => neon(intensity, kind, side, now_ms),
        };

        if side == Side::Back {
            shade.h += BACK_HUE_SHIFT;
        }
        shade.h = wrap_hue(shade.h);
        shade.s = shade.s.clamp(0.0, 100.0);
        shade.l = shade.l.clamp(0.0, 100.0);

        let shade = fix_yellow(shade);

        Hsl::from_degrees(
            shade.h,
            shade.s * self.tuning.saturation,
            shade.l * self.tuning.intensity,
        )
    }

    fn time_drift(&self, now_ms: f64) -> f32 {
        let boost = 0.5 + self.tuning.creativity as f64 * 0.5;
        ((now_ms / (DRIFT_PERIOD_MS / boost)).rem_euclid(1.0)) as f32
    }
}

/// Pseudo-entropy in `[0, 1]` from time, energy and a per-call offset.
pub fn entropy(now_ms: f64, energy: f32, seed_offset: f64) -> f32 {
    let audio_noise = (energy as f64 * 1000.0).rem_euclid(1.0);
    let seed = now_ms * 0.001 + audio_noise * 100.0 + seed_offset * 7.3;
    (((seed.sin() + (seed * 0.7).cos() + 2.0) / 4.0) as f32).clamp(0.0, 1.0)
}

fn fuego(intensity: f32, kind: LightKind, side: Side, drift: f32, entropy: f32) -> Shade {
    match (kind, side) {
        (LightKind::Spot, Side::Left) => Shade {
            h: 58.0 + drift * 6.0 + entropy * 4.0,
            s: 95.0,
            l: 70.0,
        },
        (LightKind::Spot, _) => Shade {
            h: 15.0 + drift * 10.0 + entropy * 5.0,
            s: 100.0,
            l: 55.0,
        },
        (LightKind::Wash, _) => Shade {
            h: 10.0 + (drift as f64 * TAU).sin() as f32 * 20.0 + intensity * 15.0,
            s: 95.0 + intensity * 5.0,
            l: (30.0 + intensity * 35.0).max(45.0),
        },
    }
}

fn hielo(intensity: f32, kind: LightKind, side: Side, drift: f32, entropy: f32) -> Shade {
    match (kind, side) {
        (LightKind::Spot, Side::Left) => Shade {
            h: 330.0 + entropy * 20.0,
            s: 85.0,
            l: 60.0,
        },
        (LightKind::Spot, _) => Shade {
            h: 185.0 + entropy * 15.0,
            s: 100.0,
            l: 55.0,
        },
        (LightKind::Wash, _) => Shade {
            h: 210.0 + drift * 15.0,
            s: 85.0 - intensity * 10.0,
            l: (35.0 + intensity * 35.0).max(45.0),
        },
    }
}

fn selva(intensity: f32, kind: LightKind, side: Side, drift: f32, entropy: f32) -> Shade {
    match (kind, side) {
        (LightKind::Spot, Side::Left) => Shade {
            h: 320.0 + entropy * 25.0,
            s: 100.0,
            l: 58.0,
        },
        (LightKind::Spot, _) => Shade {
            h: 58.0 + entropy * 6.0,
            s: 95.0,
            l: 70.0,
        },
        (LightKind::Wash, _) => Shade {
            h: 120.0 + drift * 25.0 - intensity * 20.0,
            s: 85.0 + intensity * 15.0,
            l: (30.0 + intensity * 30.0).max(40.0),
        },
    }
}

fn neon(intensity: f32, kind: LightKind, side: Side, now_ms: f64) -> Shade {
    let cycle = now_ms / NEON_CYCLE_MS;
    let progress = cycle.rem_euclid(1.0);
    let index = (cycle.floor().rem_euclid(4.0)) as usize;
    let current = NEON_PAIRS[index % 4];
    let next = NEON_PAIRS[(index + 1) % 4];

    let blend = if progress > NEON_BLEND_START {
        ((progress - NEON_BLEND_START) / (1.0 - NEON_BLEND_START)) as f32
    } else {
        0.0
    };

    match (kind, side) {
        (LightKind::Spot, Side::Left) => Shade {
            h: lerp_hue(current.1, next.1, blend),
            s: 95.0,
            l: 55.0,
        },
        (LightKind::Spot, _) => Shade {
            h: lerp_hue(current.0, next.0, blend),
            s: 95.0,
            l: 55.0,
        },
        (LightKind::Wash, _) => Shade {
            h: lerp_hue(current.0, next.0, blend),
            s: 100.0,
            l: (45.0 + intensity * 25.0).max(50.0),
        },
    }
}

/// Mid-lightness yellow reads as olive; pull it toward a golden band.
fn fix_yellow(shade: Shade) -> Shade {
    if !(40.0..=75.0).contains(&shade.h) {
        return shade;
    }

    let mut h = shade.h;
    if h < 55.0 {
        h = 55.0 + (h - 40.0) * 0.2;
    }
    if h > 68.0 {
        h = 68.0 - (75.0 - h) * 0.3;
    }

    Shade {
        h,
        s: shade.s.clamp(90.0, 95.0),
        l: shade.l.clamp(65.0, 75.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: f64 = 1_234_567.0;

    #[test]
    fn aliases_resolve_to_canonical_palettes() {
        assert_eq!(PaletteName::resolve("default"), PaletteName::Fuego);
        assert_eq!(PaletteName::resolve("  Arctic "), PaletteName::Hielo);
        assert_eq!(PaletteName::resolve("no-such-palette"), PaletteName::Fuego);
        assert_eq!(PaletteName::resolve("NEON"), PaletteName::Neon);
    }

    #[test]
    fn alias_output_matches_canonical_output() {
        let generator = ProceduralPalette::default();
        for (alias, canonical) in ALIASES {
            for side in [Side::Left, Side::Right, Side::Front, Side::Back] {
                for kind in [LightKind::Wash, LightKind::Spot] {
                    assert_eq!(
                        generator.color_for(alias, 0.6, kind, side, NOW),
                        generator.color_for(canonical.as_str(), 0.6, kind, side, NOW),
                    );
                }
            }
        }
    }

    #[test]
    fn output_is_reproducible() {
        let a = ProceduralPalette::default();
        let b = ProceduralPalette::default();
        assert_eq!(
            a.color_for("selva", 0.4, LightKind::Spot, Side::Left, NOW),
            b.color_for("selva", 0.4, LightKind::Spot, Side::Left, NOW),
        );
    }

    #[test]
    fn stereo_spots_use_different_hues() {
        let generator = ProceduralPalette::default();
        for palette in PaletteName::ALL {
            let left = generator.hsl_for(palette, 0.5, LightKind::Spot, Side::Left, NOW);
            let right = generator.hsl_for(palette, 0.5, LightKind::Spot, Side::Right, NOW);
            assert!(
                (left.hue_degrees() - right.hue_degrees()).abs() > 20.0,
                "{palette:?} spots share a hue"
            );
        }
    }

    #[test]
    fn entropy_stays_in_unit_range() {
        for step in 0..200 {
            let value = entropy(step as f64 * 977.0, step as f32 / 200.0, step as f64 * 13.0);
            assert!((0.0..=1.0).contains(&value));
        }
    }

    #[test]
    fn yellow_band_is_lifted_out_of_olive() {
        let fixed = fix_yellow(Shade {
            h: 45.0,
            s: 100.0,
            l: 50.0,
        });
        assert!((fixed.h - 56.0).abs() < 1e-4);
        assert_eq!(fixed.l, 65.0);
        assert_eq!(fixed.s, 95.0);
    }

    #[test]
    fn neon_holds_pair_until_final_fifth() {
        let early = neon(0.5, LightKind::Wash, Side::Front, 10_000.0);
        let late = neon(0.5, LightKind::Wash, Side::Front, 54_000.0);
        assert!((early.h - 300.0).abs() < 1e-3);
        assert!((late.h - 240.0).abs() < 1e-3);
    }

    #[test]
    fn hielo_enforces_minimum_intensity() {
        let generator = ProceduralPalette::default();
        assert_eq!(
            generator.hsl_for(PaletteName::Hielo, 0.0, LightKind::Wash, Side::Front, NOW),
            generator.hsl_for(PaletteName::Hielo, 0.25, LightKind::Wash, Side::Front, NOW),
        );
    }

    #[test]
    fn back_side_shifts_hue() {
        let generator = ProceduralPalette::default();
        let front = generator.hsl_for(PaletteName::Hielo, 0.5, LightKind::Wash, Side::Front, NOW);
        let back = generator.hsl_for(PaletteName::Hielo, 0.5, LightKind::Wash, Side::Back, NOW);
        assert!((front.hue_degrees() - back.hue_degrees() - 15.0).abs() < 0.01);
    }

    #[test]
    fn transition_completes_after_duration() {
        let mut generator = ProceduralPalette::default();
        generator.set_palette("hielo");
        assert_eq!(generator.transition_progress(), 0.0);

        generator.advance(250.0);
        assert!((generator.transition_progress() - 0.5).abs() < 1e-6);
        assert_eq!(generator.active(), PaletteName::Fuego);

        generator.advance(250.0);
        assert_eq!(generator.active(), PaletteName::Hielo);
        assert_eq!(generator.target(), None);
    }

    #[test]
    fn blend_starts_at_active_palette() {
        let mut generator = ProceduralPalette::default();
        let before = generator.current_color(0.5, LightKind::Wash, Side::Front, NOW);
        generator.set_palette("neon");
        assert_eq!(
            generator.current_color(0.5, LightKind::Wash, Side::Front, NOW),
            before
        );
    }
}
