//! Routes each frame to a genre engine and resolves the final output.

use crate::config::{AuthorityCeilings, ReactorConfig};
use crate::frame::{
    unit, AudioFrame, ColorPalette, EngineTag, Modifiers, ReactiveOutput, StyleContext,
    ZoneIntensities,
};
use crate::genre::{
    ChillEngine, EngineDebug, EngineInput, FallbackEngine, GenreEngine, LatinoEngine, RockEngine,
    TechnoEngine,
};
use crate::safety;
use crate::timeline::FrameClock;

/// Frames between per-frame trace lines.
const TRACE_EVERY: u64 = 30;

/// One entry of the style routing table.
#[derive(Debug, Clone, Copy)]
pub struct StyleRoute {
    pub engine: EngineTag,
    pub keywords: &'static [&'static str],
}

impl StyleRoute {
    pub fn matches(&self, style: &str) -> bool {
        self.keywords.iter().any(|keyword| style.contains(keyword))
    }
}

/// Evaluated top to bottom; the first hit wins.
pub const STYLE_ROUTES: [StyleRoute; 4] = [
    StyleRoute {
        engine: EngineTag::Techno,
        keywords: &["techno", "electro"],
    },
    StyleRoute {
        engine: EngineTag::Rock,
        keywords: &["rock", "pop"],
    },
    StyleRoute {
        engine: EngineTag::Latino,
        keywords: &["latin", "fiesta", "reggae", "cumbia", "salsa", "bachata"],
    },
    StyleRoute {
        engine: EngineTag::Chill,
        keywords: &["chill", "ambient", "lounge", "jazz", "classical"],
    },
];

/// Picks the engine for a style name. Total: unknown styles get the fallback.
pub fn route_style(style: &str) -> EngineTag {
    let style = style.to_lowercase();
    STYLE_ROUTES
        .iter()
        .find(|route| route.matches(&style))
        .map(|route| route.engine)
        .unwrap_or(EngineTag::Fallback)
}

/// Owns one engine per family plus the frame clock, and produces a
/// [`ReactiveOutput`] per call to [`Dispatcher::update`].
#[derive(Debug)]
pub struct Dispatcher {
    config: ReactorConfig,
    clock: FrameClock,
    techno: TechnoEngine,
    latino: LatinoEngine,
    rock: RockEngine,
    chill: ChillEngine,
    fallback: FallbackEngine,
    last_engine: Option<EngineTag>,
    override_was_active: bool,
    last_output: Option<ReactiveOutput>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(ReactorConfig::default())
    }
}

impl Dispatcher {
    pub fn new(config: ReactorConfig) -> Self {
        tracing::info!(frame_interval_ms = config.frame_interval_ms, "light reactor ready");
        Self {
            clock: FrameClock::new(),
            techno: TechnoEngine::new(config.techno.clone()),
            latino: LatinoEngine::new(config.latino.clone()),
            rock: RockEngine::new(config.rock.clone()),
            chill: ChillEngine::new(config.chill.clone()),
            fallback: FallbackEngine::new(config.fallback.clone()),
            config,
            last_engine: None,
            override_was_active: false,
            last_output: None,
        }
    }

    pub fn config(&self) -> &ReactorConfig {
        &self.config
    }

    /// Processes one frame for a bare style name.
    pub fn update(
        &mut self,
        style: &str,
        palette: &ColorPalette,
        audio: &AudioFrame,
        modifiers: Option<Modifiers>,
    ) -> ReactiveOutput {
        let context = StyleContext {
            name: style.to_string(),
            bpm: audio.bpm,
            section: None,
        };
        self.update_with_context(&context, palette, audio, modifiers)
    }

    /// Processes one frame with a full style context.
    pub fn update_with_context(
        &mut self,
        context: &StyleContext,
        palette: &ColorPalette,
        audio: &AudioFrame,
        modifiers: Option<Modifiers>,
    ) -> ReactiveOutput {
        let audio = audio.sanitized();
        let delta_ms = audio.delta_ms.unwrap_or(self.config.frame_interval_ms);
        let now_ms = self.clock.advance(delta_ms);

        let override_active = safety::is_override_active(audio.energy);
        if override_active && !self.override_was_active {
            tracing::debug!(energy = audio.energy, "energy override engaged");
        }
        self.override_was_active = override_active;

        let mut modifiers = safety::clamp_modifiers(modifiers.unwrap_or_default());
        if override_active {
            modifiers = safety::neutralize_modifiers(modifiers);
        }

        let tag = route_style(&context.name);
        if self.last_engine != Some(tag) {
            tracing::info!(
                from = self.last_engine.map(|engine| engine.as_str()),
                to = tag.as_str(),
                style = %context.name,
                "engine switch"
            );
            self.last_engine = Some(tag);
        }

        let input = EngineInput {
            palette,
            audio: &audio,
            section: context.resolve_section(&audio),
            bpm: context.bpm.or(audio.bpm),
            modifiers,
            now_ms,
            delta_ms,
        };

        let (mut engine_output, ceilings) = match tag {
            EngineTag::Techno => (self.techno.apply(&input), self.config.techno.ceilings),
            EngineTag::Latino => (self.latino.apply(&input), self.config.latino.ceilings),
            EngineTag::Rock => (self.rock.apply(&input), self.config.rock.ceilings),
            EngineTag::Chill => (self.chill.apply(&input), self.config.chill.ceilings),
            EngineTag::Fallback => (self.fallback.apply(&input), AuthorityCeilings::default()),
        };

        let zones = match engine_output.zones.take() {
            Some(overrides) => resolve_authority(overrides, ceilings, modifiers.brightness),
            // The generic curve carries its own caps and brightness gain.
            None => {
                let zones = self.fallback.default_zones(&input);
                if matches!(engine_output.debug, EngineDebug::None) {
                    engine_output.debug = self.fallback.debug();
                }
                zones
            }
        };
        let zones = merge_split(zones).clamped();

        let output = ReactiveOutput {
            palette: engine_output.palette.unwrap_or(*palette).to_rgb(),
            zones,
            strobe_active: engine_output.flags.strobe,
            flash_active: engine_output.flags.flash,
            solar_flare_active: engine_output.flags.solar_flare,
            dimmer_override: engine_output.dimmer_override.map(unit),
            force_movement: engine_output.force_movement,
            engine: tag,
            energy_override_active: override_active,
            color_override: engine_output.color_override,
            debug: engine_output.debug,
        };

        if self.clock.frames % TRACE_EVERY == 0 {
            tracing::trace!(
                engine = tag.as_str(),
                bass = audio.bass,
                mid = audio.mid,
                treble = audio.treble,
                front = zones.front,
                back = zones.back,
                mover = zones.mover,
                "frame"
            );
        }

        self.last_output = Some(output.clone());
        output
    }

    /// The most recent frame, if any has been produced since the last reset.
    pub fn last_output(&self) -> Option<&ReactiveOutput> {
        self.last_output.as_ref()
    }

    pub fn is_strobe_active(&self) -> bool {
        self.last_output
            .as_ref()
            .map(|output| output.strobe_active)
            .unwrap_or(false)
    }

    pub fn is_force_movement(&self) -> bool {
        self.last_output
            .as_ref()
            .map(|output| output.force_movement)
            .unwrap_or(false)
    }

    pub fn frame_count(&self) -> u64 {
        self.clock.frames
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.clock.time_ms
    }

    /// Clears every engine, the clock and the retained output.
    pub fn reset(&mut self) {
        tracing::info!("reactor reset");
        self.techno.reset();
        self.latino.reset();
        self.rock.reset();
        self.chill.reset();
        self.fallback.reset();
        self.clock.reset();
        self.last_engine = None;
        self.override_was_active = false;
        self.last_output = None;
    }

    /// Clears a single engine's private state.
    pub fn reset_engine(&mut self, tag: EngineTag) {
        tracing::info!(engine = tag.as_str(), "engine reset");
        match tag {
            EngineTag::Techno => self.techno.reset(),
            EngineTag::Latino => self.latino.reset(),
            EngineTag::Rock => self.rock.reset(),
            EngineTag::Chill => self.chill.reset(),
            EngineTag::Fallback => self.fallback.reset(),
        }
    }
}

/// Engine-authored zones win, capped by the engine's ceilings. Front also
/// carries the host brightness gain.
fn resolve_authority(
    zones: ZoneIntensities,
    ceilings: AuthorityCeilings,
    brightness: f32,
) -> ZoneIntensities {
    ZoneIntensities {
        front: (zones.front * brightness).min(ceilings.front),
        back: zones.back.min(ceilings.back),
        mover: zones.mover.min(ceilings.mover),
        mover_left: zones.mover_left.map(|value| value.min(ceilings.mover)),
        mover_right: zones.mover_right.map(|value| value.min(ceilings.mover)),
    }
}

/// Folds a left/right split into the legacy mover channel.
fn merge_split(zones: ZoneIntensities) -> ZoneIntensities {
    match (zones.mover_left, zones.mover_right) {
        (Some(left), Some(right)) => ZoneIntensities {
            mover: zones.mover.max(left).max(right),
            ..zones
        },
        (Some(side), None) | (None, Some(side)) => ZoneIntensities {
            mover: zones.mover.max(side),
            mover_left: Some(side),
            mover_right: Some(side),
            ..zones
        },
        (None, None) => zones,
    }
}
