use light_reactor_core::envelope::{HysteresisConfig, HysteresisGate, MIN_STABLE_FRAMES};
use light_reactor_core::safety::{apply_override, is_override_active, PhysicsModifier};
use light_reactor_core::{
    AudioFrame, ColorPalette, Dispatcher, EngineTag, LightKind, Modifiers, ProceduralPalette,
    ReactiveOutput, ReactorConfig, Side, StyleContext, ZoneIntensities,
};

const STYLES: [&str; 5] = ["techno", "cumbia", "rock", "chillout", "polka"];

fn zones_in_range(zones: &ZoneIntensities) -> bool {
    let unit = |value: f32| (0.0..=1.0).contains(&value);
    unit(zones.front)
        && unit(zones.back)
        && unit(zones.mover)
        && zones.mover_left.map(unit).unwrap_or(true)
        && zones.mover_right.map(unit).unwrap_or(true)
}

fn max_zone_delta(a: &ZoneIntensities, b: &ZoneIntensities) -> f32 {
    let split = |zones: &ZoneIntensities| {
        (
            zones.mover_left.unwrap_or(0.0),
            zones.mover_right.unwrap_or(0.0),
        )
    };
    let (al, ar) = split(a);
    let (bl, br) = split(b);
    [
        a.front - b.front,
        a.back - b.back,
        a.mover - b.mover,
        al - bl,
        ar - br,
    ]
    .iter()
    .fold(0.0_f32, |acc, delta| acc.max(delta.abs()))
}

fn assert_dark(output: &ReactiveOutput, label: &str) {
    assert!(output.zones.is_dark(), "{label}: zones lit {:?}", output.zones);
    assert!(!output.any_effect(), "{label}: effect flag set");
}

#[test]
fn every_output_stays_in_range() {
    let palette = ColorPalette::default();
    for style in STYLES {
        let mut dispatcher = Dispatcher::default();
        for frame in 0..400 {
            let phase = frame as f32 * 0.37;
            let mut audio = AudioFrame::new(
                (phase.sin() * 0.5 + 0.5).powi(2),
                (phase * 1.3).cos() * 0.5 + 0.5,
                ((phase * 2.1).sin() * 0.5 + 0.5).powi(3),
                (phase * 0.7).sin() * 0.5 + 0.5,
            );
            audio.flatness = Some((phase * 0.2).sin().abs());
            audio.harshness = Some((phase * 0.3).cos().abs());
            audio.ultra_air = Some((phase * 1.7).sin().abs());
            audio.centroid_hz = Some(400.0 + 3000.0 * (phase * 0.05).sin().abs());
            let modifiers = Modifiers {
                brightness: 0.5 + (frame % 7) as f32 * 0.2,
                threshold: 0.5 + (frame % 5) as f32 * 0.2,
            };

            let output = dispatcher.update(style, &palette, &audio, Some(modifiers));
            assert!(zones_in_range(&output.zones), "{style} frame {frame}");
            if let Some(dimmer) = output.dimmer_override {
                assert!((0.0..=1.0).contains(&dimmer));
            }
            if let Some(color) = output.color_override {
                assert!((0.0..360.0).contains(&color.hue_degrees()));
            }
        }
    }
}

#[test]
fn garbage_input_is_clamped_not_rejected() {
    let mut dispatcher = Dispatcher::default();
    let audio = AudioFrame {
        bass: f32::NAN,
        mid: 4.0,
        treble: f32::NEG_INFINITY,
        energy: -2.0,
        delta_ms: Some(f32::NAN),
        ..Default::default()
    };
    for style in STYLES {
        let output = dispatcher.update(style, &ColorPalette::default(), &audio, None);
        assert!(zones_in_range(&output.zones));
    }
}

#[test]
fn constant_input_converges() {
    let palette = ColorPalette::default();
    let audio = AudioFrame::new(0.7, 0.5, 0.4, 0.6);
    // The ambient engine breathes on free-running oscillators and never settles.
    for style in ["techno", "cumbia", "rock", "polka"] {
        let mut dispatcher = Dispatcher::default();
        let mut previous = dispatcher.update(style, &palette, &audio, None).zones;
        let mut settled_at = None;
        for frame in 1..200 {
            let zones = dispatcher.update(style, &palette, &audio, None).zones;
            if max_zone_delta(&zones, &previous) < 1e-4 {
                settled_at.get_or_insert(frame);
            } else {
                settled_at = None;
            }
            previous = zones;
        }
        let settled_at = settled_at.unwrap_or(usize::MAX);
        assert!(settled_at < 150, "{style} did not settle");
    }
}

#[test]
fn hysteresis_never_flips_faster_than_stable_window() {
    let mut gate = HysteresisGate::new(HysteresisConfig::default());
    let mut was_on = false;
    let mut last_flip: Option<usize> = None;

    for frame in 0..500 {
        let wobble = ((frame as f32) * 2.3).sin() * 0.08;
        gate.update("mover", 0.15 + wobble);
        let on = gate.is_on("mover");
        if on != was_on {
            if let Some(last) = last_flip {
                assert!(frame - last >= MIN_STABLE_FRAMES as usize);
            }
            last_flip = Some(frame);
            was_on = on;
        }
    }
}

#[test]
fn safety_gate_boundary() {
    assert!(!is_override_active(0.85));
    assert!(is_override_active(0.86));

    let suggestions = [
        PhysicsModifier::default(),
        PhysicsModifier {
            strobe_intensity: Some(0.3),
            flash_intensity: Some(0.3),
            trigger_threshold_mod: Some(1.2),
            confidence: 0.2,
        },
    ];
    for suggestion in suggestions {
        assert_eq!(
            apply_override(Some(suggestion), 0.99),
            Some(PhysicsModifier::maximal())
        );
        assert_eq!(apply_override(Some(suggestion), 0.85), Some(suggestion));
    }
}

#[test]
fn fast_bass_transient_reaches_front_ceiling() {
    let config = ReactorConfig::default();
    let ceiling = config.latino.ceilings.front;
    let mut dispatcher = Dispatcher::new(config);
    let palette = ColorPalette::default();

    dispatcher.update("salsa", &palette, &AudioFrame::new(0.1, 0.3, 0.2, 0.2), None);
    let output = dispatcher.update("salsa", &palette, &AudioFrame::new(0.9, 0.3, 0.2, 0.6), None);

    assert_eq!(output.engine, EngineTag::Latino);
    assert!(output.zones.front >= 0.9 * ceiling);
}

#[test]
fn silence_darkens_every_engine() {
    let palette = ColorPalette::default();
    for style in STYLES {
        let mut dispatcher = Dispatcher::default();
        for _ in 0..20 {
            dispatcher.update(style, &palette, &AudioFrame::new(0.9, 0.8, 0.9, 0.8), None);
        }
        for frame in 0..10 {
            let output = dispatcher.update(style, &palette, &AudioFrame::default(), None);
            assert_dark(&output, &format!("{style} silent frame {frame}"));
        }
    }
}

#[test]
fn drop_entry_flashes_once() {
    let mut dispatcher = Dispatcher::default();
    let palette = ColorPalette::default();
    let audio = AudioFrame::new(0.5, 0.4, 0.3, 0.5);
    let verse = StyleContext::new("fiesta latina").with_section("verse");
    let drop = StyleContext::new("fiesta latina").with_section("drop");

    for _ in 0..5 {
        let output = dispatcher.update_with_context(&verse, &palette, &audio, None);
        assert!(!output.flash_active);
    }

    let outputs: Vec<ReactiveOutput> = (0..30)
        .map(|_| dispatcher.update_with_context(&drop, &palette, &audio, None))
        .collect();

    let flashes: Vec<usize> = outputs
        .iter()
        .enumerate()
        .filter(|(_, output)| output.flash_active)
        .map(|(index, _)| index)
        .collect();
    assert_eq!(flashes, vec![2]);
    assert_eq!(outputs[0].dimmer_override, Some(0.3));
    assert_eq!(outputs[1].dimmer_override, Some(0.3));
    assert_eq!(outputs[2].dimmer_override, Some(1.0));
    assert!(outputs[3..].iter().all(|output| output.dimmer_override.is_none()));
}

#[test]
fn negative_energy_spike_blacks_out_immediately() {
    let mut dispatcher = Dispatcher::default();
    let palette = ColorPalette::default();
    dispatcher.update("reggae", &palette, &AudioFrame::new(0.8, 0.7, 0.6, 0.8), None);

    let cliff = AudioFrame::new(0.3, 0.2, 0.2, 0.2)
        .with_previous_energy(0.8)
        .with_delta_ms(25.0);
    let first = dispatcher.update("reggae", &palette, &cliff, None);
    assert_eq!(first.dimmer_override, Some(0.0));
    assert!(first.zones.is_dark());

    let steady = AudioFrame::new(0.3, 0.2, 0.2, 0.2);
    let blacked: usize = 1 + (0..5)
        .map(|_| dispatcher.update("reggae", &palette, &steady, None))
        .take_while(|output| output.dimmer_override == Some(0.0))
        .count();
    assert_eq!(blacked, ReactorConfig::default().latino.blackout_frames as usize);
}

#[test]
fn palette_aliases_are_byte_identical() {
    let generator = ProceduralPalette::default();
    for now in [0.0, 12_345.0, 987_654.0] {
        for side in [Side::Left, Side::Right, Side::Front, Side::Back] {
            for kind in [LightKind::Wash, LightKind::Spot] {
                assert_eq!(
                    generator.color_for("default", 0.7, kind, side, now),
                    generator.color_for("fuego", 0.7, kind, side, now)
                );
            }
        }
    }
}

#[test]
fn engine_state_is_not_shared() {
    let mut dispatcher = Dispatcher::default();
    let palette = ColorPalette::default();
    dispatcher.update("cumbia", &palette, &AudioFrame::new(0.8, 0.7, 0.6, 0.8), None);
    let cliff = AudioFrame::new(0.3, 0.2, 0.2, 0.2).with_previous_energy(0.8);
    assert_eq!(
        dispatcher.update("cumbia", &palette, &cliff, None).dimmer_override,
        Some(0.0)
    );

    let techno = dispatcher.update("techno", &palette, &AudioFrame::new(0.8, 0.5, 0.5, 0.6), None);
    assert_eq!(techno.dimmer_override, None);
    assert!(techno.zones.front > 0.0);

    dispatcher.reset_engine(EngineTag::Latino);
    let resumed = dispatcher.update("cumbia", &palette, &AudioFrame::new(0.3, 0.2, 0.2, 0.2), None);
    assert_eq!(resumed.dimmer_override, None);
}

#[test]
fn injected_config_changes_behaviour() {
    let config = ReactorConfig::from_json_str(r#"{ "latino": { "blackout_frames": 5 } }"#).unwrap();
    let mut dispatcher = Dispatcher::new(config);
    let palette = ColorPalette::default();
    dispatcher.update("bachata", &palette, &AudioFrame::new(0.8, 0.7, 0.6, 0.8), None);

    let cliff = AudioFrame::new(0.3, 0.2, 0.2, 0.2).with_previous_energy(0.8);
    dispatcher.update("bachata", &palette, &cliff, None);
    let steady = AudioFrame::new(0.3, 0.2, 0.2, 0.2);
    for _ in 0..4 {
        assert_eq!(
            dispatcher.update("bachata", &palette, &steady, None).dimmer_override,
            Some(0.0)
        );
    }
    assert_eq!(
        dispatcher.update("bachata", &palette, &steady, None).dimmer_override,
        None
    );
}

#[test]
fn fallback_brightness_applies_once_under_front_ceiling() {
    let bright = Modifiers {
        brightness: 1.2,
        threshold: 1.0,
    };
    let palette = ColorPalette::default();
    for (bass, expected) in [(1.0_f32, 0.95_f32), (0.6, 0.6_f32.powf(1.2) * 1.2)] {
        let mut dispatcher = Dispatcher::default();
        let output = dispatcher.update("polka", &palette, &AudioFrame::new(bass, 0.2, 0.2, 0.4), Some(bright));
        assert!((output.zones.front - expected).abs() < 1e-5, "bass {bass}");
        assert!(output.zones.front <= 0.95);
    }
}

#[test]
fn returning_to_an_engine_does_not_replay_stale_energy() {
    let mut dispatcher = Dispatcher::default();
    let palette = ColorPalette::default();
    dispatcher.update("cumbia", &palette, &AudioFrame::new(0.8, 0.7, 0.6, 0.8), None);
    for _ in 0..400 {
        dispatcher.update("techno", &palette, &AudioFrame::new(0.5, 0.4, 0.4, 0.5), None);
    }

    let back = dispatcher.update("cumbia", &palette, &AudioFrame::new(0.3, 0.2, 0.2, 0.3), None);
    assert_eq!(back.engine, EngineTag::Latino);
    assert_eq!(back.dimmer_override, None);
}

#[test]
fn gate_dropouts_respect_stable_window() {
    let mut gate = HysteresisGate::new(HysteresisConfig::default());
    let mut was_on = false;
    let mut last_flip: Option<usize> = None;
    let mut transitions = 0;

    for (frame, signal) in [0.6, 0.6, 0.0].iter().cycle().take(30).enumerate() {
        gate.update("mover", *signal);
        let on = gate.is_on("mover");
        if on != was_on {
            if let Some(last) = last_flip {
                assert!(frame - last >= MIN_STABLE_FRAMES as usize);
            }
            last_flip = Some(frame);
            was_on = on;
            transitions += 1;
        }
    }
    assert_eq!(gate.flips("mover"), transitions);
}
