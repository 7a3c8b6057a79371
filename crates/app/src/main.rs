use std::f32::consts::TAU;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use light_reactor_core::{
    AudioFrame, ColorPalette, Dispatcher, Modifiers, PaletteName, ProceduralPalette,
    ReactorConfig, ReactorError, StyleContext,
};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

fn main() -> light_reactor_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Simulate {
            style,
            frames,
            pattern,
            bpm,
        } => run_simulate(config, &style, frames, pattern, bpm),
        Commands::Replay { input } => run_replay(config, &input),
        Commands::Palette {
            name,
            intensity,
            time_ms,
        } => run_palette(config, &name, intensity, time_ms),
    }
}

fn load_config(path: Option<&Path>) -> light_reactor_core::Result<ReactorConfig> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading config");
            let source = std::fs::read_to_string(path)?;
            ReactorConfig::from_json_str(&source)
        }
        None => Ok(ReactorConfig::live_defaults()),
    }
}

fn run_simulate(
    config: ReactorConfig,
    style: &str,
    frames: usize,
    pattern: Pattern,
    bpm: f32,
) -> light_reactor_core::Result<()> {
    tracing::info!(style, frames, ?pattern, bpm, "starting simulation");

    let interval_ms = config.frame_interval_ms;
    let mut dispatcher = Dispatcher::new(config);
    let palette = ColorPalette::default();
    let mut out = BufWriter::new(io::stdout().lock());
    let mut previous_energy = None;

    for frame in 0..frames {
        let time_ms = frame as f32 * interval_ms;
        let (mut audio, section) = synthesize(pattern, frame, frames, time_ms, bpm);
        audio.previous_energy = previous_energy;
        audio.delta_ms = Some(interval_ms);
        audio.bpm = Some(bpm);
        previous_energy = Some(audio.energy);

        let context = StyleContext {
            name: style.to_string(),
            bpm: Some(bpm),
            section: section.map(str::to_string),
        };
        let output = dispatcher.update_with_context(&context, &palette, &audio, None);
        writeln!(out, "{}", serde_json::to_string(&output)?)?;
    }

    out.flush()?;
    Ok(())
}

fn run_replay(config: ReactorConfig, input: &Path) -> light_reactor_core::Result<()> {
    tracing::info!(?input, "replaying recorded frames");

    let file = std::fs::File::open(input)?;
    let mut dispatcher = Dispatcher::new(config);
    let mut out = BufWriter::new(io::stdout().lock());

    for (index, line) in io::BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: ReplayRecord = serde_json::from_str(&line).map_err(|err| {
            ReactorError::msg(format!("line {}: {err}", index + 1))
        })?;

        let context = StyleContext {
            name: record.style,
            bpm: record.audio.bpm,
            section: record.section,
        };
        let palette = record.palette.unwrap_or_default();
        let output =
            dispatcher.update_with_context(&context, &palette, &record.audio, record.modifiers);
        writeln!(out, "{}", serde_json::to_string(&output)?)?;
    }

    out.flush()?;
    tracing::info!(frames = dispatcher.frame_count(), "replay finished");
    Ok(())
}

fn run_palette(
    config: ReactorConfig,
    name: &str,
    intensity: f32,
    time_ms: f64,
) -> light_reactor_core::Result<()> {
    let resolved = PaletteName::resolve(name);
    tracing::info!(requested = name, resolved = resolved.as_str(), "rendering palette");

    let mut generator = ProceduralPalette::new(config.palette);
    generator.set_palette_immediate(name);
    let colors = generator.zone_colors(intensity, time_ms);
    println!("{}", serde_json::to_string_pretty(&colors)?);
    Ok(())
}

/// Synthetic audio for one frame of a test pattern.
fn synthesize(
    pattern: Pattern,
    frame: usize,
    frames: usize,
    time_ms: f32,
    bpm: f32,
) -> (AudioFrame, Option<&'static str>) {
    let beat_ms = 60_000.0 / bpm.max(1.0);
    let phase = (time_ms / beat_ms).fract();
    let kick = (-phase * 8.0).exp();
    let hat = (-((phase + 0.5).fract()) * 14.0).exp();

    match pattern {
        Pattern::Silence => (AudioFrame::default(), None),
        Pattern::Pulse => {
            let mid = 0.4 + 0.1 * (time_ms / 900.0).sin();
            let treble = 0.25 + 0.5 * hat;
            (with_energy(kick, mid, treble), Some("verse"))
        }
        Pattern::Drop => {
            let progress = frame as f32 / frames.max(1) as f32;
            if progress < 0.5 {
                let build = progress * 2.0;
                let treble = 0.2 + 0.6 * build * hat.max(0.3);
                (with_energy(0.1, 0.3 + 0.2 * build, treble), Some("buildup"))
            } else {
                let treble = 0.3 + 0.5 * hat;
                (with_energy(0.3 + 0.7 * kick, 0.6, treble), Some("drop"))
            }
        }
        Pattern::Sweep => {
            let t = time_ms / 4000.0;
            let band = |offset: f32| 0.5 + 0.5 * (TAU * t + offset).sin();
            (with_energy(band(0.0), band(2.1), band(4.2)), None)
        }
    }
}

fn with_energy(bass: f32, mid: f32, treble: f32) -> AudioFrame {
    let energy = (bass + mid + treble) / 3.0;
    AudioFrame::new(bass, mid, treble, energy)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

/// One line of a replay file.
#[derive(Debug, Deserialize)]
struct ReplayRecord {
    style: String,
    audio: AudioFrame,
    #[serde(default)]
    palette: Option<ColorPalette>,
    #[serde(default)]
    modifiers: Option<Modifiers>,
    #[serde(default)]
    section: Option<String>,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Audio-reactive lighting engine", long_about = None)]
struct Cli {
    /// Optional JSON file overriding the default tuning.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drive the reactor with a synthetic pattern and print one JSON frame per line.
    Simulate {
        /// Style name routed to a genre engine (e.g. techno, cumbia, rock, chill).
        #[arg(short, long, default_value = "techno")]
        style: String,
        #[arg(short, long, default_value_t = 200)]
        frames: usize,
        #[arg(short, long, value_enum, default_value_t = Pattern::Pulse)]
        pattern: Pattern,
        #[arg(long, default_value_t = 124.0)]
        bpm: f32,
    },
    /// Feed recorded frames from a JSON-lines file through the reactor.
    Replay {
        /// Each line holds `style`, `audio` and optional `palette`, `modifiers`, `section`.
        input: PathBuf,
    },
    /// Print the procedural colours a named palette produces for each zone.
    Palette {
        #[arg(short, long, default_value = "fuego")]
        name: String,
        #[arg(short, long, default_value_t = 0.7)]
        intensity: f32,
        #[arg(short, long, default_value_t = 0.0)]
        time_ms: f64,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Pattern {
    Silence,
    Pulse,
    Drop,
    Sweep,
}
