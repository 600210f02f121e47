use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use clap::{Parser, Subcommand};
use groove_visualiser_core::{
    AppConfig, AudioFeatures, PlayerStateReport, PlayerTransport, TrackAnalysis, TrackRef,
    VisualiserEngine,
};
use tracing_subscriber::EnvFilter;

fn main() -> groove_visualiser_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Demo {
            seconds,
            fps,
            tempo,
            energy,
            danceability,
            analysis,
            track_id,
        } => run_demo(seconds, fps, tempo, energy, danceability, analysis.as_deref(), &track_id),
        Commands::Inspect { input, track_id } => run_inspect(&input, &track_id),
    }
}

/// Drives the engine against a scripted transport: play from zero, a
/// backward seek halfway through, and a pause for the final stretch. Stands
/// in for the rendering loop the real application would run.
fn run_demo(
    seconds: f32,
    fps: u32,
    tempo: f32,
    energy: f32,
    danceability: f32,
    analysis_path: Option<&std::path::Path>,
    track_id: &str,
) -> groove_visualiser_core::Result<()> {
    tracing::info!(seconds, fps, %track_id, "starting demo run");

    let config = AppConfig::default();
    let poll_interval = config.transport.poll_interval_seconds;
    let mut engine = VisualiserEngine::new(config);

    let stats = Rc::new(RefCell::new(DemoStats::default()));
    let frame_stats = Rc::clone(&stats);
    engine.subscribe_signal(move |frame| {
        let mut stats = frame_stats.borrow_mut();
        stats.frames += 1;
        stats.volume_sum += frame.volume;
        stats.peak_volume = stats.peak_volume.max(frame.volume);
    });
    let beat_stats = Rc::clone(&stats);
    engine.subscribe_beat(move |pulse| {
        let mut stats = beat_stats.borrow_mut();
        stats.beats += 1;
        tracing::debug!(time = pulse.time, intensity = pulse.intensity, "beat");
    });

    let features = AudioFeatures {
        tempo,
        energy,
        danceability,
        ..Default::default()
    };
    let mut transport = ScriptedTransport::new(track_id, seconds);

    let delta = 1.0 / fps as f32;
    let total_frames = (seconds * fps as f32).ceil() as u64;
    let mut since_poll = f32::INFINITY;

    for _ in 0..total_frames {
        // Poll fallback on the configured cadence; push events would land in
        // the engine the same way.
        if since_poll >= poll_interval {
            since_poll = 0.0;
            if let Some(report) = transport.poll_state() {
                if let Some(track) = engine.handle_report(&report) {
                    load_analysis(&mut engine, &track, analysis_path, features);
                }
            }
        }

        engine.tick(delta);
        transport.advance(delta);
        since_poll += delta;
    }

    let stats = stats.borrow();
    let average_volume = if stats.frames > 0 {
        stats.volume_sum / stats.frames as f32
    } else {
        0.0
    };
    tracing::info!(
        frames = stats.frames,
        beats = stats.beats,
        average_volume,
        peak_volume = stats.peak_volume,
        final_position = engine.position_seconds(),
        report_age = engine.seconds_since_report(),
        mode = ?engine.mode(),
        "demo finished"
    );
    Ok(())
}

fn load_analysis(
    engine: &mut VisualiserEngine,
    track: &TrackRef,
    analysis_path: Option<&std::path::Path>,
    features: AudioFeatures,
) {
    match analysis_path {
        Some(path) => match std::fs::read_to_string(path)
            .map_err(groove_visualiser_core::VisualiserError::from)
            .and_then(|payload| TrackAnalysis::from_json(&track.id, &payload))
        {
            Ok(analysis) => {
                engine.load_track(analysis, features);
            }
            Err(error) => {
                tracing::warn!(%error, "could not load analysis file");
                engine.analysis_failed(&track.id, Some(features));
            }
        },
        None => engine.analysis_failed(&track.id, Some(features)),
    }
}

fn run_inspect(input: &PathBuf, track_id: &str) -> groove_visualiser_core::Result<()> {
    let payload = std::fs::read_to_string(input)?;
    let analysis = TrackAnalysis::from_json(track_id, &payload)?;

    let coverage = analysis
        .segments
        .last()
        .map(|segment| segment.start + segment.duration)
        .unwrap_or(0.0);
    tracing::info!(
        ?input,
        beats = analysis.beats.len(),
        segments = analysis.segments.len(),
        tatums = analysis.tatums.len(),
        sections = analysis.sections.len(),
        coverage_seconds = coverage,
        "analysis payload summary"
    );
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Debug, Default)]
struct DemoStats {
    frames: u64,
    beats: u64,
    volume_sum: f32,
    peak_volume: f32,
}

/// Deterministic stand-in for the streaming player: plays from zero, seeks
/// backward at the halfway mark, pauses for the final tenth of the run.
#[derive(Debug)]
struct ScriptedTransport {
    track: TrackRef,
    position_seconds: f32,
    elapsed: f32,
    run_seconds: f32,
    seek_done: bool,
}

impl ScriptedTransport {
    fn new(track_id: &str, run_seconds: f32) -> Self {
        let mut track = TrackRef::new(track_id);
        track.name = "Demo Track".to_string();
        track.artist = "Groove Visualiser".to_string();
        Self {
            track,
            position_seconds: 0.0,
            elapsed: 0.0,
            run_seconds,
            seek_done: false,
        }
    }

    fn is_playing(&self) -> bool {
        self.elapsed < self.run_seconds * 0.9
    }

    fn advance(&mut self, delta: f32) {
        if self.is_playing() {
            self.position_seconds += delta;
        }
        self.elapsed += delta;

        if !self.seek_done && self.elapsed >= self.run_seconds * 0.5 {
            self.seek_done = true;
            self.position_seconds = self.run_seconds * 0.25;
            tracing::info!(to = self.position_seconds, "scripted backward seek");
        }
    }
}

impl PlayerTransport for ScriptedTransport {
    fn poll_state(&mut self) -> Option<PlayerStateReport> {
        Some(PlayerStateReport {
            is_playing: self.is_playing(),
            position_ms: (self.position_seconds.max(0.0) * 1000.0) as u64,
            track: Some(self.track.clone()),
        })
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Playback-synchronised music visualiser core demo", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the signal engine against a scripted transport and log the output.
    Demo {
        /// Simulated run length in seconds.
        #[arg(long, default_value_t = 20.0)]
        seconds: f32,
        /// Animation frames per second.
        #[arg(long, default_value_t = 60)]
        fps: u32,
        /// Track tempo in BPM for synthetic mode.
        #[arg(long, default_value_t = 120.0)]
        tempo: f32,
        /// Track energy in [0, 1].
        #[arg(long, default_value_t = 0.5)]
        energy: f32,
        /// Track danceability in [0, 1].
        #[arg(long, default_value_t = 0.5)]
        danceability: f32,
        /// Optional analysis payload file; synthetic mode without it.
        #[arg(short, long)]
        analysis: Option<PathBuf>,
        /// Track id the scripted transport reports.
        #[arg(long, default_value = "demo-track")]
        track_id: String,
    },
    /// Parse an analysis payload file and report what it contains.
    Inspect {
        /// Path to the analysis payload JSON.
        input: PathBuf,
        /// Track id to associate with the payload.
        #[arg(long, default_value = "local")]
        track_id: String,
    },
}
