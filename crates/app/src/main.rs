use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use spiral_rhythm_core::{
    dial_angle, dial_outline, shade, tier::derive_plans, AppConfig, ClockSource, CopyLayout,
    CountsUpdate, ManualClock, Point2D, PulseRecorder, RhythmEngine, RhythmError, SharedEngine,
    SystemClock, TierId, TracingVoiceBank,
};
use tracing_subscriber::EnvFilter;

fn main() -> spiral_rhythm_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            engine,
            duration,
            retempo,
        } => run_play(&engine, duration, retempo),
        Commands::Simulate {
            engine,
            seconds,
            step_ms,
            json,
        } => run_simulate(&engine, seconds, step_ms, json),
        Commands::Project {
            copies,
            radius,
            angle,
            phase,
        } => run_project(copies, radius, angle, phase),
    }
}

fn run_play(
    args: &EngineArgs,
    duration: f64,
    retempo: Option<f64>,
) -> spiral_rhythm_core::Result<()> {
    let half = half_duration(duration)?;
    let config = args.load()?;
    tracing::info!(
        tempo_bpm = config.engine.tempo_bpm,
        counts = ?config.engine.counts,
        duration,
        "starting live playback"
    );

    let engine =
        RhythmEngine::from_config(SystemClock::new(), TracingVoiceBank::new(), &config);
    let shared = SharedEngine::new(engine);
    let running = Arc::new(AtomicBool::new(true));
    let interval = Duration::from_millis(config.engine.tick_interval_ms.max(1));

    shared.start()?;
    let ticker = {
        let shared = shared.clone();
        let running = running.clone();
        thread::spawn(move || -> spiral_rhythm_core::Result<()> {
            while running.load(Ordering::Relaxed) {
                shared.tick()?;
                thread::sleep(interval);
            }
            Ok(())
        })
    };

    thread::sleep(half);
    if let Some(bpm) = retempo {
        tracing::info!(bpm, "retempo");
        shared.set_tempo(bpm)?;
    }
    thread::sleep(half);

    running.store(false, Ordering::Relaxed);
    ticker
        .join()
        .map_err(|_| RhythmError::WorkerPanicked("ticker"))??;
    shared.stop()?;

    let played = shared.with(|engine| engine.voices().played())?;
    tracing::info!(played, elapsed = shared.elapsed()?, "playback finished");
    Ok(())
}

/// Half of `duration` seconds, rejecting values a `Duration` cannot hold.
fn half_duration(duration: f64) -> spiral_rhythm_core::Result<Duration> {
    if !(duration.is_finite() && duration > 0.0) {
        return Err(RhythmError::InvalidInput(
            "duration must be a positive number of seconds",
        ));
    }
    Duration::try_from_secs_f64(duration / 2.0)
        .map_err(|_| RhythmError::InvalidInput("duration is too long"))
}

fn run_simulate(
    args: &EngineArgs,
    seconds: f64,
    step_ms: u64,
    json: bool,
) -> spiral_rhythm_core::Result<()> {
    if !(seconds.is_finite() && seconds >= 0.0) {
        return Err(RhythmError::InvalidInput("seconds must be non-negative"));
    }
    if step_ms == 0 {
        return Err(RhythmError::InvalidInput(
            "step must be at least one millisecond",
        ));
    }
    let config = args.load()?;
    let clock = ManualClock::new(0.0);
    let mut engine = RhythmEngine::from_config(clock.clone(), PulseRecorder::new(), &config);
    let step = step_ms as f64 / 1000.0;

    engine.start();
    while clock.now().unwrap_or(seconds) + step <= seconds {
        clock.advance(step);
        engine.tick();
    }
    engine.stop();

    let pulses = engine.voices_mut().take();
    if json {
        println!("{}", serde_json::to_string_pretty(&pulses)?);
        return Ok(());
    }

    let plans = derive_plans(engine.tempo_bpm(), engine.counts());
    for (tier, plan) in plans.iter() {
        println!(
            "# {tier:<4} segment {:.4}s  cycle {}  audible every {:.4}s",
            plan.segment_duration,
            plan.cycle_segments,
            plan.audible_period()
        );
    }
    for pulse in pulses {
        println!("{:>9.4}  {:<4}  gain {:.2}", pulse.time, pulse.tier, pulse.gain);
    }
    Ok(())
}

fn run_project(
    copies: usize,
    radius: f64,
    angle: Option<f64>,
    phase: f64,
) -> spiral_rhythm_core::Result<()> {
    if copies == 0 {
        return Err(RhythmError::InvalidInput("at least one copy is required"));
    }
    let angle = angle.unwrap_or_else(|| dial_angle(phase));
    let anchor = Point2D::new(0.0, 0.0);
    let layout = CopyLayout::ring(anchor, copies, radius);
    let mut shape = dial_outline(Point2D::new(radius, 0.0), radius * 0.5, 12);
    shape.push(anchor);

    let projected = layout.project(&shape, angle);
    for copy in &projected {
        let lit: Vec<f64> = copy.points.iter().map(|p| shade(p.height, radius)).collect();
        tracing::debug!(center = ?copy.center, ?lit, "copy shading");
    }
    println!("{}", serde_json::to_string_pretty(&projected)?);
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Polyrhythm scheduler for spiral toys", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Engine settings shared by the scheduler subcommands.
#[derive(Args, Debug)]
struct EngineArgs {
    /// JSON config file; command line flags override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Base tempo in beats per minute.
    #[arg(short, long)]
    tempo: Option<f64>,
    #[arg(long)]
    div1: Option<u32>,
    #[arg(long)]
    div2: Option<u32>,
    #[arg(long)]
    div3: Option<u32>,
    /// Tiers to start muted (base, div1, div2, div3).
    #[arg(long, value_delimiter = ',')]
    mute: Vec<TierId>,
}

impl EngineArgs {
    fn load(&self) -> spiral_rhythm_core::Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_path(path)?,
            None => AppConfig::default(),
        };
        if let Some(tempo) = self.tempo {
            config.engine.tempo_bpm = tempo;
        }
        config.engine.counts = config.engine.counts.merged(CountsUpdate {
            div1: self.div1,
            div2: self.div2,
            div3: self.div3,
        });
        for tier in &self.mute {
            config.engine.muted[*tier] = true;
        }
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the scheduler against the system clock and log every pulse.
    Play {
        #[command(flatten)]
        engine: EngineArgs,
        /// How long to play, in seconds.
        #[arg(short, long, default_value_t = 8.0)]
        duration: f64,
        /// Tempo to switch to halfway through.
        #[arg(long)]
        retempo: Option<f64>,
    },
    /// Run the scheduler on a simulated clock and print the pulse timeline.
    Simulate {
        #[command(flatten)]
        engine: EngineArgs,
        /// Simulated length in seconds.
        #[arg(short, long, default_value_t = 4.0)]
        seconds: f64,
        /// Host tick interval in milliseconds.
        #[arg(long, default_value_t = 25)]
        step_ms: u64,
        /// Emit pulses as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Print rotated copies of a dial that share one anchor.
    Project {
        /// Number of copies arranged around the anchor.
        #[arg(short = 'n', long, default_value_t = 4)]
        copies: usize,
        /// Distance from the anchor to each copy's center.
        #[arg(short, long, default_value_t = 100.0)]
        radius: f64,
        /// Rotation in radians; overrides `--phase`.
        #[arg(short, long, allow_hyphen_values = true)]
        angle: Option<f64>,
        /// Cycle phase in [0, 1) mapped onto a full turn.
        #[arg(short, long, default_value_t = 0.125)]
        phase: f64,
    },
}
