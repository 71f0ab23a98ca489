use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::{Parser, Subcommand};
use vibe_volume::api::types::TickUpdate;
use vibe_volume::config::AppConfig;
use vibe_volume::engine::backend::{SimMotionSource, SimProximityScanner, SimVolumeSink};
use vibe_volume::engine::{EngineHandle, ParamPatch};
use vibe_volume::sensing::curve::{shape, CurveMode};

#[derive(Parser, Debug)]
#[command(
    name = "vibe_cli",
    about = "Simulated sensing-session harness for the VibeVolume core"
)]
struct Cli {
    /// Override path to the JSON config (defaults to assets/vibe_config.json)
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a simulated sensing session and stream tick updates to stdout
    Run {
        #[arg(long, default_value_t = 60_000)]
        duration_ms: u64,
        #[arg(long)]
        min: Option<u32>,
        #[arg(long)]
        max: Option<u32>,
        #[arg(long)]
        curve: Option<CurveMode>,
        /// Emit one JSON object per tick instead of the human-readable line
        #[arg(long, default_value_t = false)]
        json: bool,
        /// Expose the debug HTTP endpoints while the session runs
        /// (requires a debug build with the debug_http feature)
        #[arg(long, default_value_t = false)]
        serve_debug: bool,
    },
    /// Print the shaped response of each curve across the score range
    Curves {
        #[arg(long, default_value_t = 11)]
        steps: usize,
    },
    /// Print the effective configuration as JSON
    DumpConfig,
}

fn main() -> ExitCode {
    vibe_volume::init_logging();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = cli
        .config
        .map(AppConfig::load_from_file)
        .unwrap_or_else(AppConfig::load);

    match cli.command {
        Commands::Run {
            duration_ms,
            min,
            max,
            curve,
            json,
            serve_debug,
        } => run_session(config, duration_ms, min, max, curve, json, serve_debug),
        Commands::Curves { steps } => run_curves(steps),
        Commands::DumpConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(ExitCode::from(0))
        }
    }
}

fn run_session(
    config: AppConfig,
    duration_ms: u64,
    min: Option<u32>,
    max: Option<u32>,
    curve: Option<CurveMode>,
    json: bool,
    serve_debug: bool,
) -> Result<ExitCode> {
    // Leaked so the debug HTTP server can borrow it for the process lifetime.
    let engine: &'static EngineHandle = Box::leak(Box::new(EngineHandle::with_backends(
        config,
        Arc::new(SimMotionSource::default()),
        Arc::new(SimProximityScanner::default()),
        Arc::new(SimVolumeSink::default()),
    )));
    engine.apply_patch(ParamPatch {
        min_volume: min,
        max_volume: max,
        curve_mode: curve,
    })?;
    if serve_debug {
        vibe_volume::http::spawn_if_enabled(engine);
    }

    let mut ticks = engine.subscribe_tick_updates();
    engine.start_session()?;

    let deadline = Instant::now() + Duration::from_millis(duration_ms);
    while Instant::now() < deadline {
        match ticks.try_recv() {
            Ok(update) => emit_tick(&update, json)?,
            Err(_) => thread::sleep(Duration::from_millis(25)),
        }
    }

    engine.stop_session()?;
    Ok(ExitCode::from(0))
}

fn emit_tick(update: &TickUpdate, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(update)?);
    } else {
        println!(
            "t={:>7}ms devices={} energy={:.4} crowd={:>3.0}% volume={} (target {})",
            update.timestamp_ms,
            update.device_count,
            update.vibration_energy,
            update.shaped_score * 100.0,
            update.applied_volume,
            update.target_volume
        );
    }
    Ok(())
}

fn run_curves(steps: usize) -> Result<ExitCode> {
    let steps = steps.max(2);
    let modes = [CurveMode::Gradual, CurveMode::Medium, CurveMode::Aggressive];

    for mode in modes {
        println!("{}: {}", mode, mode.description());
    }
    println!();
    println!("{:>6}  {:>8}  {:>8}  {:>10}", "raw", "gradual", "medium", "aggressive");
    for i in 0..steps {
        let raw = i as f32 / (steps - 1) as f32;
        println!(
            "{:>6.2}  {:>8.3}  {:>8.3}  {:>10.3}",
            raw,
            shape(raw, CurveMode::Gradual),
            shape(raw, CurveMode::Medium),
            shape(raw, CurveMode::Aggressive)
        );
    }

    Ok(ExitCode::from(0))
}
