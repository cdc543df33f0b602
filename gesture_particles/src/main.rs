//! gesture_particles — interactive entry point.

use std::path::PathBuf;

use clap::Parser;
use gesture_particles::app::{run, AppConfig};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Hand-gesture controlled particle field
#[derive(Parser, Debug)]
#[command(name = "gesture_particles")]
#[command(version, about = "Shape a particle field with hand gestures", long_about = None)]
struct Cli {
    /// JSON config file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Particle count (clamped to 8000..=40000; default adapts to the machine)
    #[arg(short, long)]
    particles: Option<usize>,

    /// RNG seed for the particle field and physics noise
    #[arg(long)]
    seed: Option<u64>,

    /// Landmark detection rate in Hz
    #[arg(long)]
    detect_hz: Option<f64>,

    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Skip the banner and start with defaults
    #[arg(long)]
    quick: bool,
}

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: could not install log subscriber: {}", e);
    }

    let mut cfg = match cli.config.as_deref().map(AppConfig::load).transpose() {
        Ok(cfg) => cfg.unwrap_or_default(),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    if cli.particles.is_some() { cfg.particles = cli.particles; }
    if let Some(seed) = cli.seed { cfg.seed = seed; }
    if let Some(hz) = cli.detect_hz { cfg.detect_hz = hz; }

    if !cli.quick {
        print_banner(&cfg);
    }

    if let Err(e) = run(cfg) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_banner(cfg: &AppConfig) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║        Gesture Particles — hand-driven particle field        ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    #[cfg(feature = "leap")]
    println!("  Source: LeapMotion hardware (falls back to simulation)");
    #[cfg(not(feature = "leap"))]
    println!("  Source: Keyboard/mouse simulation  (use --features leap for hardware)");
    println!("  Particles: {}   Detection: {} Hz", cfg.particle_count(), cfg.detect_hz);
    println!();
    println!("  0 fist  1-5 fingers  P pinch  V peace  H hide  TAB two hands");
    println!("  R/E twist  G gestures  C detection  M mode  Q quit");
    println!();
    println!("  Opening visualizer window…");
    println!();
}
