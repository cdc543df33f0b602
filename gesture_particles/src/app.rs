//! Top-level application loop.
//!
//! `run` owns the [`Visualizer`], the [`SimulationContext`] and the
//! detection thread.  Each frame it drains window input, hands the newest
//! detection result to the context, ticks the simulation with the measured
//! frame time and renders.

use std::path::Path;
use std::sync::mpsc::{self, Sender};
use std::time::Instant;

use serde::Deserialize;
use tracing::info;

use particle_physics::{
    adaptive_count, CohesionSampling, ParticleField, PhysicsIntegrator, PhysicsMode,
    MAX_PARTICLES, MAX_TIMESTEP, MIN_PARTICLES,
};

use crate::context::{PipelineParams, SimulationContext};
use crate::error::AppError;
use crate::source::{
    spawn_detection, DetectionHandle, SimInput, SimLandmarkSource, DEFAULT_DETECT_HZ,
};
use crate::visualizer::{Command, FrameView, Visualizer, DEFAULT_FRAME_HZ};

/// Radius of the ball the particle targets are scattered in (world units).
const FIELD_RADIUS: f32 = 3.0;

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

/// Configuration for the full application.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Fixed particle count; `None` sizes the field from the machine.
    pub particles: Option<usize>,
    pub seed: u64,
    /// Landmark detection rate (Hz).
    pub detect_hz: f64,
    /// Render frame cap (Hz).
    pub frame_hz: f64,
    pub max_timestep: f32,
    /// Pause detection and physics while the window has no focus.
    pub pause_when_unfocused: bool,
    pub pipeline: PipelineParams,
    pub cohesion: CohesionSampling,
    /// Physics regime the field starts in.
    pub initial_mode: PhysicsMode,
    /// Positional noise of the simulated hands (normalized image units).
    pub sim_jitter: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            particles:            None,
            seed:                 7,
            detect_hz:            DEFAULT_DETECT_HZ,
            frame_hz:             DEFAULT_FRAME_HZ,
            max_timestep:         MAX_TIMESTEP,
            pause_when_unfocused: true,
            pipeline:             PipelineParams::default(),
            cohesion:             CohesionSampling::default(),
            initial_mode:         PhysicsMode::Normal,
            sim_jitter:           0.002,
        }
    }
}

impl AppConfig {
    /// Read a JSON config; missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path).map_err(|source| AppError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| AppError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn particle_count(&self) -> usize {
        match self.particles {
            Some(n) => n.clamp(MIN_PARTICLES, MAX_PARTICLES),
            None => {
                let cores = std::thread::available_parallelism().map_or(1, |n| n.get());
                adaptive_count(cores)
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Wiring
// ════════════════════════════════════════════════════════════════════════════

/// Build the particle field, integrator and gesture pipeline for `cfg`.
pub fn build_context(cfg: &AppConfig) -> SimulationContext {
    let field = ParticleField::scattered(cfg.particle_count(), FIELD_RADIUS, cfg.seed);
    let mut physics = PhysicsIntegrator::new(field, cfg.seed).with_sampling(cfg.cohesion);
    physics.set_mode(cfg.initial_mode);
    SimulationContext::new(cfg.pipeline, physics).with_max_timestep(cfg.max_timestep)
}

/// Start the landmark source.  Returns the sender for simulated input when
/// the simulator is in use.
pub fn start_detection(cfg: &AppConfig) -> (DetectionHandle, Option<Sender<SimInput>>) {
    #[cfg(feature = "leap")]
    match crate::source::LeapLandmarkSource::open() {
        Ok(source) => return (spawn_detection(source, cfg.detect_hz), None),
        Err(e) => tracing::warn!(error = %e, "LeapMotion unavailable, using simulated hands"),
    }

    let (tx, rx) = mpsc::channel();
    let source = SimLandmarkSource::new(rx, cfg.seed).with_jitter(cfg.sim_jitter);
    (spawn_detection(source, cfg.detect_hz), Some(tx))
}

/// Exponentially averaged frames per second.
#[derive(Clone, Copy, Debug, Default)]
pub struct FpsMeter {
    fps: f32,
}

impl FpsMeter {
    pub fn record(&mut self, dt: f32) -> f32 {
        if dt > 0.0 && dt.is_finite() {
            let instant = 1.0 / dt;
            self.fps = if self.fps == 0.0 { instant } else { self.fps * 0.9 + instant * 0.1 };
        }
        self.fps
    }
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// Run the full application until the window closes or `Q` is pressed.
pub fn run(cfg: AppConfig) -> Result<(), AppError> {
    let mut vis = Visualizer::new(cfg.frame_hz)?;
    let mut ctx = build_context(&cfg);
    info!(particles = ctx.physics().len(), "window open");

    let (handle, sim_tx) = start_detection(&cfg);
    let mut detection = Some(handle);
    vis.set_sim_sender(sim_tx);

    let mut fps = FpsMeter::default();
    let mut last = Instant::now();

    'frames: while vis.is_open() {
        // 1. Window input
        for command in vis.poll_input() {
            match command {
                Command::Quit => break 'frames,
                Command::ToggleGestures => {
                    let enabled = !ctx.gestures_enabled();
                    ctx.set_gestures_enabled(enabled);
                }
                Command::ToggleDetection => match detection.take() {
                    Some(mut running) => {
                        running.stop();
                        ctx.release_hands();
                        vis.set_sim_sender(None);
                    }
                    None => {
                        let (handle, sim_tx) = start_detection(&cfg);
                        detection = Some(handle);
                        vis.set_sim_sender(sim_tx);
                    }
                },
                Command::CycleMode => {
                    ctx.cycle_physics_mode();
                }
            }
        }

        // 2. Visibility
        if cfg.pause_when_unfocused {
            let visible = vis.is_active();
            if visible != ctx.is_visible() {
                ctx.set_visible(visible);
                if let Some(running) = &detection {
                    running.pause(!visible);
                }
            }
        }

        // 3. Newest detection result
        if let Some(frame) = detection.as_ref().and_then(DetectionHandle::poll_latest) {
            ctx.consume_frame(&frame);
        }

        // 4. Simulate with the measured frame time
        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f32();
        last = now;
        ctx.tick(dt);

        // 5. Render
        let view = FrameView {
            positions:        ctx.positions(),
            species:          ctx.physics().field().species(),
            controls:         ctx.controls(),
            clock:            ctx.clock(),
            landmarks:        ctx.last_frame(),
            attractors:       ctx.attractors(),
            gesture:          ctx.gesture_state(),
            mode:             ctx.mode(),
            fps:              fps.record(dt),
            detecting:        detection.is_some(),
            gestures_enabled: ctx.gestures_enabled(),
        };
        vis.render(&view);
    }

    if let Some(mut running) = detection {
        running.stop();
    }
    info!("window closed");
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_config(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir()
            .join(format!("gesture_particles_{}_{name}.json", std::process::id()));
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn defaults_match_documented_rates() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.detect_hz, 20.0);
        assert_eq!(cfg.frame_hz, 60.0);
        assert_eq!(cfg.max_timestep, 0.1);
        assert_eq!(cfg.pipeline.fusion_threshold, 0.7);
    }

    #[test]
    fn particle_count_is_clamped() {
        let mut cfg = AppConfig::default();
        cfg.particles = Some(10);
        assert_eq!(cfg.particle_count(), MIN_PARTICLES);
        cfg.particles = Some(1_000_000);
        assert_eq!(cfg.particle_count(), MAX_PARTICLES);
        cfg.particles = None;
        let n = cfg.particle_count();
        assert!((MIN_PARTICLES..=MAX_PARTICLES).contains(&n));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let path = temp_config(
            "partial",
            r#"{ "seed": 42, "pipeline": { "fusion_threshold": 0.9 } }"#,
        );
        let cfg = AppConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(cfg.seed, 42);
        assert_eq!(cfg.pipeline.fusion_threshold, 0.9);
        assert_eq!(cfg.detect_hz, 20.0);
        assert_eq!(cfg.cohesion, CohesionSampling::default());
    }

    #[test]
    fn config_picks_starting_mode() {
        let path = temp_config("mode", r#"{ "initial_mode": "anti-gravity", "particles": 8000 }"#);
        let cfg = AppConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(cfg.initial_mode, PhysicsMode::AntiGravity);
        assert_eq!(build_context(&cfg).mode(), PhysicsMode::AntiGravity);
    }

    #[test]
    fn bad_config_reports_path() {
        let path = temp_config("bad", "{ not json");
        let err = AppConfig::load(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, AppError::ConfigParse { .. }));
        assert!(err.to_string().contains("gesture_particles_"));

        let missing = std::env::temp_dir().join("gesture_particles_does_not_exist.json");
        assert!(matches!(
            AppConfig::load(&missing),
            Err(AppError::ConfigRead { .. })
        ));
    }

    #[test]
    fn built_context_starts_idle() {
        let mut cfg = AppConfig::default();
        cfg.particles = Some(MIN_PARTICLES);
        let ctx = build_context(&cfg);
        assert_eq!(ctx.physics().len(), MIN_PARTICLES);
        assert_eq!(ctx.mode(), PhysicsMode::Normal);
        assert_eq!(ctx.gesture_state().active_label, "auto");
    }

    #[test]
    fn simulated_detection_delivers_frames() {
        let cfg = AppConfig {
            detect_hz: 200.0,
            ..AppConfig::default()
        };
        let (mut handle, tx) = start_detection(&cfg);
        let tx = tx.unwrap();
        tx.send(SimInput::Pose(Some(hand_signal::synthetic::HandPose::Fist))).unwrap();

        let mut seen = None;
        for _ in 0..100 {
            std::thread::sleep(std::time::Duration::from_millis(10));
            if let Some(frame) = handle.poll_latest().filter(|f| !f.hands.is_empty()) {
                seen = Some(frame);
                break;
            }
        }
        handle.stop();
        assert_eq!(seen.map(|f| f.hands.len()), Some(1));
    }

    #[test]
    fn fps_meter_smooths() {
        let mut meter = FpsMeter::default();
        assert_eq!(meter.record(0.0), 0.0);
        assert!((meter.record(1.0 / 60.0) - 60.0).abs() < 1e-3);
        let next = meter.record(1.0 / 30.0);
        assert!(next < 60.0 && next > 30.0);
    }
}
