//! One simulation instance: every piece of mutable state the pipeline keeps
//! between ticks, behind two entry points.
//!
//! * [`SimulationContext::consume_frame`] — runs at detection rate: filter,
//!   analyze, classify, fuse, debounce, mode switch; caches the resulting
//!   cues and attractor points.
//! * [`SimulationContext::tick`] — runs at render rate: smooth the controls
//!   toward the cached gesture and integrate the particles.
//!
//! Both are no-ops while the view is hidden; nothing is discarded, so a
//! hidden context resumes exactly where it stopped.

use glam::Vec3;
use serde::Deserialize;
use tracing::{debug, info};

use hand_signal::geometry::palm_center;
use hand_signal::landmark::FINGERTIPS;
use hand_signal::{
    aggregate, fuse, AsyncClassifier, Classification, FilterBank, FilterParams,
    GeometryThresholds, Gesture, GestureState, GestureStateMachine, HandFeatures,
    HysteresisParams, LandmarkFrame, ModeSwitchParams, ModeSwitcher, RuleClassifier,
    SwipeDirection, SwipeParams, TwistTracker,
};
use particle_physics::{PhysicsIntegrator, PhysicsMode, MAX_TIMESTEP};

use crate::controls::{ControlSmoother, ControlState, GestureCues, SmoothingParams};

/// Half the side of the world box hand landmarks are mapped into.
pub const WORLD_HALF_EXTENT: f32 = 4.0;

/// Normalized image coordinates (y down) → world coordinates (y up),
/// image center at the origin.
pub fn to_world(p: Vec3) -> Vec3 {
    let k = 2.0 * WORLD_HALF_EXTENT;
    Vec3::new((p.x - 0.5) * k, (0.5 - p.y) * k, -p.z * k)
}

/// Tunables of the gesture pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineParams {
    pub filter: FilterParams,
    pub geometry: GeometryThresholds,
    pub swipe: SwipeParams,
    pub hysteresis: HysteresisParams,
    pub mode_switch: ModeSwitchParams,
    pub smoothing: SmoothingParams,
    /// External classifier results must beat this confidence.
    pub fusion_threshold: f32,
}

impl Default for PipelineParams {
    fn default() -> Self {
        PipelineParams {
            filter: FilterParams::default(),
            geometry: GeometryThresholds::default(),
            swipe: SwipeParams::default(),
            hysteresis: HysteresisParams::default(),
            mode_switch: ModeSwitchParams::default(),
            smoothing: SmoothingParams::default(),
            fusion_threshold: 0.7,
        }
    }
}

pub struct SimulationContext {
    thresholds: GeometryThresholds,
    filters: FilterBank,
    classifier: RuleClassifier,
    external: Option<AsyncClassifier>,
    twist: TwistTracker,
    gestures: GestureStateMachine,
    mode_switch: ModeSwitcher,
    smoother: ControlSmoother,
    physics: PhysicsIntegrator,

    // ── cached per detection, reused by every tick ───────────────────────
    cues: Option<GestureCues>,
    attractors: Vec<Vec3>,
    last_frame: LandmarkFrame,
    last_classification: Classification,

    clock: f64,
    max_timestep: f32,
    visible: bool,
    gestures_enabled: bool,
}

impl SimulationContext {
    pub fn new(params: PipelineParams, physics: PhysicsIntegrator) -> Self {
        SimulationContext {
            thresholds: params.geometry,
            filters: FilterBank::new(params.filter),
            classifier: RuleClassifier::new(params.geometry, params.swipe),
            external: None,
            twist: TwistTracker::new(),
            gestures: GestureStateMachine::new(params.hysteresis),
            mode_switch: ModeSwitcher::new(params.mode_switch),
            smoother: ControlSmoother::new(params.smoothing),
            physics,
            cues: None,
            attractors: Vec::new(),
            last_frame: LandmarkFrame::default(),
            last_classification: Classification::auto(),
            clock: 0.0,
            max_timestep: MAX_TIMESTEP,
            visible: true,
            gestures_enabled: true,
        }
    }

    pub fn with_external(mut self, classifier: AsyncClassifier) -> Self {
        self.external = Some(classifier);
        self
    }

    pub fn with_max_timestep(mut self, max_timestep: f32) -> Self {
        self.max_timestep = max_timestep.clamp(0.0, MAX_TIMESTEP);
        self
    }

    // ── detection rate ───────────────────────────────────────────────────

    /// Run one landmark frame through the gesture pipeline.
    pub fn consume_frame(&mut self, frame: &LandmarkFrame) {
        if !self.visible || !self.gestures_enabled {
            return;
        }

        let filtered = self.filters.filter_frame(frame);
        let t = filtered.timestamp;
        let features: Vec<HandFeatures> = filtered
            .hands
            .iter()
            .map(|h| HandFeatures::analyze(h, &self.thresholds))
            .collect();

        let rule = self.classifier.classify(&features, t);
        let result = match &self.external {
            Some(ext) if !features.is_empty() => {
                // Resolved from an earlier submission; this frame's answer
                // is consumed by a later frame.
                let resolved = ext.latest();
                ext.submit(&filtered.hands);
                fuse(rule, resolved.as_ref(), ext.threshold())
            }
            _ => rule,
        };

        match result.gesture() {
            Some(Gesture::SwipeLeft) => self.smoother.trigger_swipe(SwipeDirection::Left),
            Some(Gesture::SwipeRight) => self.smoother.trigger_swipe(SwipeDirection::Right),
            _ => {}
        }
        if self.gestures.observe(&result.label) {
            debug!(label = self.gestures.active_label(), "active gesture");
        }

        let counts: Vec<u8> = features.iter().map(|f| f.extended).collect();
        if let Some(count) = self.mode_switch.observe(&counts, t) {
            if let Some(mode) = PhysicsMode::from_finger_count(count) {
                self.set_physics_mode(mode);
            }
        }

        let twist_velocity = match features.first() {
            Some(primary) if primary.fist => self.twist.update(primary.twist, t),
            _ => {
                self.twist.reset();
                0.0
            }
        };

        self.cues = features.first().map(|primary| {
            let agg = aggregate(&features);
            GestureCues {
                hand_count: agg.hand_count,
                fingers: primary.extended,
                openness: agg.openness,
                hand_size: agg.hand_size,
                direction: agg.direction,
                palm: to_world(primary.palm_center),
                pinch: primary.pinch.map(to_world),
                twist_velocity,
                inter_hand_angle: agg.inter_hand_angle,
            }
        });

        self.attractors.clear();
        for hand in &filtered.hands {
            self.attractors.push(to_world(palm_center(hand)));
            self.attractors
                .extend(FINGERTIPS.iter().map(|&tip| to_world(hand.point(tip))));
        }

        self.last_classification = result;
        self.last_frame = filtered;
    }

    // ── render rate ──────────────────────────────────────────────────────

    /// Advance controls and particles by `dt` seconds (clamped).  Returns
    /// `false` when paused.
    pub fn tick(&mut self, dt: f32) -> bool {
        if !self.visible {
            return false;
        }
        let dt = if dt.is_finite() {
            dt.clamp(0.0, self.max_timestep)
        } else {
            0.0
        };
        self.clock += dt as f64;

        let active = self
            .cues
            .as_ref()
            .and_then(|cues| Gesture::from_label(self.gestures.active_label()).map(|g| (g, cues)));
        self.smoother.update(active, self.clock, dt);
        self.physics.step(dt, &self.attractors);
        true
    }

    // ── switches ─────────────────────────────────────────────────────────

    /// Visibility-driven pause.
    pub fn set_visible(&mut self, visible: bool) {
        if self.visible != visible {
            debug!(visible, "simulation visibility");
            self.visible = visible;
        }
    }

    pub fn set_gestures_enabled(&mut self, enabled: bool) {
        if self.gestures_enabled == enabled {
            return;
        }
        info!(enabled, "gesture detection");
        self.gestures_enabled = enabled;
        if !enabled {
            self.release_hands();
        }
    }

    /// Forget everything derived from tracked hands; controls drift back to
    /// idle on their own.
    pub fn release_hands(&mut self) {
        self.filters.clear();
        self.classifier.reset();
        self.twist.reset();
        self.mode_switch.reset();
        self.gestures.reset();
        self.cues = None;
        self.attractors.clear();
        self.last_frame = LandmarkFrame::empty(self.last_frame.timestamp);
        self.last_classification = Classification::auto();
    }

    pub fn set_physics_mode(&mut self, mode: PhysicsMode) -> bool {
        if !self.physics.set_mode(mode) {
            return false;
        }
        info!(mode = %mode, "physics mode");
        self.smoother.reset_impulses();
        true
    }

    pub fn cycle_physics_mode(&mut self) -> PhysicsMode {
        let next = self.physics.mode().next();
        self.set_physics_mode(next);
        next
    }

    // ── accessors for the render loop ────────────────────────────────────

    pub fn controls(&self) -> &ControlState {
        self.smoother.state()
    }

    pub fn gesture_state(&self) -> &GestureState {
        self.gestures.state()
    }

    pub fn last_classification(&self) -> &Classification {
        &self.last_classification
    }

    pub fn last_frame(&self) -> &LandmarkFrame {
        &self.last_frame
    }

    pub fn cues(&self) -> Option<&GestureCues> {
        self.cues.as_ref()
    }

    pub fn attractors(&self) -> &[Vec3] {
        &self.attractors
    }

    pub fn positions(&self) -> &[Vec3] {
        self.physics.positions()
    }

    pub fn physics(&self) -> &PhysicsIntegrator {
        &self.physics
    }

    pub fn mode(&self) -> PhysicsMode {
        self.physics.mode()
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn gestures_enabled(&self) -> bool {
        self.gestures_enabled
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
