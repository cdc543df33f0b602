//! Control channels and the exponential smoother that drives them.
//!
//! Every channel holds a `current` and a `target`.  Gestures only ever move
//! targets; each tick `current` closes a fixed fraction of the gap.  With no
//! active gesture the scene "breathes": expansion and swirl follow a slow
//! sinusoid of the simulation clock while attraction, wind and pulse decay
//! to zero at a faster rate.

use std::f32::consts::TAU;
use std::ops::{Add, Mul, Sub};

use glam::{Vec2, Vec3};
use serde::Deserialize;

use hand_signal::{Gesture, SwipeDirection};

// ════════════════════════════════════════════════════════════════════════════
// Channel
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Channel<T> {
    pub current: T,
    pub target: T,
}

impl<T> Channel<T>
where
    T: Copy + Add<Output = T> + Sub<Output = T> + Mul<f32, Output = T>,
{
    pub fn new(value: T) -> Self {
        Channel {
            current: value,
            target: value,
        }
    }

    /// `current += (target − current) × factor`
    pub fn step(&mut self, factor: f32) {
        self.current = self.current + (self.target - self.current) * factor;
    }

    pub fn reset(&mut self, value: T) {
        self.current = value;
        self.target = value;
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SmoothingParams
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SmoothingParams {
    /// Per-tick fraction for driven channels.
    pub factor: f32,
    /// Per-tick fraction for released attraction/wind/pulse.
    pub idle_decay: f32,
    /// Per-tick fraction for rotation speed relaxing to `base_rotation`.
    pub rotation_decay: f32,
    /// Rotation speed (rad/s) when nothing drives rotation.
    pub base_rotation: f32,
    pub breath_amplitude: f32,
    /// rad/s of simulation clock.
    pub breath_rate: f32,
    pub idle_swirl_amplitude: f32,
    pub idle_swirl_rate: f32,
    /// Per-tick fraction a swipe impulse loses.
    pub impulse_decay: f32,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        SmoothingParams {
            factor: 0.1,
            idle_decay: 0.2,
            rotation_decay: 0.05,
            base_rotation: 0.15,
            breath_amplitude: 0.15,
            breath_rate: 0.5,
            idle_swirl_amplitude: 0.3,
            idle_swirl_rate: 0.3,
            impulse_decay: 0.08,
        }
    }
}

impl SmoothingParams {
    /// Idle expansion at simulation time `clock`.
    pub fn idle_expansion(&self, clock: f64) -> f32 {
        1.0 + self.breath_amplitude * (clock * self.breath_rate as f64).sin() as f32
    }

    /// Idle swirl at simulation time `clock`.
    pub fn idle_swirl(&self, clock: f64) -> f32 {
        self.idle_swirl_amplitude * (clock * self.idle_swirl_rate as f64).sin() as f32
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ControlState
// ════════════════════════════════════════════════════════════════════════════

/// Everything the renderer reads each tick.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlState {
    pub expansion: Channel<f32>,
    pub swirl: Channel<f32>,
    pub wiggle: Channel<f32>,
    pub explosion: Channel<f32>,
    pub attractor_strength: Channel<f32>,
    pub attractor_position: Channel<Vec3>,
    pub wind: Channel<Vec3>,
    pub pulse: Channel<f32>,
    pub rotation_speed: Channel<f32>,
    pub flow: Channel<f32>,
    /// Integrated from `rotation_speed`, in [0, 2π).
    pub rotation_angle: f32,
}

impl ControlState {
    pub fn new(params: &SmoothingParams) -> Self {
        ControlState {
            expansion: Channel::new(1.0),
            swirl: Channel::new(0.0),
            wiggle: Channel::new(0.0),
            explosion: Channel::new(0.0),
            attractor_strength: Channel::new(0.0),
            attractor_position: Channel::new(Vec3::ZERO),
            wind: Channel::new(Vec3::ZERO),
            pulse: Channel::new(0.0),
            rotation_speed: Channel::new(params.base_rotation),
            flow: Channel::new(0.0),
            rotation_angle: 0.0,
        }
    }

    /// Overall motion level derived from the other channels, in [0, 1].
    fn flow_target(&self) -> f32 {
        let activity = (self.expansion.current - 1.0).abs()
            + self.swirl.current.abs()
            + self.wiggle.current
            + self.pulse.current
            + self.explosion.current
            + self.wind.current.length();
        (activity * 0.5).clamp(0.0, 1.0)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GestureCues
// ════════════════════════════════════════════════════════════════════════════

/// Continuous measurements accompanying the active gesture.  Positions are
/// in world space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GestureCues {
    pub hand_count: usize,
    /// Primary hand's extended-finger count.
    pub fingers: u8,
    pub openness: f32,
    pub hand_size: f32,
    pub direction: Vec2,
    pub palm: Vec3,
    pub pinch: Option<Vec3>,
    /// Palm twist angular velocity (rad/s) while a fist is held.
    pub twist_velocity: f32,
    pub inter_hand_angle: Option<f32>,
}

// ════════════════════════════════════════════════════════════════════════════
// ControlSmoother
// ════════════════════════════════════════════════════════════════════════════

/// Which channels the current gesture holds.
#[derive(Clone, Copy, Debug, Default)]
struct Driven {
    rotation: bool,
    attractor: bool,
    wind: bool,
    pulse: bool,
}

#[derive(Clone, Debug)]
pub struct ControlSmoother {
    params: SmoothingParams,
    state: ControlState,
    driven: Driven,
    /// Swipe impulse: magnitude and sign (+1 right, −1 left).
    impulse: f32,
    impulse_sign: f32,
}

impl ControlSmoother {
    pub fn new(params: SmoothingParams) -> Self {
        ControlSmoother {
            state: ControlState::new(&params),
            params,
            driven: Driven::default(),
            impulse: 0.0,
            impulse_sign: 0.0,
        }
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    pub fn params(&self) -> &SmoothingParams {
        &self.params
    }

    /// Set targets from the active gesture (or idle behaviour for `None`)
    /// and advance every channel by one tick of `dt` seconds.
    pub fn update(&mut self, active: Option<(Gesture, &GestureCues)>, clock: f64, dt: f32) {
        self.set_targets(active, clock);
        self.advance(dt);
    }

    /// A swipe is a one-shot burst: an explosion plus a swirl kick that
    /// fade on their own.
    pub fn trigger_swipe(&mut self, direction: SwipeDirection) {
        self.impulse = 1.0;
        self.impulse_sign = match direction {
            SwipeDirection::Right => 1.0,
            SwipeDirection::Left => -1.0,
        };
    }

    /// Drop every transient effect at once (physics mode switch).
    pub fn reset_impulses(&mut self) {
        self.impulse = 0.0;
        self.state.explosion.reset(0.0);
        self.state.attractor_strength.reset(0.0);
        self.state.wind.reset(Vec3::ZERO);
        self.state.pulse.reset(0.0);
    }

    fn set_targets(&mut self, active: Option<(Gesture, &GestureCues)>, clock: f64) {
        let p = &self.params;
        let s = &mut self.state;
        let mut driven = Driven::default();

        s.wiggle.target = 0.0;
        s.attractor_strength.target = 0.0;
        s.wind.target = Vec3::ZERO;
        s.pulse.target = 0.0;
        s.rotation_speed.target = p.base_rotation;

        match active {
            None | Some((Gesture::Auto, _)) => {
                s.expansion.target = p.idle_expansion(clock);
                s.swirl.target = p.idle_swirl(clock);
            }
            Some((gesture, cues)) => {
                s.expansion.target = 1.0;
                s.swirl.target = 0.0;
                match gesture {
                    Gesture::ExpandRotate | Gesture::SwipeLeft | Gesture::SwipeRight => {
                        s.expansion.target = 0.6 + 1.4 * cues.openness;
                        s.swirl.target = cues.direction.x * 0.5;
                        s.rotation_speed.target = p.base_rotation
                            + 0.8
                            + cues.inter_hand_angle.map_or(0.0, |a| a * 0.5);
                        driven.rotation = true;
                    }
                    Gesture::Rotate => {
                        s.rotation_speed.target = (cues.twist_velocity * 0.5).clamp(-3.0, 3.0);
                        driven.rotation = true;
                    }
                    Gesture::Attract => {
                        s.attractor_strength.target = 1.0;
                        s.attractor_position.target = cues.pinch.unwrap_or(cues.palm);
                        driven.attractor = true;
                    }
                    Gesture::Pulse => {
                        s.pulse.target = 1.0;
                        driven.pulse = true;
                    }
                    Gesture::Collapse => {
                        s.expansion.target = 0.25;
                    }
                    Gesture::Wind => {
                        let strength = cues.fingers as f32 / 4.0 * 2.0;
                        s.wind.target = cues.direction.extend(0.0) * strength;
                        s.wiggle.target = 0.1 * cues.fingers as f32;
                        driven.wind = true;
                    }
                    Gesture::Auto => {}
                }
            }
        }

        s.explosion.target = self.impulse;
        s.swirl.target += self.impulse_sign * self.impulse * 1.5;
        self.driven = driven;
    }

    fn advance(&mut self, dt: f32) {
        let p = &self.params;
        let d = self.driven;
        let s = &mut self.state;
        let released = |held: bool| if held { p.factor } else { p.idle_decay };

        s.expansion.step(p.factor);
        s.swirl.step(p.factor);
        s.wiggle.step(p.factor);
        s.explosion.step(p.factor);
        s.attractor_strength.step(released(d.attractor));
        s.attractor_position.step(p.factor);
        s.wind.step(released(d.wind));
        s.pulse.step(released(d.pulse));
        s.rotation_speed
            .step(if d.rotation { p.factor } else { p.rotation_decay });

        s.flow.target = s.flow_target();
        s.flow.step(p.factor);

        s.rotation_angle = (s.rotation_angle + s.rotation_speed.current * dt).rem_euclid(TAU);
        self.impulse *= 1.0 - p.impulse_decay;
        if self.impulse < 1e-3 {
            self.impulse = 0.0;
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
