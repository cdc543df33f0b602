//! The per-frame physics step.
//!
//! Order within a step, per particle: nearest-attractor pull, gravity,
//! turbulence, damping (friction × viscosity), position update, floor and
//! ceiling collision.  Fluid cohesion and the quantum effects run as
//! separate passes after the force loop.

use std::f32::consts::TAU;

use glam::{Quat, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tracing::debug;

use crate::mode::{ModeParams, PhysicsMode};
use crate::particles::ParticleField;

/// Longest step ever integrated; longer frame deltas are clamped.
pub const MAX_TIMESTEP: f32 = 0.1;

/// Closer than this, attraction stops growing.
const MIN_ATTRACTION_DISTANCE: f32 = 0.2;

/// Sparse neighbour sampling for fluid cohesion.
///
/// Each step only every `stride`-th particle (starting at a rotating
/// offset) looks at the `window` particles on either side of it.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CohesionSampling {
    pub stride: usize,
    pub window: usize,
}

impl Default for CohesionSampling {
    fn default() -> Self {
        CohesionSampling { stride: 8, window: 50 }
    }
}

pub struct PhysicsIntegrator {
    field: ParticleField,
    mode: PhysicsMode,
    params: ModeParams,
    sampling: CohesionSampling,
    cohesion_offset: usize,
    rng: StdRng,
}

impl PhysicsIntegrator {
    pub fn new(field: ParticleField, seed: u64) -> Self {
        PhysicsIntegrator {
            field,
            mode: PhysicsMode::Normal,
            params: PhysicsMode::Normal.params(),
            sampling: CohesionSampling::default(),
            cohesion_offset: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn with_sampling(mut self, sampling: CohesionSampling) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn mode(&self) -> PhysicsMode {
        self.mode
    }

    pub fn params(&self) -> &ModeParams {
        &self.params
    }

    /// Replace the active mode's constants until the next mode switch.
    pub fn set_params(&mut self, params: ModeParams) {
        self.params = params;
    }

    pub fn field(&self) -> &ParticleField {
        &self.field
    }

    pub fn len(&self) -> usize {
        self.field.len()
    }

    pub fn is_empty(&self) -> bool {
        self.field.is_empty()
    }

    /// What the renderer should draw: targets in Normal mode, simulated
    /// positions otherwise.
    pub fn positions(&self) -> &[Vec3] {
        match self.mode {
            PhysicsMode::Normal => self.field.targets(),
            _ => self.field.positions(),
        }
    }

    /// Switch regimes.  Velocities always restart from rest; positions carry
    /// over, except that entering Normal snaps back to the targets.
    pub fn set_mode(&mut self, mode: PhysicsMode) -> bool {
        if mode == self.mode {
            return false;
        }
        debug!(from = %self.mode, to = %mode, "physics mode switch");
        self.mode = mode;
        self.params = mode.params();
        if mode == PhysicsMode::Normal {
            self.field.reset_to_targets();
        } else {
            self.field.zero_velocities();
        }
        true
    }

    /// Advance one frame.  `attractors` are world-space hand points.
    /// Returns the timestep actually integrated.
    pub fn step(&mut self, dt: f32, attractors: &[Vec3]) -> f32 {
        let dt = if dt.is_finite() { dt.clamp(0.0, MAX_TIMESTEP) } else { 0.0 };
        if self.mode == PhysicsMode::Normal || dt == 0.0 {
            return dt;
        }

        self.integrate_forces(dt, attractors);
        if self.params.has_cohesion() {
            self.cohere(dt);
        }
        if self.params.is_quantum() {
            self.quantum_effects();
        }
        dt
    }

    fn integrate_forces(&mut self, dt: f32, attractors: &[Vec3]) {
        let p = self.params;
        let damping = p.friction * p.viscosity;
        let (positions, velocities, _) = self.field.state_mut();

        for (pos, vel) in positions.iter_mut().zip(velocities.iter_mut()) {
            let mut accel = Vec3::new(0.0, p.gravity, 0.0);
            if p.attracts() {
                accel += attraction(*pos, attractors, &p);
            }

            let mut v = *vel + accel * dt;
            if p.turbulence > 0.0 {
                v += jitter(&mut self.rng) * p.turbulence;
            }
            v *= damping;

            let mut x = *pos + v * dt;
            collide(&mut x, &mut v, &p);
            *pos = x;
            *vel = v;
        }
    }

    fn cohere(&mut self, dt: f32) {
        let stride = self.sampling.stride.max(1);
        let window = self.sampling.window;
        let offset = self.cohesion_offset % stride;
        self.cohesion_offset = (offset + 1) % stride;

        let radius_sq = self.params.cohesion_radius * self.params.cohesion_radius;
        let pull = self.params.surface_tension * dt;
        let (positions, velocities, species) = self.field.state_mut();
        let n = positions.len();

        for i in (offset..n).step_by(stride) {
            let here = positions[i];
            let mut sum = Vec3::ZERO;
            let mut count = 0usize;
            for j in i.saturating_sub(window)..(i + window + 1).min(n) {
                if j == i || species[j] != species[i] {
                    continue;
                }
                if positions[j].distance_squared(here) < radius_sq {
                    sum += positions[j];
                    count += 1;
                }
            }
            if count > 0 {
                let centroid = sum / count as f32;
                velocities[i] += (centroid - here) * pull;
            }
        }
    }

    fn quantum_effects(&mut self) {
        let p = self.params;
        let rng = &mut self.rng;
        let (positions, velocities, _) = self.field.state_mut();
        let n = positions.len();

        for i in 0..n {
            // tunnel
            if rng.gen::<f32>() < p.jump_chance {
                let r = p.jump_radius * rng.gen_range(0.5..=1.0);
                positions[i] += random_unit(rng) * r;
            }
            // phase shift
            if rng.gen::<f32>() < p.phase_chance {
                let axis = random_unit(rng);
                let angle = rng.gen_range(0.0..TAU);
                velocities[i] = Quat::from_axis_angle(axis, angle) * velocities[i];
            }
            // entangle
            if rng.gen::<f32>() < p.entangle_chance {
                let j = rng.gen_range(0..n);
                if j != i {
                    let mid = (positions[i] + positions[j]) * 0.5;
                    velocities[i] += (mid - positions[i]) * p.entangle_strength;
                    velocities[j] += (mid - positions[j]) * p.entangle_strength;
                }
            }
        }
    }
}

fn attraction(pos: Vec3, attractors: &[Vec3], p: &ModeParams) -> Vec3 {
    let nearest = attractors
        .iter()
        .min_by(|a, b| a.distance_squared(pos).total_cmp(&b.distance_squared(pos)));
    let Some(&target) = nearest else {
        return Vec3::ZERO;
    };
    let d = target - pos;
    let dist = d.length();
    if dist >= p.attraction_range || dist <= f32::EPSILON {
        return Vec3::ZERO;
    }
    let r = dist.max(MIN_ATTRACTION_DISTANCE);
    d / dist * (p.attraction_strength / r.powf(p.attraction_falloff))
}

fn collide(x: &mut Vec3, v: &mut Vec3, p: &ModeParams) {
    if let Some(floor) = p.floor {
        if x.y < floor {
            x.y = floor;
            if v.y < 0.0 {
                v.y = -v.y * p.bounce;
            }
            v.x *= p.impact_friction;
            v.z *= p.impact_friction;
        }
    }
    if let Some(ceiling) = p.ceiling {
        if x.y > ceiling {
            x.y = ceiling;
            if v.y > 0.0 {
                v.y = -v.y * p.bounce;
            }
            v.x *= p.impact_friction;
            v.z *= p.impact_friction;
        }
    }
}

fn jitter(rng: &mut StdRng) -> Vec3 {
    Vec3::new(
        rng.gen_range(-1.0..=1.0),
        rng.gen_range(-1.0..=1.0),
        rng.gen_range(-1.0..=1.0),
    )
}

fn random_unit(rng: &mut StdRng) -> Vec3 {
    loop {
        let v = jitter(rng);
        let len_sq = v.length_squared();
        if len_sq > 1e-4 && len_sq <= 1.0 {
            return v / len_sq.sqrt();
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn single(position: Vec3, velocity: Vec3, mode: PhysicsMode) -> PhysicsIntegrator {
        let mut sim = PhysicsIntegrator::new(ParticleField::from_targets(vec![position], 1), 0);
        sim.set_mode(mode);
        sim.field.set_state(0, position, velocity);
        sim
    }

    fn quiet(mode: PhysicsMode) -> ModeParams {
        ModeParams { turbulence: 0.0, ..mode.params() }
    }

    #[test]
    fn gravity_is_reproducible_with_a_seed() {
        let run = |seed| {
            let mut sim = PhysicsIntegrator::new(ParticleField::scattered(300, 2.0, 5), seed);
            sim.set_mode(PhysicsMode::Gravity);
            for i in 0..100 {
                sim.step(0.01 + (i % 3) as f32 * 0.005, &[]);
            }
            sim.positions().to_vec()
        };
        assert_eq!(run(42), run(42));
        assert_ne!(run(42), run(43));
    }

    #[test]
    fn floor_bounce_reflects_and_clamps() {
        let mut sim = single(Vec3::new(0.0, -3.9, 0.0), Vec3::new(1.0, -5.0, 0.0), PhysicsMode::Gravity);
        let p = quiet(PhysicsMode::Gravity);
        sim.set_params(p);
        sim.step(0.1, &[]);

        let damp = p.friction * p.viscosity;
        let vy_in = (-5.0 + p.gravity * 0.1) * damp;
        let vx_in = 1.0 * damp;
        let x = sim.field.positions()[0];
        let v = sim.field.velocities()[0];
        assert_eq!(x.y, -4.0);
        assert!((v.y - (-vy_in * p.bounce)).abs() < 1e-5);
        assert!((v.x - vx_in * p.impact_friction).abs() < 1e-5);
    }

    #[test]
    fn fast_fall_never_tunnels_through_floor() {
        let mut sim = PhysicsIntegrator::new(ParticleField::scattered(500, 3.0, 2), 2);
        sim.set_mode(PhysicsMode::Gravity);
        for _ in 0..400 {
            sim.step(1.0, &[]);
            assert!(sim.positions().iter().all(|p| p.y >= -4.0));
        }
    }

    #[test]
    fn antigravity_hits_the_ceiling() {
        let mut sim = single(Vec3::new(0.0, 3.95, 0.0), Vec3::new(0.0, 2.0, 0.0), PhysicsMode::AntiGravity);
        sim.set_params(quiet(PhysicsMode::AntiGravity));
        sim.step(0.1, &[]);
        assert_eq!(sim.field.positions()[0].y, 4.0);
        assert!(sim.field.velocities()[0].y < 0.0);
    }

    #[test]
    fn magnetic_pulls_within_range_only() {
        let mut near = single(Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO, PhysicsMode::Magnetic);
        near.set_params(quiet(PhysicsMode::Magnetic));
        near.step(0.05, &[Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)]);
        assert!(near.field.positions()[0].x < 1.0);

        let mut far = single(Vec3::new(5.0, 0.0, 0.0), Vec3::ZERO, PhysicsMode::Magnetic);
        far.set_params(quiet(PhysicsMode::Magnetic));
        far.step(0.05, &[Vec3::ZERO]);
        assert_eq!(far.field.positions()[0], Vec3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn cohesion_pulls_same_species_together() {
        let targets = vec![Vec3::ZERO, Vec3::new(0.2, 0.0, 0.0)];
        let params = ModeParams { gravity: 0.0, ..quiet(PhysicsMode::Fluid) };
        let sampling = CohesionSampling { stride: 1, window: 4 };

        let mut same = PhysicsIntegrator::new(ParticleField::from_targets(targets.clone(), 1), 0)
            .with_sampling(sampling);
        same.set_mode(PhysicsMode::Fluid);
        same.set_params(params);
        for _ in 0..5 {
            same.step(1.0 / 60.0, &[]);
        }
        let gap = same.positions()[1].x - same.positions()[0].x;
        assert!(gap < 0.2);

        let mut mixed = PhysicsIntegrator::new(ParticleField::from_targets(targets, 2), 0)
            .with_sampling(sampling);
        mixed.set_mode(PhysicsMode::Fluid);
        mixed.set_params(params);
        for _ in 0..5 {
            mixed.step(1.0 / 60.0, &[]);
        }
        assert_eq!(mixed.positions()[1].x - mixed.positions()[0].x, 0.2);
    }

    #[test]
    fn tunneling_rate_matches_probability() {
        let mut sim = PhysicsIntegrator::new(ParticleField::scattered(200, 2.0, 11), 11);
        sim.set_mode(PhysicsMode::Quantum);
        let p = sim.params().jump_chance;
        let frames = 2000;
        let mut jumps = 0usize;
        for _ in 0..frames {
            let before = sim.positions().to_vec();
            sim.step(1.0 / 60.0, &[]);
            jumps += before
                .iter()
                .zip(sim.positions())
                .filter(|(a, b)| a.distance(**b) > 0.25)
                .count();
        }
        let rate = jumps as f32 / (frames * 200) as f32;
        assert!((rate - p).abs() < p * 0.15, "rate {rate} vs p {p}");
    }

    #[test]
    fn mode_switch_resets_velocity_keeps_position() {
        let mut sim = PhysicsIntegrator::new(ParticleField::scattered(100, 2.0, 4), 4);
        sim.set_mode(PhysicsMode::Gravity);
        for _ in 0..30 {
            sim.step(1.0 / 60.0, &[]);
        }
        let carried = sim.positions().to_vec();
        assert!(sim.field.velocities().iter().any(|v| v.length() > 0.1));

        assert!(sim.set_mode(PhysicsMode::Fluid));
        assert_eq!(sim.positions(), carried.as_slice());
        assert!(sim.field.velocities().iter().all(|v| *v == Vec3::ZERO));

        assert!(sim.set_mode(PhysicsMode::Normal));
        assert_eq!(sim.field.positions(), sim.field.targets());
        assert!(!sim.set_mode(PhysicsMode::Normal));
    }

    #[test]
    fn normal_mode_passes_targets_through() {
        let mut sim = PhysicsIntegrator::new(ParticleField::scattered(50, 1.0, 8), 8);
        let targets = sim.field.targets().to_vec();
        for _ in 0..10 {
            sim.step(1.0 / 60.0, &[Vec3::ZERO]);
        }
        assert_eq!(sim.positions(), targets.as_slice());
    }

    #[test]
    fn timestep_is_capped() {
        let run = |dt| {
            let mut sim = single(Vec3::ZERO, Vec3::ZERO, PhysicsMode::Gravity);
            let used = sim.step(dt, &[]);
            (used, sim.positions()[0])
        };
        let (used, capped) = run(5.0);
        assert_eq!(used, MAX_TIMESTEP);
        assert_eq!(capped, run(MAX_TIMESTEP).1);
        assert_eq!(run(f32::NAN).0, 0.0);
    }

    /// Free particles with every effect off; tests switch one back on.
    fn inert(mode: PhysicsMode) -> ModeParams {
        ModeParams {
            gravity: 0.0,
            floor: None,
            ceiling: None,
            friction: 1.0,
            viscosity: 1.0,
            turbulence: 0.0,
            attraction_strength: 0.0,
            jump_chance: 0.0,
            phase_chance: 0.0,
            entangle_chance: 0.0,
            surface_tension: 0.0,
            ..mode.params()
        }
    }

    #[test]
    fn phase_shift_keeps_speed_and_turns_velocity() {
        let mut sim = single(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), PhysicsMode::Quantum);
        sim.set_params(ModeParams { phase_chance: 1.0, ..inert(PhysicsMode::Quantum) });

        let mut turned = false;
        let mut previous = Vec3::new(1.0, 0.0, 0.0);
        for _ in 0..5 {
            sim.step(1.0 / 60.0, &[]);
            let v = sim.field.velocities()[0];
            assert!((v.length() - 1.0).abs() < 1e-4);
            turned |= v.distance(previous) > 1e-3;
            previous = v;
        }
        assert!(turned);
    }

    #[test]
    fn entangled_pair_heads_for_midpoint() {
        let targets = vec![Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)];
        let mut sim = PhysicsIntegrator::new(ParticleField::from_targets(targets, 1), 3);
        sim.set_mode(PhysicsMode::Quantum);
        sim.set_params(ModeParams {
            entangle_chance: 1.0,
            entangle_strength: 0.5,
            ..inert(PhysicsMode::Quantum)
        });

        for _ in 0..50 {
            sim.step(1e-6, &[]);
            if sim.field.velocities()[0] != Vec3::ZERO {
                break;
            }
        }
        let v = sim.field.velocities();
        assert!(v[0].x > 0.0, "{:?}", v[0]);
        assert!(v[1].x < 0.0, "{:?}", v[1]);
        assert!((v[0] + v[1]).length() < 1e-4);
        assert!(v[0].y.abs() < 1e-6 && v[0].z.abs() < 1e-6);
    }

    #[test]
    fn turbulence_is_damped_with_the_rest_of_the_velocity() {
        let p = ModeParams {
            turbulence: 0.5,
            friction: 0.8,
            ..inert(PhysicsMode::Gravity)
        };
        let damping = p.friction * p.viscosity;
        assert!(damping < 1.0);

        let mut sim = single(Vec3::ZERO, Vec3::ZERO, PhysicsMode::Gravity);
        sim.set_params(p);
        let mut largest = 0.0f32;
        for _ in 0..200 {
            sim.field.set_state(0, Vec3::ZERO, Vec3::ZERO);
            sim.step(1.0 / 60.0, &[]);
            let v = sim.field.velocities()[0];
            assert!(v.length() <= p.turbulence * damping * 3f32.sqrt() + 1e-6);
            assert!(v.abs().max_element() <= p.turbulence * damping + 1e-6);
            largest = largest.max(v.abs().max_element());
        }
        assert!(largest > p.turbulence * 0.5);
    }

    #[test]
    fn fluid_floor_bounce_is_soft() {
        let mut sim = single(Vec3::new(0.0, -3.95, 0.0), Vec3::new(0.0, -5.0, 0.0), PhysicsMode::Fluid);
        let p = quiet(PhysicsMode::Fluid);
        assert_eq!(p.bounce, 0.2);
        sim.set_params(p);
        sim.step(0.1, &[]);

        let vy_in = (-5.0 + p.gravity * 0.1) * p.friction * p.viscosity;
        let v = sim.field.velocities()[0];
        assert_eq!(sim.field.positions()[0].y, -4.0);
        assert!((v.y - (-vy_in * 0.2)).abs() < 1e-5);
    }
}
