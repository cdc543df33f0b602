//! The particle field: parallel arrays indexed by particle id.
//!
//! The count is fixed at construction.  Targets are the rest positions the
//! field was built with; positions and velocities belong to the integrator.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const MIN_PARTICLES: usize = 8_000;
pub const MAX_PARTICLES: usize = 40_000;

const PARTICLES_PER_CORE: usize = 5_000;
const DEFAULT_SPECIES: u8 = 4;

/// Particle count for a machine with `parallelism` hardware threads.
pub fn adaptive_count(parallelism: usize) -> usize {
    (parallelism * PARTICLES_PER_CORE).clamp(MIN_PARTICLES, MAX_PARTICLES)
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParticleField {
    targets: Vec<Vec3>,
    positions: Vec<Vec3>,
    velocities: Vec<Vec3>,
    species: Vec<u8>,
}

impl ParticleField {
    /// Particles at rest on `targets`, species assigned round-robin.
    pub fn from_targets(targets: Vec<Vec3>, species_count: u8) -> Self {
        let n = targets.len();
        let species_count = species_count.max(1) as usize;
        ParticleField {
            positions: targets.clone(),
            velocities: vec![Vec3::ZERO; n],
            species: (0..n).map(|i| (i % species_count) as u8).collect(),
            targets,
        }
    }

    /// `count` particles uniformly distributed in a ball of `radius`.
    pub fn scattered(count: usize, radius: f32, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let targets = (0..count)
            .map(|_| loop {
                let p = Vec3::new(
                    rng.gen_range(-1.0..=1.0),
                    rng.gen_range(-1.0..=1.0),
                    rng.gen_range(-1.0..=1.0),
                );
                if p.length_squared() <= 1.0 {
                    break p * radius;
                }
            })
            .collect();
        Self::from_targets(targets, DEFAULT_SPECIES)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn targets(&self) -> &[Vec3] {
        &self.targets
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities
    }

    pub fn species(&self) -> &[u8] {
        &self.species
    }

    pub fn reset_to_targets(&mut self) {
        self.positions.copy_from_slice(&self.targets);
        self.zero_velocities();
    }

    pub fn zero_velocities(&mut self) {
        self.velocities.fill(Vec3::ZERO);
    }

    /// Mutable positions and velocities together, for the integrator.
    pub(crate) fn state_mut(&mut self) -> (&mut [Vec3], &mut [Vec3], &[u8]) {
        (&mut self.positions, &mut self.velocities, &self.species)
    }

    #[cfg(test)]
    pub(crate) fn set_state(&mut self, i: usize, position: Vec3, velocity: Vec3) {
        self.positions[i] = position;
        self.velocities[i] = velocity;
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
