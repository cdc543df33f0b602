//! # particle_physics
//!
//! A fixed-size particle field advanced by one of six physics regimes.
//!
//! ```text
//!   ParticleField ──► PhysicsIntegrator::step(dt, attractors) ──► positions()
//!        ▲                      │
//!    targets              PhysicsMode → ModeParams
//! ```
//!
//! In [`PhysicsMode::Normal`] nothing is integrated and the target buffer is
//! what [`PhysicsIntegrator::positions`] hands out.  Every other mode keeps
//! simulated positions and velocities, seeded from the targets.
//!
//! | Fingers (both hands) | Mode |
//! |---|---|
//! | 0 | Normal |
//! | 1 | Gravity |
//! | 2 | Magnetic |
//! | 3 | Fluid |
//! | 4 | Quantum |
//! | 5 | Anti-gravity |
//!
//! ```rust
//! use particle_physics::{ParticleField, PhysicsIntegrator, PhysicsMode};
//!
//! let field = ParticleField::scattered(500, 2.0, 7);
//! let mut sim = PhysicsIntegrator::new(field, 7);
//! sim.set_mode(PhysicsMode::Gravity);
//! for _ in 0..120 {
//!     sim.step(1.0 / 60.0, &[]);
//! }
//! let floor = sim.params().floor.unwrap();
//! assert!(sim.positions().iter().all(|p| p.y >= floor));
//! ```

pub mod mode;
pub mod particles;
pub mod integrator;

pub use mode::{ModeParams, PhysicsMode};
pub use particles::{adaptive_count, ParticleField, MAX_PARTICLES, MIN_PARTICLES};
pub use integrator::{CohesionSampling, PhysicsIntegrator, MAX_TIMESTEP};
